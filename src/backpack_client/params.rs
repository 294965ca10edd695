use std::{borrow::Cow, collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{
    models::{SelfTradePrevention, TimeInForce},
    types::{ClientId, OrderId, Side, Symbol},
};

/// A single request parameter value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
}

impl ParamValue {
    /// Rendering used inside the signed query string.
    pub(crate) fn to_query_value(&self) -> String {
        match self {
            ParamValue::Text(value) => value.clone(),
            ParamValue::Integer(value) => value.to_string(),
            ParamValue::Decimal(value) => value.to_string(),
            ParamValue::Bool(value) => value.to_string(),
        }
    }

    /// Rendering used in JSON bodies. Decimals stay strings so no precision
    /// is lost on the way to the exchange.
    pub(crate) fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(value) => Value::String(value.clone()),
            ParamValue::Integer(value) => Value::from(*value),
            ParamValue::Decimal(value) => Value::String(value.to_string()),
            ParamValue::Bool(value) => Value::Bool(*value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        ParamValue::Decimal(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Side> for ParamValue {
    fn from(value: Side) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

impl From<&Symbol> for ParamValue {
    fn from(value: &Symbol) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

impl From<&OrderId> for ParamValue {
    fn from(value: &OrderId) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

impl From<ClientId> for ParamValue {
    fn from(value: ClientId) -> Self {
        ParamValue::Integer(value.into_inner().into())
    }
}

impl From<TimeInForce> for ParamValue {
    fn from(value: TimeInForce) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

impl From<SelfTradePrevention> for ParamValue {
    fn from(value: SelfTradePrevention) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

/// Request parameters keyed by name.
///
/// Keys with an absent value are kept so callers can pass optional filters
/// straight through; they are dropped from the signature, the query string
/// and the body alike. Iteration is always in key order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: BTreeMap<String, Option<ParamValue>>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_opt<V: Into<ParamValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert_opt(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), Some(value.into()));
    }

    pub fn insert_opt<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        self.entries.insert(key.into(), value.map(Into::into));
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with a value, sorted by key.
    pub fn present(&self) -> impl Iterator<Item = (&str, &ParamValue)> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.as_str(), value)))
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        self.present()
            .map(|(key, value)| (key.to_string(), value.to_query_value()))
            .collect()
    }

    pub(crate) fn to_json_body(&self) -> Value {
        let body: Map<String, Value> = self
            .present()
            .map(|(key, value)| (key.to_string(), value.to_json()))
            .collect();
        Value::Object(body)
    }
}

/// Market type filter accepted by history and order endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarketType {
    #[default]
    Spot,
    Perp,
    Iperp,
    Dated,
    Prediction,
    Rfq,
}

impl MarketType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MarketType::Spot => "SPOT",
            MarketType::Perp => "PERP",
            MarketType::Iperp => "IPERP",
            MarketType::Dated => "DATED",
            MarketType::Prediction => "PREDICTION",
            MarketType::Rfq => "RFQ",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MarketType> for ParamValue {
    fn from(value: MarketType) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

/// Direction of a borrow/lend execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorrowLendSide {
    Borrow,
    Lend,
}

impl BorrowLendSide {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            BorrowLendSide::Borrow => "Borrow",
            BorrowLendSide::Lend => "Lend",
        }
    }
}

impl From<BorrowLendSide> for ParamValue {
    fn from(value: BorrowLendSide) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

/// Order type accepted by `orderExecute`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

impl OrderType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
            OrderType::StopMarket => "StopMarket",
            OrderType::StopLimit => "StopLimit",
        }
    }
}

impl From<OrderType> for ParamValue {
    fn from(value: OrderType) -> Self {
        ParamValue::Text(value.as_str().to_string())
    }
}

/// Status filter for the rewards history.
#[derive(Clone, Debug, Default)]
pub enum RewardStatus<'a> {
    #[default]
    Claimed,
    Unclaimed,
    Custom(Cow<'a, str>),
}

impl<'a> RewardStatus<'a> {
    pub(crate) fn as_str(&self) -> &str {
        match self {
            RewardStatus::Claimed => "claimed",
            RewardStatus::Unclaimed => "unclaimed",
            RewardStatus::Custom(value) => value.as_ref(),
        }
    }
}
