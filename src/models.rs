//! Wire models returned by the Backpack REST API.

use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{OrderId, Side, Symbol};

/// Order book snapshot from `GET /api/v1/depth`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depth {
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    #[serde(deserialize_with = "string_or_number")]
    pub last_update_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// One `[price, quantity]` level of a [`Depth`] snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Decimal, Decimal)", into = "(Decimal, Decimal)")]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl From<(Decimal, Decimal)> for PriceLevel {
    fn from((price, quantity): (Decimal, Decimal)) -> Self {
        Self { price, quantity }
    }
}

impl From<PriceLevel> for (Decimal, Decimal) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.quantity)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Number(value) => value.to_string(),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    TriggerPending,
    TriggerFailed,
}

impl OrderStatus {
    pub fn is_filled(self) -> bool {
        match self {
            OrderStatus::Filled => true,
            OrderStatus::New
            | OrderStatus::PartiallyFilled
            | OrderStatus::Cancelled
            | OrderStatus::Expired
            | OrderStatus::TriggerPending
            | OrderStatus::TriggerFailed => false,
        }
    }

    /// Whether the order may still be resting on the book.
    pub fn is_open(self) -> bool {
        match self {
            OrderStatus::New | OrderStatus::PartiallyFilled | OrderStatus::TriggerPending => true,
            OrderStatus::Filled
            | OrderStatus::Cancelled
            | OrderStatus::Expired
            | OrderStatus::TriggerFailed => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    #[serde(rename = "GTC")]
    GoodTillCancel,
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    #[serde(rename = "FOK")]
    FillOrKill,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::GoodTillCancel => "GTC",
            TimeInForce::ImmediateOrCancel => "IOC",
            TimeInForce::FillOrKill => "FOK",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfTradePrevention {
    RejectTaker,
    RejectMaker,
    RejectBoth,
}

impl SelfTradePrevention {
    pub fn as_str(self) -> &'static str {
        match self {
            SelfTradePrevention::RejectTaker => "RejectTaker",
            SelfTradePrevention::RejectMaker => "RejectMaker",
            SelfTradePrevention::RejectBoth => "RejectBoth",
        }
    }
}

/// Order returned by placement, cancellation and open-order queries.
///
/// The exchange uses one response shape for every order kind and tells them
/// apart with `orderType`; limit-style orders always carry a price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orderType")]
pub enum Order {
    Limit(LimitOrder),
    StopLimit(LimitOrder),
    Market(MarketOrder),
    StopMarket(MarketOrder),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub id: OrderId,
    #[serde(default)]
    pub client_id: Option<u32>,
    #[serde(default)]
    pub created_at: i64,
    pub executed_quantity: Decimal,
    pub executed_quote_quantity: Decimal,
    #[serde(default)]
    pub post_only: bool,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: Option<bool>,
    #[serde(default)]
    pub self_trade_prevention: Option<SelfTradePrevention>,
    pub status: OrderStatus,
    pub side: Side,
    pub symbol: Symbol,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub trigger_quantity: Option<Decimal>,
    #[serde(default)]
    pub triggered_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrder {
    pub id: OrderId,
    #[serde(default)]
    pub client_id: Option<u32>,
    #[serde(default)]
    pub created_at: i64,
    pub executed_quantity: Decimal,
    pub executed_quote_quantity: Decimal,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: Option<bool>,
    #[serde(default)]
    pub self_trade_prevention: Option<SelfTradePrevention>,
    pub status: OrderStatus,
    pub side: Side,
    pub symbol: Symbol,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub trigger_quantity: Option<Decimal>,
    #[serde(default)]
    pub triggered_at: Option<i64>,
}

impl Order {
    pub fn id(&self) -> &OrderId {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => &order.id,
            Order::Market(order) | Order::StopMarket(order) => &order.id,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => &order.symbol,
            Order::Market(order) | Order::StopMarket(order) => &order.symbol,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => order.side,
            Order::Market(order) | Order::StopMarket(order) => order.side,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => order.status,
            Order::Market(order) | Order::StopMarket(order) => order.status,
        }
    }

    pub fn executed_quantity(&self) -> Decimal {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => order.executed_quantity,
            Order::Market(order) | Order::StopMarket(order) => order.executed_quantity,
        }
    }

    pub fn executed_quote_quantity(&self) -> Decimal {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => order.executed_quote_quantity,
            Order::Market(order) | Order::StopMarket(order) => order.executed_quote_quantity,
        }
    }

    /// Requested base quantity. Market orders sized in quote have none.
    pub fn quantity(&self) -> Option<Decimal> {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => Some(order.quantity),
            Order::Market(order) | Order::StopMarket(order) => order.quantity,
        }
    }

    pub fn price(&self) -> Option<Decimal> {
        match self {
            Order::Limit(order) | Order::StopLimit(order) => Some(order.price),
            Order::Market(_) | Order::StopMarket(_) => None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status().is_filled()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub available: Decimal,
    pub locked: Decimal,
    pub staked: Decimal,
}

/// Balances keyed by asset symbol (`SOL`, `USDC`, ...).
pub type Balances = BTreeMap<String, Balance>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemOrderType {
    CollateralConversion,
    FutureExpiry,
    LiquidatePositionOnAdl,
    LiquidatePositionOnBook,
    LiquidatePositionOnBackstop,
    OrderBookClosed,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillHistory {
    #[serde(default)]
    pub client_id: Option<String>,
    pub fee: Decimal,
    pub fee_symbol: String,
    pub is_maker: bool,
    pub order_id: OrderId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    pub symbol: Symbol,
    #[serde(default)]
    pub system_order_type: Option<SystemOrderType>,
    pub timestamp: String,
    #[serde(default)]
    pub trade_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowLendPosition {
    pub cumulative_interest: Decimal,
    pub id: String,
    pub imf: Decimal,
    pub net_quantity: Decimal,
    pub mark_price: Decimal,
    pub mmf: Decimal,
    pub net_exposure_quantity: Decimal,
    pub net_exposure_notional: Decimal,
    pub symbol: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_depth_parses_string_levels() {
        let depth: Depth = serde_json::from_value(json!({
            "asks": [["100.50", "1.2"], ["101", "3"]],
            "bids": [["99", "1"]],
            "lastUpdateId": "1234",
            "timestamp": 1700000000000i64
        }))
        .unwrap();

        assert_eq!(depth.asks[0].price, dec!(100.50));
        assert_eq!(depth.asks[0].price.to_string(), "100.50");
        assert_eq!(depth.bids[0].quantity, dec!(1));
        assert_eq!(depth.last_update_id, "1234");
    }

    #[test]
    fn test_depth_accepts_numeric_update_id() {
        let depth: Depth = serde_json::from_value(json!({
            "asks": [],
            "bids": [],
            "lastUpdateId": 42,
            "timestamp": 1
        }))
        .unwrap();
        assert_eq!(depth.last_update_id, "42");
    }

    #[test]
    fn test_order_is_tagged_by_order_type() {
        let limit: Order = serde_json::from_value(json!({
            "orderType": "Limit",
            "id": "111",
            "createdAt": 1700000000000i64,
            "executedQuantity": "2",
            "executedQuoteQuantity": "200",
            "postOnly": false,
            "price": "100",
            "quantity": "2",
            "quoteQuantity": "200",
            "selfTradePrevention": "RejectTaker",
            "status": "Filled",
            "side": "Bid",
            "symbol": "SOL_USDC",
            "timeInForce": "GTC"
        }))
        .unwrap();

        assert!(matches!(limit, Order::Limit(_)));
        assert!(limit.is_filled());
        assert_eq!(limit.price(), Some(dec!(100)));
        assert_eq!(limit.executed_quantity(), dec!(2));
        assert_eq!(limit.id().as_str(), "111");

        let market: Order = serde_json::from_value(json!({
            "orderType": "Market",
            "id": "222",
            "executedQuantity": "0",
            "executedQuoteQuantity": "0",
            "quoteQuantity": "50",
            "status": "Cancelled",
            "side": "Ask",
            "symbol": "SOL_USDC",
            "timeInForce": "IOC"
        }))
        .unwrap();

        assert!(matches!(market, Order::Market(_)));
        assert!(!market.is_filled());
        assert_eq!(market.price(), None);
        assert_eq!(market.quantity(), None);
        assert_eq!(market.side(), Side::Ask);
    }

    #[test]
    fn test_status_classification() {
        assert!(OrderStatus::Filled.is_filled());
        assert!(!OrderStatus::PartiallyFilled.is_filled());
        assert!(OrderStatus::PartiallyFilled.is_open());
        assert!(!OrderStatus::Expired.is_open());
    }

    #[test]
    fn test_fill_history_tolerates_unknown_system_type() {
        let fill: FillHistory = serde_json::from_value(json!({
            "fee": "0.01",
            "feeSymbol": "USDC",
            "isMaker": false,
            "orderId": "9",
            "price": "10",
            "quantity": "1",
            "side": "Ask",
            "symbol": "SOL_USDC",
            "systemOrderType": "SomethingNew",
            "timestamp": "2024-01-01T00:00:00",
            "tradeId": 5
        }))
        .unwrap();
        assert_eq!(fill.system_order_type, Some(SystemOrderType::Other));
    }
}
