use super::{
    errors::{Error, Result},
    params::{MarketType, RequestParams, RewardStatus},
};
use crate::types::{OrderId, Symbol};

const DEFAULT_LIMIT: i64 = 100;

fn check_limit(limit: i64) -> Result<i64> {
    if limit <= 0 {
        return Err(Error::invalid_config("limit", "must be positive"));
    }
    Ok(limit)
}

fn check_offset(offset: i64) -> Result<i64> {
    if offset < 0 {
        return Err(Error::invalid_config("offset", "must not be negative"));
    }
    Ok(offset)
}

/// Filter for `GET /wapi/v1/history/fills`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillHistoryQuery {
    market_type: MarketType,
    limit: i64,
    offset: i64,
    symbol: Option<Symbol>,
    order_id: Option<OrderId>,
}

impl Default for FillHistoryQuery {
    fn default() -> Self {
        Self {
            market_type: MarketType::Spot,
            limit: DEFAULT_LIMIT,
            offset: 0,
            symbol: None,
            order_id: None,
        }
    }
}

impl FillHistoryQuery {
    pub fn new(limit: i64) -> Result<Self> {
        Ok(Self {
            limit: check_limit(limit)?,
            ..Self::default()
        })
    }

    pub fn market_type(mut self, market_type: MarketType) -> Self {
        self.market_type = market_type;
        self
    }

    pub fn offset(mut self, offset: i64) -> Result<Self> {
        self.offset = check_offset(offset)?;
        Ok(self)
    }

    /// Only fills on `symbol`.
    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Only fills of one order.
    pub fn order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset_value(&self) -> i64 {
        self.offset
    }

    pub fn market_type_value(&self) -> MarketType {
        self.market_type
    }

    pub(crate) fn to_params(&self, offset: i64) -> RequestParams {
        RequestParams::new()
            .with("marketType", self.market_type)
            .with("limit", self.limit)
            .with("offset", offset)
            .with_opt("symbol", self.symbol.as_ref())
            .with_opt("orderId", self.order_id.as_ref())
    }
}

/// Filter for `GET /wapi/v1/user/rewards`.
#[derive(Clone, Debug)]
pub struct RewardsQuery<'a> {
    status: RewardStatus<'a>,
    limit: i64,
    offset: i64,
}

impl Default for RewardsQuery<'_> {
    fn default() -> Self {
        Self {
            status: RewardStatus::Claimed,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl<'a> RewardsQuery<'a> {
    pub fn new(limit: i64) -> Result<Self> {
        Ok(Self {
            limit: check_limit(limit)?,
            ..Self::default()
        })
    }

    pub fn status(mut self, status: RewardStatus<'a>) -> Self {
        self.status = status;
        self
    }

    pub fn offset(mut self, offset: i64) -> Result<Self> {
        self.offset = check_offset(offset)?;
        Ok(self)
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset_value(&self) -> i64 {
        self.offset
    }

    pub fn status_ref(&self) -> &RewardStatus<'a> {
        &self.status
    }

    pub(crate) fn to_params(&self, offset: i64) -> RequestParams {
        RequestParams::new()
            .with("status", self.status.as_str())
            .with("limit", self.limit)
            .with("offset", offset)
    }
}

/// Filter for `GET /api/v1/orders`. Both fields are optional and omitted from
/// the request when unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOrdersQuery {
    symbol: Option<Symbol>,
    market_type: Option<MarketType>,
}

impl OpenOrdersQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn market_type(mut self, market_type: MarketType) -> Self {
        self.market_type = Some(market_type);
        self
    }

    pub fn symbol_ref(&self) -> Option<&Symbol> {
        self.symbol.as_ref()
    }

    pub fn market_type_value(&self) -> Option<MarketType> {
        self.market_type
    }

    pub(crate) fn to_params(&self) -> RequestParams {
        RequestParams::new()
            .with_opt("symbol", self.symbol.as_ref())
            .with_opt("marketType", self.market_type)
    }
}
