use std::{fmt, sync::Arc, time::Duration};

use futures_util::Stream;
use reqwest::Method;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{
    auth::{self, SignedRequest},
    errors::{Error, Result},
    pagination::paginate_offset,
    params::{BorrowLendSide, OrderType, RequestParams},
    queries::{FillHistoryQuery, OpenOrdersQuery, RewardsQuery},
    rest::{normalize_base_url, HttpTransport, ReqwestTransport, RestClient},
};
use crate::{
    models::{Balances, BorrowLendPosition, Depth, FillHistory, Order, SelfTradePrevention, TimeInForce},
    signer::{self, Credential},
    types::{ClientId, OrderId, Side, Symbol},
};

/// Public REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.backpack.exchange/";
/// Environment variable holding the base64 API secret.
pub const API_SECRET_ENV: &str = "BACKPACK_API_SECRET";
/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "BACKPACK_API_URL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Authenticated client for the Backpack REST API.
///
/// Owns the signing credential for its whole lifetime and is read-only after
/// construction, so it can be shared behind an `Arc`.
pub struct BackpackClient {
    rest: RestClient,
    credential: Credential,
    clock: Clock,
}

impl fmt::Debug for BackpackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackpackClient")
            .field("api_url", &self.rest.base_url().as_str())
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl BackpackClient {
    /// Create a new builder used to configure a [`BackpackClient`].
    pub fn builder() -> BackpackClientBuilder {
        BackpackClientBuilder {
            api_url: None,
            secret: None,
            transport: None,
            timeout: DEFAULT_TIMEOUT,
            clock: None,
        }
    }

    /// Client against the public endpoint using `secret`.
    pub fn new(secret: SecretString) -> Result<Self> {
        Self::builder().secret(secret).build()
    }

    /// Read the secret from `BACKPACK_API_SECRET` and the optional endpoint
    /// override from `BACKPACK_API_URL`.
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var(API_SECRET_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::invalid_config("api_secret", format!("{API_SECRET_ENV} not found")))?;

        let mut builder = Self::builder().secret(SecretString::from(secret));
        if let Ok(url) = std::env::var(API_URL_ENV) {
            builder = builder.api_url(url);
        }
        builder.build()
    }

    pub fn api_url(&self) -> &Url {
        self.rest.base_url()
    }

    /// Base64 public key sent as `X-API-KEY`.
    pub fn public_key_base64(&self) -> &str {
        self.credential.public_key_base64()
    }

    /// Sign `instruction` and `params` at the client's current time.
    pub fn sign_request(&self, instruction: &str, params: &RequestParams) -> SignedRequest {
        auth::sign_request(&self.credential, instruction, params, (self.clock)())
    }

    /// Check that `signed` carries a valid signature from this client's key.
    pub fn verify(&self, signed: &SignedRequest) -> Result<()> {
        signer::verify_signature(
            &self.credential.public_key(),
            signed.canonical_query().as_bytes(),
            signed.signature(),
        )?;
        Ok(())
    }

    /// Sign and send a private request. A fresh signature is computed for
    /// every call.
    pub async fn make_auth_request<T>(
        &self,
        method: Method,
        endpoint: &str,
        instruction: &str,
        params: &RequestParams,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let signed = self.sign_request(instruction, params);
        self.rest.send_signed(method, endpoint, &signed, params).await
    }

    /// Unauthenticated order book snapshot.
    pub async fn get_depth(&self, symbol: &Symbol) -> Result<Depth> {
        let params = RequestParams::new().with("symbol", symbol);
        self.rest.get_public("/api/v1/depth", &params).await
    }

    /// Access balance, fill and reward helpers.
    pub fn account(&self) -> AccountHandle<'_> {
        AccountHandle { c: self }
    }

    /// Access order placement and cancellation helpers.
    pub fn orders(&self) -> OrdersHandle<'_> {
        OrdersHandle { c: self }
    }

    /// Access borrow/lend helpers.
    pub fn borrow_lend(&self) -> BorrowLendHandle<'_> {
        BorrowLendHandle { c: self }
    }
}

pub struct AccountHandle<'a> {
    c: &'a BackpackClient,
}

impl<'a> AccountHandle<'a> {
    pub async fn balances(&self) -> Result<Balances> {
        self.c
            .make_auth_request(
                Method::GET,
                "/api/v1/capital",
                "balanceQuery",
                &RequestParams::new(),
            )
            .await
    }

    /// One page of fills.
    pub async fn fill_history(&self, query: &FillHistoryQuery) -> Result<Vec<FillHistory>> {
        self.fill_page(query, query.offset_value()).await
    }

    /// Every fill from `query`'s offset onwards, page by page.
    pub fn fills(
        &self,
        query: FillHistoryQuery,
    ) -> impl Stream<Item = Result<FillHistory>> + 'a {
        let c = self.c;
        let start = query.offset_value();
        let limit = query.limit();
        paginate_offset(start, limit, move |offset| {
            let query = query.clone();
            async move { AccountHandle { c }.fill_page(&query, offset).await }
        })
    }

    async fn fill_page(&self, query: &FillHistoryQuery, offset: i64) -> Result<Vec<FillHistory>> {
        self.c
            .make_auth_request(
                Method::GET,
                "/wapi/v1/history/fills",
                "fillHistoryQueryAll",
                &query.to_params(offset),
            )
            .await
    }

    /// One page of rewards. The payload is passed through untyped.
    pub async fn rewards(&self, query: &RewardsQuery<'_>) -> Result<Value> {
        self.c
            .make_auth_request(
                Method::GET,
                "/wapi/v1/user/rewards",
                "userRewardsQuery",
                &query.to_params(query.offset_value()),
            )
            .await
    }

    /// Every reward entry from `query`'s offset onwards.
    pub fn reward_entries(
        &self,
        query: RewardsQuery<'static>,
    ) -> impl Stream<Item = Result<Value>> + 'a {
        let c = self.c;
        let start = query.offset_value();
        let limit = query.limit();
        paginate_offset(start, limit, move |offset| {
            let params = query.to_params(offset);
            async move {
                c.make_auth_request::<Vec<Value>>(
                    Method::GET,
                    "/wapi/v1/user/rewards",
                    "userRewardsQuery",
                    &params,
                )
                .await
            }
        })
    }
}

pub struct OrdersHandle<'a> {
    c: &'a BackpackClient,
}

impl<'a> OrdersHandle<'a> {
    pub async fn open(&self, query: &OpenOrdersQuery) -> Result<Vec<Order>> {
        self.c
            .make_auth_request(
                Method::GET,
                "/api/v1/orders",
                "orderQueryAll",
                &query.to_params(),
            )
            .await
    }

    /// Submit an order. The request is validated before anything is signed.
    pub async fn execute(&self, request: &OrderRequest) -> Result<Order> {
        request.validate()?;
        let order: Order = self
            .c
            .make_auth_request(
                Method::POST,
                "/api/v1/order",
                "orderExecute",
                &request.to_params(),
            )
            .await?;
        tracing::debug!(
            order_id = %order.id(),
            status = %order.status(),
            side = %order.side(),
            "order accepted"
        );
        Ok(order)
    }

    /// Cancel one order by exchange id or by client id. Exactly one of the
    /// two must be given.
    pub async fn cancel(
        &self,
        symbol: &Symbol,
        order_id: Option<&OrderId>,
        client_id: Option<ClientId>,
    ) -> Result<Order> {
        match (order_id, client_id) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "only one of orderId or clientId can be specified".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "one of orderId or clientId must be specified".to_string(),
                ))
            }
            _ => {}
        }

        let params = RequestParams::new()
            .with("symbol", symbol)
            .with_opt("orderId", order_id)
            .with_opt("clientId", client_id);
        self.c
            .make_auth_request(Method::DELETE, "/api/v1/order", "orderCancel", &params)
            .await
    }

    /// Cancel every open order on `symbol`.
    pub async fn cancel_all(&self, symbol: &Symbol) -> Result<Vec<Order>> {
        let params = RequestParams::new().with("symbol", symbol);
        self.c
            .make_auth_request(Method::DELETE, "/api/v1/orders", "orderCancelAll", &params)
            .await
    }
}

pub struct BorrowLendHandle<'a> {
    c: &'a BackpackClient,
}

impl<'a> BorrowLendHandle<'a> {
    pub async fn positions(&self) -> Result<Vec<BorrowLendPosition>> {
        self.c
            .make_auth_request(
                Method::GET,
                "/api/v1/borrowLend/positions",
                "borrowLendPositionQuery",
                &RequestParams::new(),
            )
            .await
    }

    /// Borrow or lend `quantity` of the asset `symbol` (e.g. `USDC`).
    pub async fn execute(
        &self,
        quantity: Decimal,
        side: BorrowLendSide,
        symbol: &str,
    ) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "borrow/lend quantity must be positive, got {quantity}"
            )));
        }
        let params = RequestParams::new()
            .with("quantity", quantity)
            .with("side", side)
            .with("symbol", symbol);
        self.c
            .make_auth_request(
                Method::POST,
                "/api/v1/borrowLend",
                "borrowLendExecute",
                &params,
            )
            .await
    }
}

/// Body of an `orderExecute` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRequest {
    order_type: OrderType,
    side: Side,
    symbol: Symbol,
    price: Option<Decimal>,
    quantity: Option<Decimal>,
    quote_quantity: Option<Decimal>,
    auto_lend: Option<bool>,
    auto_lend_redeem: Option<bool>,
    auto_borrow: Option<bool>,
    auto_borrow_repay: Option<bool>,
    client_id: Option<ClientId>,
    post_only: Option<bool>,
    reduce_only: Option<bool>,
    self_trade_prevention: Option<SelfTradePrevention>,
    time_in_force: Option<TimeInForce>,
    trigger_price: Option<Decimal>,
    trigger_quantity: Option<Decimal>,
}

impl OrderRequest {
    pub fn new(order_type: OrderType, side: Side, symbol: Symbol) -> Self {
        Self {
            order_type,
            side,
            symbol,
            price: None,
            quantity: None,
            quote_quantity: None,
            auto_lend: None,
            auto_lend_redeem: None,
            auto_borrow: None,
            auto_borrow_repay: None,
            client_id: None,
            post_only: None,
            reduce_only: None,
            self_trade_prevention: None,
            time_in_force: None,
            trigger_price: None,
            trigger_quantity: None,
        }
    }

    pub fn limit(side: Side, symbol: Symbol, price: Decimal, quantity: Decimal) -> Self {
        Self::new(OrderType::Limit, side, symbol)
            .price(price)
            .quantity(quantity)
    }

    pub fn market(side: Side, symbol: Symbol, quantity: Decimal) -> Self {
        Self::new(OrderType::Market, side, symbol).quantity(quantity)
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn quote_quantity(mut self, quote_quantity: Decimal) -> Self {
        self.quote_quantity = Some(quote_quantity);
        self
    }

    pub fn auto_lend(mut self, enabled: bool) -> Self {
        self.auto_lend = Some(enabled);
        self
    }

    pub fn auto_lend_redeem(mut self, enabled: bool) -> Self {
        self.auto_lend_redeem = Some(enabled);
        self
    }

    pub fn auto_borrow(mut self, enabled: bool) -> Self {
        self.auto_borrow = Some(enabled);
        self
    }

    pub fn auto_borrow_repay(mut self, enabled: bool) -> Self {
        self.auto_borrow_repay = Some(enabled);
        self
    }

    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn post_only(mut self, enabled: bool) -> Self {
        self.post_only = Some(enabled);
        self
    }

    pub fn reduce_only(mut self, enabled: bool) -> Self {
        self.reduce_only = Some(enabled);
        self
    }

    pub fn self_trade_prevention(mut self, mode: SelfTradePrevention) -> Self {
        self.self_trade_prevention = Some(mode);
        self
    }

    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    pub fn trigger_price(mut self, price: Decimal) -> Self {
        self.trigger_price = Some(price);
        self
    }

    pub fn trigger_quantity(mut self, quantity: Decimal) -> Self {
        self.trigger_quantity = Some(quantity);
        self
    }

    pub fn side_value(&self) -> Side {
        self.side
    }

    pub fn symbol_ref(&self) -> &Symbol {
        &self.symbol
    }

    pub fn price_value(&self) -> Option<Decimal> {
        self.price
    }

    pub fn quantity_value(&self) -> Option<Decimal> {
        self.quantity
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: Option<Decimal>| match value {
            Some(value) if value <= Decimal::ZERO => Err(Error::InvalidArgument(format!(
                "{name} must be positive, got {value}"
            ))),
            _ => Ok(()),
        };
        positive("price", self.price)?;
        positive("quantity", self.quantity)?;
        positive("quoteQuantity", self.quote_quantity)?;
        positive("triggerPrice", self.trigger_price)?;
        positive("triggerQuantity", self.trigger_quantity)?;

        match self.order_type {
            OrderType::Limit | OrderType::StopLimit => {
                if self.price.is_none() || self.quantity.is_none() {
                    return Err(Error::InvalidArgument(format!(
                        "{} orders need both price and quantity",
                        self.order_type.as_str()
                    )));
                }
            }
            OrderType::Market | OrderType::StopMarket => {
                if self.quantity.is_none() && self.quote_quantity.is_none() {
                    return Err(Error::InvalidArgument(format!(
                        "{} orders need quantity or quoteQuantity",
                        self.order_type.as_str()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn to_params(&self) -> RequestParams {
        RequestParams::new()
            .with("orderType", self.order_type)
            .with("side", self.side)
            .with("symbol", &self.symbol)
            .with_opt("price", self.price)
            .with_opt("quantity", self.quantity)
            .with_opt("quoteQuantity", self.quote_quantity)
            .with_opt("autoLend", self.auto_lend)
            .with_opt("autoLendRedeem", self.auto_lend_redeem)
            .with_opt("autoBorrow", self.auto_borrow)
            .with_opt("autoBorrowRepay", self.auto_borrow_repay)
            .with_opt("clientId", self.client_id)
            .with_opt("postOnly", self.post_only)
            .with_opt("reduceOnly", self.reduce_only)
            .with_opt("selfTradePrevention", self.self_trade_prevention)
            .with_opt("timeInForce", self.time_in_force)
            .with_opt("triggerPrice", self.trigger_price)
            .with_opt("triggerQuantity", self.trigger_quantity)
    }
}

pub struct BackpackClientBuilder {
    api_url: Option<String>,
    secret: Option<SecretString>,
    transport: Option<Arc<dyn HttpTransport>>,
    timeout: Duration,
    clock: Option<Clock>,
}

impl BackpackClientBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn secret(mut self, secret: SecretString) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Replace the reqwest transport, mostly useful in tests.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Per-request timeout for the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Millisecond clock used for `X-TIMESTAMP`.
    pub fn clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<BackpackClient> {
        let secret = self
            .secret
            .ok_or_else(|| Error::invalid_config("api_secret", "API secret not found"))?;
        let credential = Credential::from_base64_secret(&secret)
            .map_err(|err| Error::invalid_config("api_secret", err.to_string()))?;

        let api_url = normalize_base_url(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(Some(self.timeout))?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(auth::now_millis));

        tracing::debug!(
            api_url = %api_url,
            api_key = credential.public_key_base64(),
            "backpack client ready"
        );

        Ok(BackpackClient {
            rest: RestClient::new(api_url, transport),
            credential,
            clock,
        })
    }
}
