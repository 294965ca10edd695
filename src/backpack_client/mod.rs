mod auth;
mod client;
mod errors;
mod pagination;
mod params;
mod queries;
mod rest;

pub use auth::{
    canonical_message, now_millis, sign_request, AuthHeaders, SignedRequest, CONTENT_TYPE_JSON,
    HEADER_API_KEY, HEADER_SIGNATURE, HEADER_TIMESTAMP, HEADER_WINDOW, WINDOW_MS,
};
pub use client::{
    AccountHandle, BackpackClient, BackpackClientBuilder, BorrowLendHandle, OrderRequest,
    OrdersHandle, API_SECRET_ENV, API_URL_ENV, DEFAULT_API_URL, DEFAULT_TIMEOUT,
};
pub use errors::{Error, Result};
pub use params::{BorrowLendSide, MarketType, OrderType, ParamValue, RequestParams, RewardStatus};
pub use queries::{FillHistoryQuery, OpenOrdersQuery, RewardsQuery};
pub use rest::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

pub use reqwest::Method;
