use serde::Deserialize;

use crate::{
    errors::SignerError,
    models::OrderStatus,
    types::{OrderId, Side, Symbol},
};

/// Result type used by [`BackpackClient`](super::BackpackClient) and the volume loop.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the high level client API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration validation failure: credential, pair, level or limits.
    #[error("invalid config: {field}: {why}")]
    InvalidConfig {
        field: &'static str,
        why: String,
    },
    /// Caller contract violation detected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Transport failure or non-2xx response.
    #[error("API request failed: {}{message}", status_prefix(.status))]
    Request {
        status: Option<u16>,
        message: String,
    },
    /// A placed order did not fill within the retry budget.
    #[error("order {order_id} not filled (status {status}) after {attempts} attempt(s)")]
    OrderNotFilled {
        order_id: OrderId,
        status: OrderStatus,
        attempts: u32,
    },
    /// Depth snapshot had no level on the side an order needs to cross.
    #[error("order book for {symbol} has no {side} levels to cross")]
    EmptyBook { symbol: Symbol, side: Side },
    /// Errors bubbled up from the credential.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
    /// A 2xx response body that does not match the expected model.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_config(field: &'static str, why: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            why: why.into(),
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Request {
            status: None,
            message: message.into(),
        }
    }

    /// Build a request error from a non-2xx response, preferring the
    /// server's `message` field over the raw body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ServerErr>(body)
            .ok()
            .and_then(|err| err.message)
            .filter(|message| !message.is_empty())
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| format!("request failed with status code {status}"));

        Error::Request {
            status: Some(status),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_prefix(status: &Option<u16>) -> String {
    status
        .map(|status| format!("Status {status} - "))
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerErr {
    #[serde(default)]
    pub(crate) message: Option<String>,
}
