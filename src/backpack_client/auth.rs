//! Request signing for private endpoints.
//!
//! The signed message is `instruction=<name>`, then every present parameter in
//! key order, then `timestamp` and `window`, form-urlencoded and joined with
//! `&`. The exchange rebuilds the same string, so the ordering is part of the
//! protocol.

use url::form_urlencoded;

use super::params::RequestParams;
use crate::signer::Credential;

/// Validity window in milliseconds sent with every signed request.
pub const WINDOW_MS: &str = "5000";

pub const HEADER_API_KEY: &str = "X-API-KEY";
pub const HEADER_TIMESTAMP: &str = "X-TIMESTAMP";
pub const HEADER_WINDOW: &str = "X-WINDOW";
pub const HEADER_SIGNATURE: &str = "X-SIGNATURE";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Build the exact string that gets signed.
pub fn canonical_message(instruction: &str, params: &RequestParams, timestamp_ms: u64) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("instruction", instruction);
    for (key, value) in params.present() {
        serializer.append_pair(key, &value.to_query_value());
    }
    serializer.append_pair("timestamp", &timestamp_ms.to_string());
    serializer.append_pair("window", WINDOW_MS);
    serializer.finish()
}

/// Sign `instruction` and `params` at `timestamp_ms`.
pub fn sign_request(
    credential: &Credential,
    instruction: &str,
    params: &RequestParams,
    timestamp_ms: u64,
) -> SignedRequest {
    let canonical = canonical_message(instruction, params, timestamp_ms);
    let signature = credential.sign(canonical.as_bytes());
    SignedRequest {
        instruction: instruction.to_string(),
        timestamp_ms,
        canonical,
        headers: AuthHeaders {
            api_key: credential.public_key_base64().to_string(),
            timestamp: timestamp_ms.to_string(),
            window: WINDOW_MS,
            content_type: CONTENT_TYPE_JSON,
            signature,
        },
    }
}

/// Per-attempt signature. The timestamp ties it to a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
    instruction: String,
    timestamp_ms: u64,
    canonical: String,
    headers: AuthHeaders,
}

impl SignedRequest {
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn canonical_query(&self) -> &str {
        &self.canonical
    }

    pub fn signature(&self) -> &str {
        &self.headers.signature
    }

    pub fn headers(&self) -> &AuthHeaders {
        &self.headers
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub window: &'static str,
    pub content_type: &'static str,
    pub signature: String,
}

impl AuthHeaders {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_API_KEY, self.api_key.clone()),
            (HEADER_TIMESTAMP, self.timestamp.clone()),
            (HEADER_WINDOW, self.window.to_string()),
            ("Content-Type", self.content_type.to_string()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
