use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    auth::SignedRequest,
    errors::{Error, Result},
    params::RequestParams,
};
use crate::timings;

/// Outgoing HTTP request as handed to a [`HttpTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Black-box "send request, get response or error" capability.
///
/// Implementations report transport failures as [`Error::Request`] without a
/// status. Any status code, including non-2xx, is returned as a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| Error::transport(format!("failed to build http client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| Error::transport(err.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Thin wrapper that turns endpoints and parameters into transport calls.
pub(crate) struct RestClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl RestClient {
    pub(crate) fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) async fn get_public<T>(&self, path: &str, params: &RequestParams) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = HttpRequest {
            method: Method::GET,
            url: self.endpoint(path, &params.query_pairs())?,
            headers: Vec::new(),
            body: None,
        };
        self.dispatch(request).await
    }

    /// Send a signed request. GET puts the parameters in the query string,
    /// POST and DELETE send them as a JSON body.
    pub(crate) async fn send_signed<T>(
        &self,
        method: Method,
        path: &str,
        signed: &SignedRequest,
        params: &RequestParams,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let (url, body) = if method == Method::GET {
            (self.endpoint(path, &params.query_pairs())?, None)
        } else {
            (
                self.endpoint(path, &[])?,
                Some(params.to_json_body().to_string()),
            )
        };

        let request = HttpRequest {
            method,
            url,
            headers: signed.headers().to_pairs(),
            body,
        };
        tracing::debug!(
            instruction = signed.instruction(),
            method = %request.method,
            url = %request.url,
            "sending signed request"
        );
        self.dispatch(request).await
    }

    fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::invalid_config("api_url", format!("cannot join {path}: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn dispatch<T>(&self, request: HttpRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let label = format!("{} {}", request.method, request.url.path());
        let response = timings::time_async_block(&label, self.transport.execute(request)).await?;
        decode_response(response)
    }
}

pub(crate) fn decode_response<T>(response: HttpResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    if !(200..300).contains(&response.status) {
        let error = Error::from_response(response.status, &response.body);
        tracing::warn!(status = response.status, %error, "request rejected");
        return Err(error);
    }

    let body = response.body.trim();
    let body = if body.is_empty() { "null" } else { body };
    Ok(serde_json::from_str(body)?)
}

/// Make sure the base URL ends in `/` so relative endpoint joins keep any
/// path prefix.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|err| Error::invalid_config("api_url", err.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
