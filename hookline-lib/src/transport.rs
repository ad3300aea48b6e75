//! The HTTP exchange behind every delivery.
//!
//! The drainer only needs "send this body, give me status, headers and the
//! body back". [`Transport`] is that seam; [`ReqwestTransport`] is the
//! implementation used by [`ClientBuilder`](crate::ClientBuilder) unless a
//! custom one is configured.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use reqwest::Response;
use url::Url;

use crate::{ErrorKind, RequestBody, Result};

/// The outcome of a single HTTP exchange.
///
/// This abstraction exists, because [`Response`] hands out its body only
/// once and is tied to `reqwest`. The bucket may need to look at the body of
/// a rate limited response and the drainer includes it in failures.
#[derive(Debug, Clone)]
pub struct ExchangeResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ExchangeResponse {
    /// Create a response from its parts
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Read status, headers and the complete body of a `reqwest` response.
    ///
    /// A `gzip` encoded body is decompressed by `reqwest` before it gets here.
    async fn from_response(response: Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ErrorKind::ReadResponseBody)?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Status code of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw response body
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Response body, lossily decoded as UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns `true` for `429 Too Many Requests`
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Returns `true` for any `2xx` status
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Performs the HTTP exchange for one queued message.
///
/// Implementations must not retry on their own; rate limits are the
/// drainer's business and every other failure is reported to the caller.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `body` to the webhook.
    ///
    /// Any HTTP status is a successful exchange. Return `Err` only if the
    /// exchange could not be completed.
    async fn execute(&self, body: RequestBody) -> Result<ExchangeResponse>;
}

/// Posts every body to a fixed URL using a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: Url,
}

impl ReqwestTransport {
    /// Create a transport posting to `url`.
    ///
    /// Default headers such as the user agent are taken from `client`.
    #[must_use]
    pub const fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    /// The URL messages are posted to
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, body: RequestBody) -> Result<ExchangeResponse> {
        let response = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, body.content_type().clone())
            .body(body.data().clone())
            .send()
            .await
            .map_err(ErrorKind::NetworkRequest)?;

        ExchangeResponse::from_response(response).await
    }
}
