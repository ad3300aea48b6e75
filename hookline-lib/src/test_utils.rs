use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::time::Instant;
use url::Url;

use crate::{Client, ClientBuilder, ExchangeResponse, RequestBody, Result, Transport};

/// A [`Transport`] which answers from a script instead of the network.
///
/// Responses are handed out in order. Once the script runs out, every
/// request is answered with `204 No Content`. Every request is recorded
/// together with the (tokio) instant it was made.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ExchangeResponse>>>,
    received: Mutex<Vec<(Instant, RequestBody)>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every exchange takes `latency` to complete
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Append a response to the script
    pub(crate) fn then(self, response: Result<ExchangeResponse>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// The `content` of every received message, in order
    pub(crate) fn contents(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| {
                let value: serde_json::Value = serde_json::from_slice(body.data()).unwrap();
                value["content"].as_str().unwrap_or_default().to_string()
            })
            .collect()
    }

    /// When each request was made
    pub(crate) fn sent_at(&self) -> Vec<Instant> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, body: RequestBody) -> Result<ExchangeResponse> {
        self.received.lock().unwrap().push((Instant::now(), body));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(response(StatusCode::NO_CONTENT, &[], "")))
    }
}

/// Build a client on the current runtime which sends through `transport`
pub(crate) fn client(transport: &Arc<ScriptedTransport>) -> Client {
    let transport: Arc<dyn Transport> = transport.clone();
    ClientBuilder::builder()
        .url(Url::parse("https://discord.com/api/webhooks/1234/token").unwrap())
        .transport(transport)
        .build()
        .client()
        .unwrap()
}

pub(crate) fn response(
    status: StatusCode,
    pairs: &[(&str, &str)],
    body: &'static str,
) -> ExchangeResponse {
    let headers: HeaderMap = pairs
        .iter()
        .map(|(name, value)| {
            (
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            )
        })
        .collect();
    ExchangeResponse::new(status, headers, body.as_bytes())
}

/// A `429` asking to retry after `seconds`
pub(crate) fn too_many_requests(seconds: &str) -> Result<ExchangeResponse> {
    Ok(response(
        StatusCode::TOO_MANY_REQUESTS,
        &[("Retry-After", seconds)],
        "",
    ))
}

/// A successful response reporting `remaining` of `limit` requests left in a
/// window which ends `reset_in` seconds from now
pub(crate) fn window(remaining: u64, limit: u64, reset_in: u64) -> Result<ExchangeResponse> {
    let now = SystemTime::now();
    let now_secs = now.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs();
    Ok(response(
        StatusCode::OK,
        &[
            ("X-RateLimit-Remaining", remaining.to_string().as_str()),
            ("X-RateLimit-Limit", limit.to_string().as_str()),
            ("Date", httpdate::fmt_http_date(now).as_str()),
            ("X-RateLimit-Reset", (now_secs + reset_in).to_string().as_str()),
        ],
        "",
    ))
}

/// Yield to the drainer until `done` holds
pub(crate) async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}
