//! Handle rate limiting headers.
//!
//! Webhooks report their limits through the common `X-RateLimit-*` headers
//! plus the standard `Retry-After` and `Date` headers. A rate limited
//! response may carry the delay in its JSON body instead.

use http::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::{Duration, SystemTime};
use thiserror::Error;

pub(crate) const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub(crate) const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Error)]
pub(crate) enum RateLimitHeaderError {
    #[error("Unable to parse value '{value}' of header {name}")]
    ValueError { name: &'static str, value: String },

    #[error("Header {0} contains invalid chars")]
    HeaderValueError(&'static str),

    #[error("Unable to read retry delay from response body: {0}")]
    BodyError(#[from] serde_json::Error),

    #[error("Invalid retry delay {0} in response body")]
    InvalidBodyDelay(f64),
}

/// Parse the "Retry-After" header as specified per
/// [RFC 7231 section 7.1.3](https://www.rfc-editor.org/rfc/rfc7231#section-7.1.3)
///
/// Fractional seconds are accepted as well, some rate limiters send them.
pub(crate) fn parse_retry_after(value: &HeaderValue) -> Result<Duration, RateLimitHeaderError> {
    let value = value
        .to_str()
        .map_err(|_| RateLimitHeaderError::HeaderValueError("retry-after"))?;

    // RFC 7231: Retry-After = HTTP-date / delay-seconds
    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    if let Some(seconds) = parse_seconds(value) {
        return Ok(seconds);
    }
    httpdate::parse_http_date(value)
        .map(|s| {
            s.duration_since(SystemTime::now())
                // if date is in the past, we can use ZERO
                .unwrap_or(Duration::ZERO)
        })
        .map_err(|_| RateLimitHeaderError::ValueError {
            name: "retry-after",
            value: value.into(),
        })
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    /// Milliseconds until the request may be retried
    retry_after: f64,
}

/// Parse the `retry_after` field (milliseconds) of a rate limited response body
pub(crate) fn parse_retry_after_body(body: &[u8]) -> Result<Duration, RateLimitHeaderError> {
    let RateLimitBody { retry_after } = serde_json::from_slice(body)?;
    Duration::try_from_secs_f64(retry_after / 1000.0)
        .map_err(|_| RateLimitHeaderError::InvalidBodyDelay(retry_after))
}

/// Parse the common "X-RateLimit" header fields.
/// Unfortunately, this is not standardised yet, but there is an
/// [IETF draft](https://datatracker.ietf.org/doc/draft-ietf-httpapi-ratelimit-headers/).
///
/// Missing headers yield `None`, malformed ones an error.
pub(crate) fn parse_common_rate_limit_header_fields(
    headers: &HeaderMap,
) -> Result<(Option<u64>, Option<u64>), RateLimitHeaderError> {
    let remaining = parse_header_value(headers, X_RATELIMIT_REMAINING)?;
    let limit = parse_header_value(headers, X_RATELIMIT_LIMIT)?;
    Ok((remaining, limit))
}

/// Time left in the current window, according to the server.
///
/// `X-RateLimit-Reset` holds the end of the window in epoch seconds of the
/// server's clock. Measuring it against the `Date` header of the same
/// response instead of the local clock makes the result immune to clock skew
/// between client and server. Returns `None` unless both headers are set.
pub(crate) fn parse_reset_after(
    headers: &HeaderMap,
) -> Result<Option<Duration>, RateLimitHeaderError> {
    let (Some(date), Some(reset)) = (
        headers.get(http::header::DATE),
        headers.get(X_RATELIMIT_RESET),
    ) else {
        return Ok(None);
    };

    let date = date
        .to_str()
        .map_err(|_| RateLimitHeaderError::HeaderValueError("date"))?;
    let date = httpdate::parse_http_date(date).map_err(|_| RateLimitHeaderError::ValueError {
        name: "date",
        value: date.into(),
    })?;

    let reset = reset
        .to_str()
        .map_err(|_| RateLimitHeaderError::HeaderValueError(X_RATELIMIT_RESET))?;
    let reset_epoch = parse_seconds(reset).ok_or_else(|| RateLimitHeaderError::ValueError {
        name: X_RATELIMIT_RESET,
        value: reset.into(),
    })?;
    let reset = SystemTime::UNIX_EPOCH + reset_epoch;

    Ok(Some(reset.duration_since(date).unwrap_or(Duration::ZERO)))
}

/// Helper method to parse a numeric header value
fn parse_header_value(
    headers: &HeaderMap,
    name: &'static str,
) -> Result<Option<u64>, RateLimitHeaderError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| RateLimitHeaderError::HeaderValueError(name))?;
    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| RateLimitHeaderError::ValueError {
            name,
            value: value.into(),
        })
}

/// Parse non-negative, possibly fractional seconds
fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
}
