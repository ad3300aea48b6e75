use std::time::Duration;

use http::header;
use tokio::time::Instant;

use super::headers::{self, RateLimitHeaderError};
use crate::ExchangeResponse;

/// Value of `remaining` and `limit` before the server reported any.
pub const UNBOUNDED: u64 = u64::MAX;

/// Delay applied when a `429` response does not say how long to wait.
///
/// Without it the drainer would immediately resend the rejected request.
pub const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Rate limit state of the webhook endpoint.
///
/// The bucket knows how many requests are left in the current window, how
/// many the window allows and when it ends. It never counts requests itself:
/// every value is read from the latest response, so applying the same
/// response twice leaves the same state.
///
/// An elapsed window is refreshed lazily, on the next call to
/// [`Bucket::is_rate_limited`], not by a timer.
#[derive(Debug, Clone)]
pub struct Bucket {
    reset_time: Instant,
    remaining: u64,
    limit: u64,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            reset_time: Instant::now(),
            remaining: UNBOUNDED,
            limit: UNBOUNDED,
        }
    }
}

/// Values read from a successful response, applied together
#[derive(Debug, Default)]
struct Observed {
    remaining: Option<u64>,
    limit: Option<u64>,
    reset_after: Option<Duration>,
}

impl Bucket {
    /// Create a bucket which allows requests right away
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time until the current window ends, zero if it already has.
    ///
    /// While rate limited, this is how long the next request has to wait.
    #[must_use]
    pub fn retry_after(&self) -> Duration {
        self.reset_time.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the window has ended
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        self.retry_after().is_zero()
    }

    /// Start a fresh window if the current one has ended
    pub fn refresh_if_elapsed(&mut self) {
        if self.is_elapsed() {
            self.remaining = self.limit;
        }
    }

    /// Returns `true` if no request may be sent before [`Bucket::retry_after`]
    /// has passed.
    pub fn is_rate_limited(&mut self) -> bool {
        self.refresh_if_elapsed();
        self.remaining == 0
    }

    /// Requests left in the current window, as last reported
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Requests allowed per window, as last reported
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// The instant the current window ends
    #[must_use]
    pub const fn reset_time(&self) -> Instant {
        self.reset_time
    }

    /// Update the bucket from a response.
    ///
    /// This is best-effort: malformed rate limit data is logged and ignored,
    /// leaving the bucket as it was.
    pub fn update(&mut self, response: &ExchangeResponse) {
        if response.is_rate_limited() {
            self.update_rate_limited(response);
        } else if !response.is_success() {
            log::debug!(
                "Failed to update bucket due to unsuccessful response with code: {} and body: {}",
                response.status(),
                response.text()
            );
        } else if let Err(e) = self.update_success(response) {
            log::error!("Could not read rate limit headers: {e}");
        }
    }

    fn update_rate_limited(&mut self, response: &ExchangeResponse) {
        let now = Instant::now();
        let delay = match response.headers().get(header::RETRY_AFTER) {
            Some(value) => headers::parse_retry_after(value),
            None => headers::parse_retry_after_body(response.body()),
        };
        let delay = delay.unwrap_or_else(|e| {
            log::error!(
                "Could not read retry delay of rate limited response, retrying in {}ms: {e}",
                FALLBACK_RETRY_AFTER.as_millis()
            );
            FALLBACK_RETRY_AFTER
        });
        self.reset_time = now + delay;
    }

    fn update_success(&mut self, response: &ExchangeResponse) -> Result<(), RateLimitHeaderError> {
        let now = Instant::now();
        let observed = Self::observe(response)?;

        if let Some(remaining) = observed.remaining {
            self.remaining = remaining;
        }
        if let Some(limit) = observed.limit {
            self.limit = limit;
        }
        if let Some(reset_after) = observed.reset_after {
            self.reset_time = now + reset_after;
        }
        Ok(())
    }

    fn observe(response: &ExchangeResponse) -> Result<Observed, RateLimitHeaderError> {
        let (remaining, limit) = headers::parse_common_rate_limit_header_fields(response.headers())?;
        let reset_after = headers::parse_reset_after(response.headers())?;
        Ok(Observed {
            remaining,
            limit,
            reset_after,
        })
    }
}
