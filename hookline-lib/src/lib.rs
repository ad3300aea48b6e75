//! `hookline` delivers messages to a webhook without tripping its rate limit.
//!
//! Messages are queued and sent one at a time, in submission order. The
//! limits are learned from the response headers; while they are exhausted, or
//! after the webhook answered `429 Too Many Requests`, delivery pauses and
//! resumes on its own. Every submission gets a [`ResultHandle`] which
//! resolves once the message was delivered or failed for good.
//!
//! ```no_run
//! use hookline_lib::{ClientBuilder, Result, WebhookTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let url = WebhookTarget::new(1234, "token").url()?;
//!     let client = ClientBuilder::builder().url(url).build().client()?;
//!
//!     let first = client.send("Hello")?;
//!     let second = client.send("World")?;
//!     first.await?;
//!     second.await?;
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

mod client;
mod drainer;
mod queue;
mod transport;
mod types;

pub mod ratelimit;

#[cfg(test)]
mod test_utils;

pub use crate::{
    client::{Client, ClientBuilder, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT},
    drainer::DrainerState,
    transport::{ExchangeResponse, ReqwestTransport, Transport},
    types::*,
};
