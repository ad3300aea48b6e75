#![allow(unreachable_pub)]

mod body;
mod error;
mod handle;
mod webhook;

pub use body::{JSON_CONTENT_TYPE, MAX_CONTENT_LENGTH, RequestBody};
pub use error::ErrorKind;
pub(crate) use handle::Ticket;
pub use handle::ResultHandle;
pub use webhook::{WEBHOOK_BASE_URL, WebhookTarget};

/// The hookline `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
