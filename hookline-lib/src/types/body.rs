use bytes::Bytes;
use http::HeaderValue;
use serde::Serialize;
use serde_json::json;

use crate::{ErrorKind, Result};

/// Maximum number of characters in a plain text message, 2000.
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Content type used for JSON payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// The opaque payload of a single webhook request.
///
/// The data is reference counted, so cloning a body for a retry after a rate
/// limit does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    content_type: HeaderValue,
    data: Bytes,
}

impl RequestBody {
    /// Create a body from raw bytes with the given content type
    #[must_use]
    pub fn new(content_type: HeaderValue, data: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            data: data.into(),
        }
    }

    /// Serialize `value` as a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value)?;
        Ok(Self::new(HeaderValue::from_static(JSON_CONTENT_TYPE), data))
    }

    /// Build a plain text message body, `{"content": "..."}`.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed content is empty or longer than
    /// [`MAX_CONTENT_LENGTH`] characters.
    pub fn content(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ErrorKind::EmptyContent);
        }
        let length = text.chars().count();
        if length > MAX_CONTENT_LENGTH {
            return Err(ErrorKind::ContentTooLong { length });
        }
        Self::json(&json!({ "content": text }))
    }

    /// The `Content-Type` sent with this body
    #[must_use]
    pub const fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    /// The raw payload
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}
