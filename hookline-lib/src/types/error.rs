use http::StatusCode;
use std::error::Error;
use thiserror::Error;

/// Possible errors when interacting with `hookline_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The client was closed before the message was submitted
    #[error("Cannot send to a closed client")]
    Rejected,

    /// The client was closed while the message was still waiting in the queue
    #[error("Client was closed before the message could be delivered")]
    Shutdown,

    /// The caller cancelled the message before it was sent
    #[error("Delivery was cancelled")]
    Cancelled,

    /// The message was dropped without being resolved.
    /// This happens when the runtime driving the client shuts down.
    #[error("Delivery was abandoned before it completed")]
    Dropped,

    /// The webhook answered with a non-success status code
    #[error("Request returned failure {}: {body}", .status.as_u16())]
    RejectedStatusCode {
        /// Status code of the response
        status: StatusCode,
        /// Response body, decompressed and lossily decoded as UTF-8
        body: String,
    },

    /// Network error while sending the request
    #[error("Network error while sending the webhook request")]
    NetworkRequest(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// A custom [`Transport`](crate::Transport) failed to complete the exchange
    #[error("Transport failed to complete the exchange: {0}")]
    Transport(Box<dyn Error + Send + Sync>),

    /// The request client cannot be created
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// The given header could not be parsed
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The client was built outside of a tokio runtime
    #[error("A tokio runtime is required to build a client")]
    MissingRuntime,

    /// The URL does not point to a webhook
    #[error("Not a webhook URL: {0}")]
    InvalidWebhookUrl(String),

    /// The given string can not be parsed into a URL
    #[error("Cannot parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// A text message without any content
    #[error("Cannot send an empty message")]
    EmptyContent,

    /// A text message exceeding [`MAX_CONTENT_LENGTH`](crate::MAX_CONTENT_LENGTH)
    #[error("Content may not exceed {} characters, got {length}", crate::MAX_CONTENT_LENGTH)]
    ContentTooLong {
        /// Number of characters of the rejected content
        length: usize,
    },

    /// The message payload could not be serialized
    #[error("Cannot serialize message payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ErrorKind {
    /// Returns the status code of a rejected request, if any
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RejectedStatusCode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the exchange could not be completed at all
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkRequest(_) | Self::ReadResponseBody(_) | Self::Transport(_)
        )
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}
