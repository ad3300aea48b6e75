use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{ErrorKind, Result};

/// Base URL under which webhooks are executed.
pub const WEBHOOK_BASE_URL: &str = "https://discord.com/api/webhooks/";

/// Identifies a webhook by its numeric id and secret token.
///
/// The token grants write access to the webhook, so it is kept in a
/// [`SecretString`] and never printed by the [`Debug`](fmt::Debug) or
/// [`Display`](fmt::Display) implementations.
#[derive(Clone)]
pub struct WebhookTarget {
    id: u64,
    token: SecretString,
}

impl WebhookTarget {
    /// Create a target from an id and token
    #[must_use]
    pub fn new(id: u64, token: impl Into<SecretString>) -> Self {
        Self {
            id,
            token: token.into(),
        }
    }

    /// Extract id and token from a webhook URL ending in
    /// `/webhooks/<id>/<token>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not have this shape or the id is
    /// not numeric.
    pub fn from_url(url: &Url) -> Result<Self> {
        let invalid = || ErrorKind::InvalidWebhookUrl(redacted(url));
        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [.., "webhooks", id, token] => {
                let id = id.parse::<u64>().map_err(|_| invalid())?;
                Ok(Self::new(id, *token))
            }
            _ => Err(invalid()),
        }
    }

    /// The webhook id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The URL requests for this webhook are posted to.
    ///
    /// The token is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns an error if [`WEBHOOK_BASE_URL`] cannot hold a path.
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(WEBHOOK_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidWebhookUrl(WEBHOOK_BASE_URL.to_string()))?
            .pop_if_empty()
            .push(&self.id.to_string())
            .push(self.token.expose_secret());
        Ok(url)
    }
}

impl fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "webhook {}", self.id)
    }
}

/// Render a URL for error messages without the path, which may hold a token
fn redacted(url: &Url) -> String {
    format!("{}://{}/…", url.scheme(), url.host_str().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_from_parts() {
        let target = WebhookTarget::new(1234, "abc-DEF_123");
        assert_eq!(
            target.url().unwrap().as_str(),
            "https://discord.com/api/webhooks/1234/abc-DEF_123"
        );
    }

    #[test]
    fn test_url_encodes_token() {
        let target = WebhookTarget::new(1234, "a/b?c#d");
        let url = target.url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://discord.com/api/webhooks/1234/a%2Fb%3Fc%23d"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(WebhookTarget::from_url(&url).unwrap().id(), 1234);
    }

    #[test]
    fn test_parse_url() {
        let url = Url::parse("https://discord.com/api/v10/webhooks/987654321/s3cr3t/").unwrap();
        let target = WebhookTarget::from_url(&url).unwrap();

        assert_eq!(target.id(), 987_654_321);
        assert_eq!(target.token.expose_secret(), "s3cr3t");
    }

    #[test]
    fn test_parse_invalid_url_does_not_leak_token() {
        let url = Url::parse("https://example.com/hooks/not-a-number/s3cr3t").unwrap();
        let error = WebhookTarget::from_url(&url).unwrap_err();

        assert!(matches!(error, ErrorKind::InvalidWebhookUrl(_)));
        assert!(!error.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let target = WebhookTarget::new(1, "s3cr3t");
        assert!(!format!("{target:?}").contains("s3cr3t"));
    }
}
