//! Handler of webhook deliveries.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` accepts messages and hands out a [`ResultHandle`] for each.
//! `ClientBuilder` exposes a finer level of granularity for building
//! a `Client`.
#![allow(clippy::module_name_repetitions)]
use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use typed_builder::TypedBuilder;
use url::Url;

use crate::drainer::{AtomicDrainerState, Drainer, DrainerState};
use crate::queue::{DeliveryQueue, PendingRequest};
use crate::ratelimit::{Bucket, SharedBucket};
use crate::transport::{ReqwestTransport, Transport};
use crate::{ErrorKind, RequestBody, Result, ResultHandle, WebhookTarget};

/// Default number of redirects before a request is deemed as failed, 5.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Default user agent, `hookline/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("hookline/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.
Only `url` is required.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// URL of the webhook every message is posted to.
    url: Url,
    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Sets the default [headers] for every request, e.g. for an
    /// authenticating proxy in front of the webhook.
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    #[builder(default)]
    custom_headers: HeaderMap,
    /// Response timeout per request.
    #[builder(default)]
    timeout: Option<Duration>,
    /// Maximum number of redirects per request before returning an error.
    #[builder(default = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,
    /// When `true`, accept invalid SSL certificates.
    ///
    /// ## Warning
    ///
    /// You should think very carefully before using this method. If
    /// invalid certificates are trusted, any certificate for any site
    /// will be trusted for use. This includes expired certificates.
    #[builder(default)]
    allow_insecure: bool,
    /// Performs the HTTP exchanges instead of the default `reqwest` based
    /// transport. All other request options are ignored when this is set.
    #[builder(default, setter(strip_option))]
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// The client delivers messages on the tokio runtime it was built on,
    /// no matter which thread they are submitted from.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - This is not called from within a tokio runtime.
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let runtime = Handle::try_current().map_err(|_| ErrorKind::MissingRuntime)?;

        let Self {
            url,
            user_agent,
            custom_headers: mut headers,
            timeout,
            max_redirects,
            allow_insecure,
            transport,
        } = self;

        let transport = match transport {
            Some(transport) => transport,
            None => {
                headers.insert(
                    header::USER_AGENT,
                    HeaderValue::from_str(&user_agent).map_err(ErrorKind::InvalidHeader)?,
                );

                let builder = reqwest::ClientBuilder::new()
                    .gzip(true)
                    .default_headers(headers)
                    .danger_accept_invalid_certs(allow_insecure)
                    .redirect(reqwest::redirect::Policy::limited(max_redirects));

                let reqwest_client = (match timeout {
                    Some(t) => builder.timeout(t),
                    None => builder,
                })
                .build()
                .map_err(ErrorKind::BuildRequestClient)?;

                Arc::new(ReqwestTransport::new(reqwest_client, url.clone()))
            }
        };

        let dispatcher = Dispatcher {
            queue: DeliveryQueue::default(),
            bucket: SharedBucket::new(),
            transport,
            state: AtomicDrainerState::default(),
            wake: Notify::new(),
            runtime,
        };

        Ok(Client {
            dispatcher: Arc::new(dispatcher),
            url,
        })
    }
}

/// State shared by all clones of a [`Client`] and its drainer
#[derive(Debug)]
pub(crate) struct Dispatcher {
    queue: DeliveryQueue,
    bucket: SharedBucket,
    transport: Arc<dyn Transport>,
    state: AtomicDrainerState,
    /// Wakes a drainer paused for backoff
    wake: Notify,
    runtime: Handle,
}

impl Dispatcher {
    pub(crate) const fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub(crate) const fn bucket(&self) -> &SharedBucket {
        &self.bucket
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) const fn state(&self) -> &AtomicDrainerState {
        &self.state
    }

    pub(crate) const fn wake(&self) -> &Notify {
        &self.wake
    }

    fn submit(self: &Arc<Self>, body: RequestBody) -> Result<ResultHandle> {
        let (entry, handle) = PendingRequest::new(body);
        self.queue.enqueue(entry)?;
        self.arm();
        Ok(handle)
    }

    /// Spawn a drainer unless one is running already
    fn arm(self: &Arc<Self>) {
        if self.state.try_arm() {
            log::trace!("Spawning drainer");
            self.runtime.spawn(Drainer::new(Arc::clone(self)).run());
        }
    }

    /// Called by the drainer when it found the queue empty.
    ///
    /// Returns `true` if the drainer should exit. A message enqueued after
    /// the drainer looked but before it went idle would otherwise sit in the
    /// queue until the next submission.
    pub(crate) fn disarm(&self) -> bool {
        self.state.store(DrainerState::Idle);
        if self.queue.is_empty() {
            return true;
        }
        // Either we keep draining, or the producer that enqueued spawned a
        // new drainer already
        !self.state.try_arm()
    }

    fn close(&self) {
        let queued = self.queue.close();
        if !queued.is_empty() {
            log::debug!(
                "Client closed with {} undelivered message(s)",
                queued.len()
            );
        }
        for entry in queued {
            entry.shut_down();
        }
        self.wake.notify_one();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !self.queue.is_closed() {
            log::warn!("Client was dropped without being closed");
        }
    }
}

/// Delivers messages to a webhook, in order and within its rate limit.
///
/// Cloning a client is cheap, all clones share the same queue.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    url: Url,
}

impl Client {
    /// Queue `body` for delivery.
    ///
    /// Returns immediately. Messages are sent one at a time, in the order
    /// they were submitted. Await the returned handle for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Rejected`] if the client was closed.
    pub fn submit(&self, body: RequestBody) -> Result<ResultHandle> {
        self.dispatcher.submit(body)
    }

    /// Queue a plain text message, see [`RequestBody::content`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the text is not a valid message or the client
    /// was closed.
    pub fn send(&self, text: &str) -> Result<ResultHandle> {
        self.submit(RequestBody::content(text)?)
    }

    /// Stop accepting messages.
    ///
    /// Messages still waiting in the queue resolve with
    /// [`ErrorKind::Shutdown`]. A message whose request is in flight
    /// completes normally, unless it gets rate limited.
    pub fn close(&self) {
        self.dispatcher.close();
    }

    /// Returns `true` once [`Client::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.dispatcher.queue.is_closed()
    }

    /// The webhook URL
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The webhook id, if the URL has the usual `/webhooks/<id>/<token>` shape
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        WebhookTarget::from_url(&self.url)
            .ok()
            .map(|target| target.id())
    }

    /// Number of messages waiting for delivery, including the one in flight
    #[must_use]
    pub fn queued(&self) -> usize {
        self.dispatcher.queue.len()
    }

    /// What the drainer is doing right now
    #[must_use]
    pub fn state(&self) -> DrainerState {
        self.dispatcher.state.load()
    }

    /// Copy of the current rate limit state
    #[must_use]
    pub fn bucket(&self) -> Bucket {
        self.dispatcher.bucket.snapshot()
    }
}
