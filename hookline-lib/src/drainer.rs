//! The task delivering queued messages, one at a time.
//!
//! At most one drainer runs per client. It is spawned by
//! [`Dispatcher::arm`](crate::client::Dispatcher) when a message arrives at an
//! idle client and exits once it finds the queue empty. While the bucket is
//! exhausted or the webhook answered `429`, it sleeps instead of sending.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::client::Dispatcher;
use crate::queue::Head;
use crate::{ErrorKind, Result};

/// What the drainer of a client is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DrainerState {
    /// No drainer is running, the queue is empty
    Idle = 0,
    /// A drainer is sending messages
    Draining = 1,
    /// A drainer is waiting for the rate limit window to end
    PausedForBackoff = 2,
}

impl DrainerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Draining,
            2 => Self::PausedForBackoff,
            _ => Self::Idle,
        }
    }
}

/// [`DrainerState`] shared between the dispatcher and its drainer.
///
/// Producers only ever try `Idle -> Draining`. Every other transition is
/// made by the running drainer.
#[derive(Debug)]
pub(crate) struct AtomicDrainerState(AtomicU8);

impl Default for AtomicDrainerState {
    fn default() -> Self {
        Self(AtomicU8::new(DrainerState::Idle as u8))
    }
}

impl AtomicDrainerState {
    pub(crate) fn load(&self) -> DrainerState {
        DrainerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: DrainerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Try `Idle -> Draining`, returns `true` if this call made it
    pub(crate) fn try_arm(&self) -> bool {
        self.0
            .compare_exchange(
                DrainerState::Idle as u8,
                DrainerState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Outcome of a single drainer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Go on with the next message right away
    Next,
    /// Wait until the bucket allows the next request
    Backoff,
    /// Nothing left to send
    Empty,
}

pub(crate) struct Drainer {
    dispatcher: Arc<Dispatcher>,
}

impl Drainer {
    pub(crate) const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Deliver messages until the queue is empty
    pub(crate) async fn run(self) {
        let rate_limited = self.dispatcher.bucket().lock().is_rate_limited();
        if rate_limited {
            self.backoff().await;
        }

        loop {
            match self.step().await {
                Step::Next => {}
                Step::Backoff => self.backoff().await,
                Step::Empty => {
                    if self.dispatcher.disarm() {
                        break;
                    }
                }
            }
        }
        log::trace!("Drainer went idle");
    }

    async fn step(&self) -> Step {
        let queue = self.dispatcher.queue();

        if queue.is_closed()
            && let Some(head) = queue.remove_head()
        {
            head.shut_down();
            return Step::Next;
        }

        let Some(Head { body, ticket }) = queue.peek_head() else {
            return Step::Empty;
        };

        if !ticket.try_start() {
            log::debug!("Skipping cancelled message");
            // dropping the entry resolves its handle with `Cancelled`
            drop(queue.remove_head());
            return Step::Next;
        }

        let response = match self.dispatcher.transport().execute(body).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Exchange failed: {e}");
                self.resolve_head(Err(e));
                return Step::Next;
            }
        };

        self.dispatcher.bucket().lock().update(&response);

        if response.is_rate_limited() {
            if queue.is_closed() {
                self.resolve_head(Err(ErrorKind::Shutdown));
                return Step::Next;
            }
            log::debug!("Rate limited by webhook, message will be retried");
            return Step::Backoff;
        }

        if !response.is_success() {
            let error = ErrorKind::RejectedStatusCode {
                status: response.status(),
                body: response.text(),
            };
            log::debug!("Message rejected: {error}");
            self.resolve_head(Err(error));
            return Step::Next;
        }

        self.resolve_head(Ok(()));

        let rate_limited = self.dispatcher.bucket().lock().is_rate_limited();
        if rate_limited {
            Step::Backoff
        } else {
            Step::Next
        }
    }

    fn resolve_head(&self, result: Result<()>) {
        if let Some(head) = self.dispatcher.queue().remove_head() {
            head.resolve(result);
        }
    }

    /// Sleep until the current rate limit window ends.
    ///
    /// The delay is read from the bucket again after every wake-up. Closing
    /// the client cuts the pause short.
    async fn backoff(&self) {
        let state = self.dispatcher.state();
        state.store(DrainerState::PausedForBackoff);

        loop {
            if self.dispatcher.queue().is_closed() {
                break;
            }
            let wait = self.dispatcher.bucket().lock().retry_after();
            if wait.is_zero() {
                break;
            }
            log::debug!("Pausing deliveries for {}ms", wait.as_millis());
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.dispatcher.wake().notified() => {}
            }
        }

        state.store(DrainerState::Draining);
    }
}
