use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::{ErrorKind, Result};

const QUEUED: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared between a queued request and its [`ResultHandle`].
///
/// Records whether the drainer has started the exchange or the caller gave
/// up on it first. Only `QUEUED -> STARTED` and `QUEUED -> CANCELLED` are
/// possible, so whichever side wins the race decides.
#[derive(Debug, Default)]
pub(crate) struct Ticket {
    state: AtomicU8,
}

impl Ticket {
    /// Claim the request for sending.
    ///
    /// Returns `false` if the caller cancelled it. A request that already
    /// started (and is retried after a rate limit) can be claimed again.
    pub(crate) fn try_start(&self) -> bool {
        match self
            .state
            .compare_exchange(QUEUED, STARTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == STARTED,
        }
    }

    fn cancel(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}

/// Handle to the outcome of a submitted message.
///
/// Resolves exactly once, either to `Ok(())` after the webhook accepted the
/// message or to the [`ErrorKind`] that made the delivery fail. Rate limits
/// are handled internally and never show up here.
///
/// Dropping the handle does not cancel the delivery; use
/// [`ResultHandle::cancel`] for that.
#[derive(Debug)]
#[must_use = "dropping the handle discards the delivery outcome"]
pub struct ResultHandle {
    receiver: oneshot::Receiver<Result<()>>,
    ticket: Arc<Ticket>,
}

impl ResultHandle {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<()>>, ticket: Arc<Ticket>) -> Self {
        Self { receiver, ticket }
    }

    /// Cancel the delivery if it has not been sent yet.
    ///
    /// Returns `true` if the message will not be sent. Once the exchange has
    /// started, cancellation has no effect and `false` is returned; the
    /// handle then resolves with the real outcome.
    pub fn cancel(&self) -> bool {
        self.ticket.cancel()
    }

    /// Returns `true` if [`ResultHandle::cancel`] succeeded
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.ticket.is_cancelled()
    }
}

impl Future for ResultHandle {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.receiver).poll(cx);
        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) if self.ticket.is_cancelled() => {
                Poll::Ready(Err(ErrorKind::Cancelled))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(ErrorKind::Dropped)),
        }
    }
}
