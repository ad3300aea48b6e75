use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::types::Ticket;
use crate::{ErrorKind, RequestBody, Result, ResultHandle};

/// A message waiting for delivery.
///
/// The entry owns the only sender of its [`ResultHandle`].
/// [`PendingRequest::resolve`] consumes the entry, so a handle can never
/// receive two outcomes.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    body: RequestBody,
    ticket: Arc<Ticket>,
    sender: oneshot::Sender<Result<()>>,
}

/// What the drainer needs to send the head of the queue without removing it
#[derive(Debug, Clone)]
pub(crate) struct Head {
    pub(crate) body: RequestBody,
    pub(crate) ticket: Arc<Ticket>,
}

impl PendingRequest {
    /// Create an entry and the handle resolved by it
    pub(crate) fn new(body: RequestBody) -> (Self, ResultHandle) {
        let (sender, receiver) = oneshot::channel();
        let ticket = Arc::new(Ticket::default());
        let handle = ResultHandle::new(receiver, ticket.clone());
        (
            Self {
                body,
                ticket,
                sender,
            },
            handle,
        )
    }

    /// Hand the outcome to the waiting caller.
    ///
    /// The caller may have dropped its handle already, that's fine.
    pub(crate) fn resolve(self, result: Result<()>) {
        if let Err(result) = self.sender.send(result) {
            log::trace!("Result handle was dropped before resolution: {result:?}");
        }
    }

    /// Fail the entry because the client was closed.
    ///
    /// A cancelled entry is dropped instead, so its handle reports
    /// `Cancelled`. Claiming the ticket first makes a concurrent `cancel()`
    /// return `false`.
    pub(crate) fn shut_down(self) {
        if self.ticket.try_start() {
            self.resolve(Err(ErrorKind::Shutdown));
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    entries: VecDeque<PendingRequest>,
    closed: bool,
}

/// Thread-safe FIFO of pending deliveries.
///
/// Only the drainer looks at or removes the head. Producers append from any
/// thread until the queue is closed.
#[derive(Debug, Default)]
pub(crate) struct DeliveryQueue {
    inner: Mutex<Entries>,
}

impl DeliveryQueue {
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Rejected`] once the queue is closed. The entry
    /// is dropped in that case; its handle was never given out.
    pub(crate) fn enqueue(&self, entry: PendingRequest) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ErrorKind::Rejected);
        }
        inner.entries.push_back(entry);
        Ok(())
    }

    pub(crate) fn peek_head(&self) -> Option<Head> {
        self.lock().entries.front().map(|entry| Head {
            body: entry.body.clone(),
            ticket: entry.ticket.clone(),
        })
    }

    pub(crate) fn remove_head(&self) -> Option<PendingRequest> {
        self.lock().entries.pop_front()
    }

    /// Close the queue for new entries.
    ///
    /// Returns every entry but the head, which stays with the drainer.
    /// Closing twice returns nothing the second time.
    pub(crate) fn close(&self) -> Vec<PendingRequest> {
        let mut inner = self.lock();
        inner.closed = true;
        if inner.entries.len() <= 1 {
            return Vec::new();
        }
        inner.entries.drain(1..).collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }
}
