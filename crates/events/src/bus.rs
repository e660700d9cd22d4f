//! Notification publishing/subscription (mechanics only).
//!
//! Ledger notifications (`FundCreated`, `AmountDonated`, `AmountWithdrawn`, ...)
//! are log-like: delivered best-effort to whoever is subscribed, never retried,
//! never allowed to fail the operation that produced them. The journal, not
//! the bus, is the record of what happened.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to the notification stream.
///
/// Each subscription gets its own copy of every message published after it was
/// created (broadcast semantics). Messages arrive in publication order.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(envelope) = subscription.recv() {
///     observe(envelope);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything already delivered, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Pub/sub abstraction for ledger notifications.
///
/// ```text
/// Command → journal append → EventBus::publish → observers
/// ```
///
/// `publish()` may fail (poisoned lock, broken transport); the service logs the
/// failure and carries on.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
