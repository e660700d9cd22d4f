//! In-process notification bus for committed ledger events.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};
use crate::envelope::EventEnvelope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,

    /// The envelope is not past the last delivered journal position.
    OutOfOrder { sequence_number: u64, last_delivered: u64 },
}

/// In-memory fan-out bus for `EventEnvelope`s.
///
/// Subscribers see journal positions strictly increasing: an envelope at or
/// below the last delivered position is refused, so a re-published entry is
/// never seen twice. Gaps are allowed (a subscriber may join late, and the
/// service may publish a batch that was journaled after a failed attempt).
///
/// Dropped subscribers are pruned on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    state: Mutex<BusState<M>>,
}

#[derive(Debug)]
struct BusState<M> {
    subscribers: Vec<mpsc::Sender<M>>,
    last_delivered: u64,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map(|s| s.subscribers.len()).unwrap_or(0)
    }

    /// Journal position of the last delivered envelope (0 before any).
    pub fn last_delivered(&self) -> u64 {
        self.state.lock().map(|s| s.last_delivered).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            state: Mutex::new(BusState {
                subscribers: Vec::new(),
                last_delivered: 0,
            }),
        }
    }
}

impl<E> EventBus<EventEnvelope<E>> for InMemoryEventBus<EventEnvelope<E>>
where
    E: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, envelope: EventEnvelope<E>) -> Result<(), Self::Error> {
        let mut state = self.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        let sequence_number = envelope.sequence_number();
        if sequence_number <= state.last_delivered {
            return Err(InMemoryBusError::OutOfOrder {
                sequence_number,
                last_delivered: state.last_delivered,
            });
        }

        state.subscribers.retain(|tx| tx.send(envelope.clone()).is_ok());
        state.last_delivered = sequence_number;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<E>> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut state) = self.state.lock() {
            state.subscribers.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charityfund_core::FundId;
    use uuid::Uuid;

    type Bus = InMemoryEventBus<EventEnvelope<&'static str>>;

    fn envelope(sequence_number: u64, payload: &'static str) -> EventEnvelope<&'static str> {
        EventEnvelope::new(Uuid::now_v7(), FundId::new(1).unwrap(), sequence_number, payload)
    }

    #[test]
    fn every_subscriber_receives_each_envelope() {
        let bus = Bus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(envelope(1, "created")).unwrap();
        bus.publish(envelope(2, "donated")).unwrap();

        assert_eq!(a.recv().unwrap().into_payload(), "created");
        assert_eq!(a.recv().unwrap().into_payload(), "donated");
        assert!(a.try_recv().is_err());

        let positions: Vec<u64> = b.drain().iter().map(EventEnvelope::sequence_number).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(bus.last_delivered(), 2);
    }

    #[test]
    fn replayed_position_is_refused() {
        let bus = Bus::new();
        let sub = bus.subscribe();
        bus.publish(envelope(3, "donated")).unwrap();

        let err = bus.publish(envelope(3, "donated")).unwrap_err();
        assert_eq!(
            err,
            InMemoryBusError::OutOfOrder {
                sequence_number: 3,
                last_delivered: 3,
            }
        );
        assert!(bus.publish(envelope(2, "created")).is_err());

        // Skipping ahead is fine.
        bus.publish(envelope(7, "closed")).unwrap();
        let positions: Vec<u64> = sub.drain().iter().map(EventEnvelope::sequence_number).collect();
        assert_eq!(positions, vec![3, 7]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = Bus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(envelope(1, "created")).unwrap();

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }
}
