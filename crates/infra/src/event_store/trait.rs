use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use charityfund_core::{ExpectedVersion, FundId};
use std::sync::Arc;

/// An event ready to be appended to the journal (no position yet).
///
/// Built from a typed domain event with `UncommittedEvent::from_typed`, which
/// serializes the payload and captures the metadata needed to decode it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub fund_id: FundId,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A journal entry with its assigned position.
///
/// Sequence numbers start at 1, have no gaps and are global across funds, so
/// replaying the journal in order reproduces fund creation order too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub fund_id: FundId,

    /// Position in the journal.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Decode the payload back into the typed domain event.
    pub fn decode<E>(&self) -> Result<E, EventStoreError>
    where
        E: DeserializeOwned,
    {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            EventStoreError::Corrupted(format!(
                "event {} ({}) at position {}: {e}",
                self.event_id, self.event_type, self.sequence_number
            ))
        })
    }
}

/// Journal operation error.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The journal holds something that cannot be read back.
    #[error("corrupted journal: {0}")]
    Corrupted(String),

    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only ledger journal.
///
/// `append()`:
/// - checks the journal position against `expected_version`
/// - assigns sequence numbers starting at `current + 1`
/// - persists the whole batch or none of it
///
/// `load_all()` returns every entry in sequence order; an empty journal is an
/// empty vector, not an error.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all()
    }
}

impl UncommittedEvent {
    /// Wrap a typed domain event for appending.
    pub fn from_typed<E>(event_id: Uuid, event: &E) -> Result<Self, EventStoreError>
    where
        E: charityfund_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            fund_id: event.fund_id(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    pub(crate) fn into_stored(self, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            fund_id: self.fund_id,
            sequence_number,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// Reject journals with gaps, duplicates or a zero position.
pub(crate) fn validate_sequence(events: &[StoredEvent]) -> Result<(), EventStoreError> {
    for (idx, e) in events.iter().enumerate() {
        let expected = idx as u64 + 1;
        if e.sequence_number != expected {
            return Err(EventStoreError::Corrupted(format!(
                "expected sequence_number {expected}, found {}",
                e.sequence_number
            )));
        }
    }
    Ok(())
}
