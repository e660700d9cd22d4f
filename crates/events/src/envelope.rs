use serde::{Deserialize, Serialize};
use uuid::Uuid;

use charityfund_core::FundId;

/// Envelope for a committed event, as handed to notification observers.
///
/// `sequence_number` is the event's position in the ledger journal, so
/// observers can detect gaps and drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    fund_id: FundId,

    /// Monotonically increasing position in the journal.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(event_id: Uuid, fund_id: FundId, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id,
            fund_id,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn fund_id(&self) -> FundId {
        self.fund_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
