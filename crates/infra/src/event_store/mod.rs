//! Append-only ledger journal.
//!
//! The journal is the ledger's persistence: every accepted command appends its
//! events here, and reopening the service replays them.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::JsonFileEventStore;
pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

use charityfund_core::ExpectedVersion;

/// Journal backend selected by configuration.
#[derive(Debug)]
pub enum JournalStore {
    InMemory(InMemoryEventStore),
    File(JsonFileEventStore),
}

impl EventStore for JournalStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        match self {
            JournalStore::InMemory(store) => store.append(events, expected_version),
            JournalStore::File(store) => store.append(events, expected_version),
        }
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        match self {
            JournalStore::InMemory(store) => store.load_all(),
            JournalStore::File(store) => store.load_all(),
        }
    }
}
