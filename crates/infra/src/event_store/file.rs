//! File-backed journal: one JSON object per line.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, instrument};

use charityfund_core::ExpectedVersion;

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, validate_sequence,
};

/// Durable append-only journal stored as JSON lines.
///
/// Each append writes the whole batch with a single `write_all` followed by
/// `sync_data`, so a committed batch survives a restart. If either call fails
/// the file is truncated back to its length before the batch, leaving the
/// position free for a retry. If even the truncation fails the journal is
/// marked torn and refuses appends until it is repaired and reopened.
/// Reopening the file validates every line and resumes at the last sequence
/// number.
#[derive(Debug)]
pub struct JsonFileEventStore {
    path: PathBuf,
    state: Mutex<JournalFile>,
}

#[derive(Debug)]
struct JournalFile {
    file: File,
    version: u64,
    torn: bool,
}

impl JsonFileEventStore {
    /// Open (or create) the journal at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EventStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let existing = read_journal(&path)?;
        let version = existing.last().map(|e| e.sequence_number).unwrap_or(0);
        debug!(path = %path.display(), version, "opened journal");

        Ok(Self {
            path,
            state: Mutex::new(JournalFile {
                file,
                version,
                torn: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStore for JsonFileEventStore {
    #[instrument(skip(self, events), fields(path = %self.path.display(), count = events.len()), err)]
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        if state.torn {
            return Err(EventStoreError::InvalidAppend(format!(
                "journal {} holds a partial batch and must be repaired",
                self.path.display()
            )));
        }

        let current = state.version;
        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, seq)| e.into_stored(seq))
            .collect();

        let mut buf = Vec::new();
        for stored in &committed {
            serde_json::to_writer(&mut buf, stored).map_err(|e| {
                EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
            })?;
            buf.push(b'\n');
        }

        match commit_batch(&mut state.file, &buf) {
            Ok(()) => {}
            Err(CommitFailure::RolledBack(e)) => return Err(e.into()),
            Err(CommitFailure::Torn { write, truncate }) => {
                error!(error = %write, truncate_error = %truncate, "journal left with a partial batch");
                state.torn = true;
                return Err(write.into());
            }
        }
        state.version = current + committed.len() as u64;

        Ok(committed)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        // Hold the lock so a concurrent append is never read half-written.
        let _state = self
            .state
            .lock()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        read_journal(&self.path)
    }
}

/// File operations an append needs; `File` in production.
trait JournalWrite: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl JournalWrite for File {
    fn len(&self) -> io::Result<u64> {
        self.metadata().map(|m| m.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

#[derive(Debug)]
enum CommitFailure {
    /// Nothing of the batch remains in the file.
    RolledBack(io::Error),
    /// Part of the batch may remain in the file.
    Torn { write: io::Error, truncate: io::Error },
}

/// Write and sync `buf`, or cut the file back to where it was.
fn commit_batch<W: JournalWrite>(out: &mut W, buf: &[u8]) -> Result<(), CommitFailure> {
    let len_before = out.len().map_err(CommitFailure::RolledBack)?;

    let written = out.write_all(buf).and_then(|()| out.sync());
    let Err(write) = written else {
        return Ok(());
    };

    match out.truncate(len_before) {
        Ok(()) => Err(CommitFailure::RolledBack(write)),
        Err(truncate) => Err(CommitFailure::Torn { write, truncate }),
    }
}

fn read_journal(path: &Path) -> Result<Vec<StoredEvent>, EventStoreError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let stored: StoredEvent = serde_json::from_str(&line)
            .map_err(|e| EventStoreError::Corrupted(format!("line {}: {e}", idx + 1)))?;
        events.push(stored);
    }

    validate_sequence(&events)?;
    Ok(events)
}
