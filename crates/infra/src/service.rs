//! Command execution pipeline for the fund ledger.
//!
//! `FundService` is what a host (RPC layer, contract runtime, test harness)
//! calls into. Every state-changing call runs this pipeline while holding the
//! ledger lock, so operations never interleave:
//!
//! ```text
//! Command
//!   ↓
//! 0. Journal any events held back by an earlier failed append
//!   ↓
//! 1. Decide against the current FundBook (pure, no mutation)
//!   ↓
//! 2. Settle the outbound transfer, if the decision moves money out
//!   ↓
//! 3. Append the decided events to the journal (optimistic position check)
//!   ↓
//! 4. Apply the events to the in-memory FundBook
//!   ↓
//! 5. Publish notifications (best-effort)
//! ```
//!
//! A rejection at step 1, a refused transfer at step 2 or a failed append of a
//! command that moved no money leaves the book exactly as it was.
//!
//! A failed append after a settled transfer cannot be undone: the money is
//! gone. Those events are applied anyway and held in memory, so the same
//! payout can never be decided twice. Until the journal accepts them (step 0
//! of a later command, or `recover_journal`), every command fails with the
//! journal error. Reads keep working and reflect the settled transfer.

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use charityfund_core::{AccountId, Aggregate, Amount, Clock, ExpectedVersion, FundError, FundId};
use charityfund_events::{Command as _, EventBus, EventEnvelope};
use charityfund_funds::{
    CreateFund, Donate, Fund, FundBook, FundCommand, FundEvent, FundSnapshot, Refund, Withdraw,
};

use crate::config::{ConfigError, FundConfig};
use crate::event_store::{EventStore, EventStoreError, JournalStore, StoredEvent, UncommittedEvent};
use crate::payout::{PayoutError, Payouts};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The ledger rejected the operation.
    #[error(transparent)]
    Fund(#[from] FundError),

    /// The outbound transfer failed; nothing was recorded.
    #[error("payout failed: {0}")]
    Payout(#[from] PayoutError),

    #[error("journal error: {0}")]
    Store(#[from] EventStoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger state lock poisoned")]
    Poisoned,
}

impl ServiceError {
    /// The ledger rejection behind this error, if that is what it is.
    pub fn fund_error(&self) -> Option<&FundError> {
        match self {
            ServiceError::Fund(e) => Some(e),
            _ => None,
        }
    }
}

/// Serialized, journaled front door to a `FundBook`.
///
/// Generic over its collaborators so tests run fully in memory and a host can
/// plug in a durable journal, a real payment rail and its own clock.
#[derive(Debug)]
pub struct FundService<S, B, P, C> {
    state: Mutex<LedgerState>,
    store: S,
    bus: B,
    payouts: P,
    clock: C,
}

#[derive(Debug)]
struct LedgerState {
    book: FundBook,
    /// Applied, paid-out events the journal has not accepted yet, in order.
    unjournaled: Vec<HeldEvent>,
}

#[derive(Debug)]
struct HeldEvent {
    record: UncommittedEvent,
    event: FundEvent,
}

impl<B, P, C> FundService<JournalStore, B, P, C>
where
    B: EventBus<EventEnvelope<FundEvent>>,
    P: Payouts,
    C: Clock,
{
    /// Configure from the environment (see `FundConfig::from_env`), then open.
    pub fn from_env(bus: B, payouts: P, clock: C) -> Result<Self, ServiceError> {
        let config = FundConfig::from_env()?;
        Self::from_config(&config, bus, payouts, clock)
    }

    /// Open the journal selected by `config` and replay it.
    pub fn from_config(config: &FundConfig, bus: B, payouts: P, clock: C) -> Result<Self, ServiceError> {
        let store = config.open_store()?;
        Self::open(config.administrator, store, bus, payouts, clock)
    }
}

impl<S, B, P, C> FundService<S, B, P, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<FundEvent>>,
    P: Payouts,
    C: Clock,
{
    /// Rebuild the ledger by replaying every journal entry in order.
    pub fn open(
        administrator: AccountId,
        store: S,
        bus: B,
        payouts: P,
        clock: C,
    ) -> Result<Self, ServiceError> {
        let mut book = FundBook::new(administrator);
        for stored in store.load_all()? {
            let event: FundEvent = stored.decode()?;
            book.replay(&event).map_err(|e| {
                EventStoreError::Corrupted(format!(
                    "event {} ({}) at position {}: {e}",
                    stored.event_id, stored.event_type, stored.sequence_number
                ))
            })?;
        }

        info!(
            administrator = %administrator,
            funds = book.registry().len(),
            version = book.version(),
            "fund ledger opened"
        );

        Ok(Self {
            state: Mutex::new(LedgerState {
                book,
                unjournaled: Vec::new(),
            }),
            store,
            bus,
            payouts,
            clock,
        })
    }

    pub fn administrator(&self) -> Result<AccountId, ServiceError> {
        Ok(self.lock()?.book.administrator())
    }

    pub fn create_fund(
        &self,
        caller: AccountId,
        fund_id: FundId,
        cause: impl Into<String>,
        target_amount: Amount,
        duration_secs: u64,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        self.dispatch(FundCommand::CreateFund(CreateFund {
            caller,
            fund_id,
            cause: cause.into(),
            target_amount,
            duration_secs,
            occurred_at: self.clock.now(),
        }))
    }

    /// Donate `amount` (the value attached to the call) to a fund.
    pub fn donate(
        &self,
        caller: AccountId,
        fund_id: FundId,
        amount: Amount,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        self.dispatch(FundCommand::Donate(Donate {
            caller,
            fund_id,
            amount,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn withdraw(&self, caller: AccountId, fund_id: FundId) -> Result<Vec<StoredEvent>, ServiceError> {
        self.dispatch(FundCommand::Withdraw(Withdraw {
            caller,
            fund_id,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn refund(&self, caller: AccountId, fund_id: FundId) -> Result<Vec<StoredEvent>, ServiceError> {
        self.dispatch(FundCommand::Refund(Refund {
            caller,
            fund_id,
            occurred_at: self.clock.now(),
        }))
    }

    pub fn get_fund(&self, fund_id: FundId) -> Result<FundSnapshot, ServiceError> {
        Ok(self.lock()?.book.registry().get_fund(fund_id)?)
    }

    pub fn total_donated_amount(&self, fund_id: FundId) -> Result<Amount, ServiceError> {
        Ok(self.lock()?.book.registry().total_donated_amount(fund_id)?)
    }

    pub fn remaining_amount_to_target(&self, fund_id: FundId) -> Result<Amount, ServiceError> {
        Ok(self.lock()?.book.registry().remaining_amount_to_target(fund_id)?)
    }

    pub fn is_open(&self, fund_id: FundId) -> Result<bool, ServiceError> {
        Ok(self.lock()?.book.registry().is_open(fund_id)?)
    }

    /// Recorded (non-refunded) contribution of one contributor.
    pub fn contribution(&self, fund_id: FundId, contributor: AccountId) -> Result<Amount, ServiceError> {
        let state = self.lock()?;
        state.book.registry().fund(fund_id)?;
        Ok(state.book.ledger().contribution(fund_id, contributor))
    }

    /// Snapshots of every fund, in creation order.
    pub fn funds(&self) -> Result<Vec<FundSnapshot>, ServiceError> {
        Ok(self.lock()?.book.registry().funds().map(Fund::snapshot).collect())
    }

    /// Number of events applied, including any not yet journaled.
    pub fn version(&self) -> Result<u64, ServiceError> {
        Ok(self.lock()?.book.version())
    }

    /// Number of applied events still waiting for the journal.
    pub fn unjournaled(&self) -> Result<usize, ServiceError> {
        Ok(self.lock()?.unjournaled.len())
    }

    /// Retry journaling held events; returns how many were written.
    pub fn recover_journal(&self) -> Result<usize, ServiceError> {
        let mut state = self.lock()?;
        let held = state.unjournaled.len();
        self.flush_unjournaled(&mut state)?;
        Ok(held)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, ServiceError> {
        self.state.lock().map_err(|_| ServiceError::Poisoned)
    }

    fn flush_unjournaled(&self, state: &mut LedgerState) -> Result<(), ServiceError> {
        if state.unjournaled.is_empty() {
            return Ok(());
        }

        let held = state.unjournaled.len();
        let journaled = state.book.version() - held as u64;
        let records = state.unjournaled.iter().map(|h| h.record.clone()).collect();

        let committed = match self.store.append(records, ExpectedVersion::Exact(journaled)) {
            Ok(committed) => committed,
            Err(e) => {
                warn!(error = %e, held, "journal still refusing held events");
                return Err(e.into());
            }
        };

        info!(events = committed.len(), "held events journaled");
        let events = std::mem::take(&mut state.unjournaled)
            .into_iter()
            .map(|h| h.event)
            .collect();
        self.publish(&committed, events);

        Ok(())
    }

    fn publish(&self, committed: &[StoredEvent], events: Vec<FundEvent>) {
        for (stored, event) in committed.iter().zip(events) {
            let envelope = EventEnvelope::new(stored.event_id, stored.fund_id, stored.sequence_number, event);
            if let Err(e) = self.bus.publish(envelope) {
                warn!(error = ?e, sequence_number = stored.sequence_number, "notification not delivered");
            }
        }
    }

    #[instrument(
        skip(self, command),
        fields(command = command.name(), fund_id = %command.target_fund_id(), caller = %command.caller())
    )]
    fn dispatch(&self, command: FundCommand) -> Result<Vec<StoredEvent>, ServiceError> {
        let mut state = self.lock()?;

        // 0) Nothing new is decided while settled events are unjournaled
        self.flush_unjournaled(&mut state)?;

        // 1) Decide (no mutation)
        let decided = match state.book.handle(&command) {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "command rejected");
                return Err(e.into());
            }
        };
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let records = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        // 2) Settle outbound value before anything is recorded
        let mut settled = false;
        for event in &decided {
            if let Some((recipient, amount)) = event.outbound_transfer() {
                if let Err(e) = self.payouts.transfer(recipient, amount) {
                    warn!(error = %e, %recipient, %amount, "payout failed; command rolled back");
                    return Err(e.into());
                }
                settled = true;
            }
        }

        // 3) Persist (append-only, optimistic)
        let expected = ExpectedVersion::Exact(state.book.version());
        let committed = match self.store.append(records.clone(), expected) {
            Ok(committed) => committed,
            Err(e) if settled => {
                error!(error = %e, "journal append failed after a settled payout; holding events");
                for event in &decided {
                    state.book.apply(event);
                }
                state.unjournaled = records
                    .into_iter()
                    .zip(decided)
                    .map(|(record, event)| HeldEvent { record, event })
                    .collect();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        // 4) Apply
        for event in &decided {
            state.book.apply(event);
        }
        info!(events = committed.len(), version = state.book.version(), "command committed");

        // 5) Notify observers; never fails the call
        self.publish(&committed, decided);

        Ok(committed)
    }
}
