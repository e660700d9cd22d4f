use chrono::{DateTime, Utc};

use charityfund_core::FundId;

/// A ledger event.
///
/// Events are facts: immutable, versioned, append-only. The journal is the
/// source of truth; every piece of ledger state is a fold over it.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "fund.amount_donated").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (clock reading of the originating call).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Fund the event belongs to.
    fn fund_id(&self) -> FundId;
}
