use charityfund_core::{AccountId, FundId};

/// A request to change the ledger, targeting exactly one fund.
///
/// Commands carry intent and are never persisted; accepted commands turn into
/// events, rejected ones leave no trace. Every command names its caller so
/// privileged operations can be checked against the administrator.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_fund_id(&self) -> FundId;

    /// Identity on whose behalf the command runs.
    fn caller(&self) -> AccountId;
}
