//! Fund lifecycle domain module (event-sourced).
//!
//! Pure domain logic only: no IO, no transfers, no persistence concerns.
//! `FundRegistry` owns the funds, `FundLedger` owns who gave what, and
//! `FundBook` combines both into one aggregate.

pub mod book;
pub mod command;
pub mod event;
pub mod fund;
pub mod ledger;
pub mod registry;

pub use book::FundBook;
pub use command::{CreateFund, Donate, FundCommand, Refund, Withdraw};
pub use event::{AmountDonated, AmountRefunded, AmountWithdrawn, FundClosed, FundCreated, FundEvent};
pub use fund::{Fund, FundSnapshot, FundStatus};
pub use ledger::FundLedger;
pub use registry::FundRegistry;
