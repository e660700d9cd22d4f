//! `charityfund-core`: ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod amount;
pub mod clock;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, ExpectedVersion};
pub use amount::{Amount, ETHER_DECIMALS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FundError, FundResult};
pub use id::{AccountId, FundId};
