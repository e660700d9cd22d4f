//! Infrastructure layer: journal, payouts, config and the command service.

pub mod config;
pub mod event_store;
pub mod payout;
pub mod service;

pub use config::{ConfigError, FundConfig};
pub use payout::{InMemoryPayouts, PayoutError, Payouts};
pub use service::{FundService, ServiceError};
