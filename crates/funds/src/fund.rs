use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use charityfund_core::{Amount, FundId};

use crate::event::{FundCreated, FundEvent};

/// Lifecycle of a fund.
///
/// ```text
/// Open --(donation reaches target)--> Closed --(withdraw)--> Withdrawn
/// ```
///
/// There is no deadline-driven transition: an Open fund past its deadline
/// stays Open and becomes refundable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundStatus {
    Open,
    Closed,
    Withdrawn,
}

impl FundStatus {
    pub fn is_open(self) -> bool {
        matches!(self, FundStatus::Open)
    }

    pub fn is_amount_withdrawn(self) -> bool {
        matches!(self, FundStatus::Withdrawn)
    }
}

/// One charitable campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fund {
    id: FundId,
    cause: String,
    target_amount: Amount,
    donated_amount: Amount,
    created_at: DateTime<Utc>,
    duration_secs: u64,
    status: FundStatus,
}

impl Fund {
    pub(crate) fn from_created(e: &FundCreated) -> Self {
        Self {
            id: e.fund_id,
            cause: e.cause.clone(),
            target_amount: e.target_amount,
            donated_amount: Amount::ZERO,
            created_at: e.occurred_at,
            duration_secs: e.duration_secs,
            status: FundStatus::Open,
        }
    }

    pub fn fund_id(&self) -> FundId {
        self.id
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn target_amount(&self) -> Amount {
        self.target_amount
    }

    pub fn donated_amount(&self) -> Amount {
        self.donated_amount
    }

    pub fn remaining_amount_to_target(&self) -> Amount {
        self.target_amount.saturating_sub(self.donated_amount)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// `created_at + duration`, saturating at the latest representable instant.
    pub fn deadline(&self) -> DateTime<Utc> {
        i64::try_from(self.duration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|d| self.created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True once `now` has reached the deadline.
    pub fn duration_reached(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    pub fn status(&self) -> FundStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_amount_withdrawn(&self) -> bool {
        self.status.is_amount_withdrawn()
    }

    pub fn snapshot(&self) -> FundSnapshot {
        FundSnapshot {
            id: self.id,
            cause: self.cause.clone(),
            target_amount: self.target_amount,
            donated_amount: self.donated_amount,
            created_at: self.created_at,
            duration_secs: self.duration_secs,
            deadline: self.deadline(),
            status: self.status,
            is_open: self.is_open(),
            is_amount_withdrawn: self.is_amount_withdrawn(),
        }
    }

    /// Evolve this fund from one of its own events.
    pub(crate) fn apply(&mut self, event: &FundEvent) {
        match event {
            // Creation is handled by the registry.
            FundEvent::FundCreated(_) => {}
            FundEvent::AmountDonated(e) => {
                self.donated_amount = self.donated_amount.saturating_add(e.amount);
            }
            FundEvent::FundClosed(_) => {
                self.status = FundStatus::Closed;
            }
            FundEvent::AmountWithdrawn(_) => {
                self.status = FundStatus::Withdrawn;
            }
            FundEvent::AmountRefunded(e) => {
                self.donated_amount = self.donated_amount.saturating_sub(e.amount);
            }
        }
    }
}

/// Read-only copy of a fund as returned by `FundRegistry::get_fund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSnapshot {
    pub id: FundId,
    pub cause: String,
    pub target_amount: Amount,
    pub donated_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub deadline: DateTime<Utc>,
    pub status: FundStatus,
    pub is_open: bool,
    pub is_amount_withdrawn: bool,
}
