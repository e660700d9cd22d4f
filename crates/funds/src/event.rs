use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charityfund_core::{AccountId, Amount, FundId};
use charityfund_events::Event;

/// Event: FundCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundCreated {
    pub fund_id: FundId,
    pub cause: String,
    pub target_amount: Amount,
    pub duration_secs: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AmountDonated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountDonated {
    pub fund_id: FundId,
    pub contributor: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FundClosed (the donation that reached the target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundClosed {
    pub fund_id: FundId,
    pub donated_amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AmountWithdrawn (full balance paid to the administrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountWithdrawn {
    pub fund_id: FundId,
    pub recipient: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AmountRefunded (full contribution returned to one contributor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRefunded {
    pub fund_id: FundId,
    pub contributor: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundEvent {
    FundCreated(FundCreated),
    AmountDonated(AmountDonated),
    FundClosed(FundClosed),
    AmountWithdrawn(AmountWithdrawn),
    AmountRefunded(AmountRefunded),
}

impl FundEvent {
    /// Value that must leave the ledger before this event may be recorded.
    pub fn outbound_transfer(&self) -> Option<(AccountId, Amount)> {
        match self {
            FundEvent::AmountWithdrawn(e) => Some((e.recipient, e.amount)),
            FundEvent::AmountRefunded(e) => Some((e.contributor, e.amount)),
            _ => None,
        }
    }
}

impl Event for FundEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FundEvent::FundCreated(_) => "fund.created",
            FundEvent::AmountDonated(_) => "fund.amount_donated",
            FundEvent::FundClosed(_) => "fund.closed",
            FundEvent::AmountWithdrawn(_) => "fund.amount_withdrawn",
            FundEvent::AmountRefunded(_) => "fund.amount_refunded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FundEvent::FundCreated(e) => e.occurred_at,
            FundEvent::AmountDonated(e) => e.occurred_at,
            FundEvent::FundClosed(e) => e.occurred_at,
            FundEvent::AmountWithdrawn(e) => e.occurred_at,
            FundEvent::AmountRefunded(e) => e.occurred_at,
        }
    }

    fn fund_id(&self) -> FundId {
        match self {
            FundEvent::FundCreated(e) => e.fund_id,
            FundEvent::AmountDonated(e) => e.fund_id,
            FundEvent::FundClosed(e) => e.fund_id,
            FundEvent::AmountWithdrawn(e) => e.fund_id,
            FundEvent::AmountRefunded(e) => e.fund_id,
        }
    }
}
