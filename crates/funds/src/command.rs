use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charityfund_core::{AccountId, Amount, FundId};
use charityfund_events::Command;

/// Command: CreateFund (administrator only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFund {
    pub caller: AccountId,
    pub fund_id: FundId,
    pub cause: String,
    pub target_amount: Amount,
    pub duration_secs: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Donate. `amount` is the value attached to the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donate {
    pub caller: AccountId,
    pub fund_id: FundId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Withdraw (administrator only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub caller: AccountId,
    pub fund_id: FundId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Refund the caller's own contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub caller: AccountId,
    pub fund_id: FundId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundCommand {
    CreateFund(CreateFund),
    Donate(Donate),
    Withdraw(Withdraw),
    Refund(Refund),
}

impl FundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            FundCommand::CreateFund(_) => "create_fund",
            FundCommand::Donate(_) => "donate",
            FundCommand::Withdraw(_) => "withdraw",
            FundCommand::Refund(_) => "refund",
        }
    }
}

impl Command for FundCommand {
    fn target_fund_id(&self) -> FundId {
        match self {
            FundCommand::CreateFund(c) => c.fund_id,
            FundCommand::Donate(c) => c.fund_id,
            FundCommand::Withdraw(c) => c.fund_id,
            FundCommand::Refund(c) => c.fund_id,
        }
    }

    fn caller(&self) -> AccountId {
        match self {
            FundCommand::CreateFund(c) => c.caller,
            FundCommand::Donate(c) => c.caller,
            FundCommand::Withdraw(c) => c.caller,
            FundCommand::Refund(c) => c.caller,
        }
    }
}
