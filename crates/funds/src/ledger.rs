//! FundLedger: per-contributor records and the donate/withdraw/refund rules.

use std::collections::HashMap;

use charityfund_core::{AccountId, Amount, FundError, FundId, FundResult};

use crate::command::{Donate, Refund, Withdraw};
use crate::event::{AmountDonated, AmountRefunded, AmountWithdrawn, FundClosed, FundEvent};
use crate::fund::FundStatus;
use crate::registry::FundRegistry;

/// Contribution records: fund → contributor → amount.
///
/// The sum of a fund's records always equals its `donated_amount`. A refunded
/// contributor's record is removed, so it reads as zero afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundLedger {
    contributions: HashMap<FundId, HashMap<AccountId, Amount>>,
}

impl FundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contribution(&self, fund_id: FundId, contributor: AccountId) -> Amount {
        self.contributions
            .get(&fund_id)
            .and_then(|by_contributor| by_contributor.get(&contributor))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Live (non-refunded) contributions to a fund, in no particular order.
    pub fn contributors(&self, fund_id: FundId) -> impl Iterator<Item = (AccountId, Amount)> + '_ {
        self.contributions
            .get(&fund_id)
            .into_iter()
            .flat_map(|by_contributor| by_contributor.iter().map(|(c, a)| (*c, *a)))
    }

    pub fn total_contributions(&self, fund_id: FundId) -> Amount {
        self.contributors(fund_id)
            .fold(Amount::ZERO, |acc, (_, amount)| acc.saturating_add(amount))
    }

    /// Decide a donation; reaching the target exactly also closes the fund.
    pub fn donate(&self, registry: &FundRegistry, cmd: &Donate) -> FundResult<Vec<FundEvent>> {
        let fund = registry.fund(cmd.fund_id)?;

        if !fund.is_open() {
            return Err(FundError::FundIsClosed(cmd.fund_id));
        }
        if cmd.amount.is_zero() {
            return Err(FundError::AmountIsNotPositiveNumber);
        }

        let remaining = fund.remaining_amount_to_target();
        if cmd.amount > remaining {
            return Err(FundError::DonationExceedsTargetAmount {
                fund_id: cmd.fund_id,
                amount: cmd.amount,
                remaining,
            });
        }

        let mut events = vec![FundEvent::AmountDonated(AmountDonated {
            fund_id: cmd.fund_id,
            contributor: cmd.caller,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })];

        if cmd.amount == remaining {
            events.push(FundEvent::FundClosed(FundClosed {
                fund_id: cmd.fund_id,
                donated_amount: fund.target_amount(),
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    /// Decide the one-shot, full-balance withdrawal to the administrator.
    pub fn withdraw(&self, registry: &FundRegistry, cmd: &Withdraw) -> FundResult<Vec<FundEvent>> {
        registry.ensure_administrator(cmd.caller)?;
        let fund = registry.fund(cmd.fund_id)?;

        match fund.status() {
            FundStatus::Open => return Err(FundError::FundIsOpen(cmd.fund_id)),
            FundStatus::Withdrawn => return Err(FundError::AmountIsAlreadyWithdrawn(cmd.fund_id)),
            FundStatus::Closed => {}
        }

        Ok(vec![FundEvent::AmountWithdrawn(AmountWithdrawn {
            fund_id: cmd.fund_id,
            recipient: registry.administrator(),
            amount: fund.donated_amount(),
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Decide a refund of the caller's whole contribution.
    ///
    /// Only an Open fund past its deadline refunds; the fund stays Open.
    pub fn refund(&self, registry: &FundRegistry, cmd: &Refund) -> FundResult<Vec<FundEvent>> {
        let fund = registry.fund(cmd.fund_id)?;

        if !fund.is_open() {
            return Err(FundError::FundIsClosed(cmd.fund_id));
        }
        if !fund.duration_reached(cmd.occurred_at) {
            return Err(FundError::FundDurationNotReached {
                fund_id: cmd.fund_id,
                deadline: fund.deadline(),
            });
        }

        let amount = self.contribution(cmd.fund_id, cmd.caller);
        if amount.is_zero() {
            return Err(FundError::NoAmountToBeRefunded {
                fund_id: cmd.fund_id,
                contributor: cmd.caller,
            });
        }

        Ok(vec![FundEvent::AmountRefunded(AmountRefunded {
            fund_id: cmd.fund_id,
            contributor: cmd.caller,
            amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    pub(crate) fn apply(&mut self, event: &FundEvent) {
        match event {
            FundEvent::AmountDonated(e) => {
                let record = self
                    .contributions
                    .entry(e.fund_id)
                    .or_default()
                    .entry(e.contributor)
                    .or_default();
                *record = record.saturating_add(e.amount);
            }
            FundEvent::AmountRefunded(e) => {
                if let Some(by_contributor) = self.contributions.get_mut(&e.fund_id) {
                    by_contributor.remove(&e.contributor);
                    if by_contributor.is_empty() {
                        self.contributions.remove(&e.fund_id);
                    }
                }
            }
            FundEvent::FundCreated(_) | FundEvent::FundClosed(_) | FundEvent::AmountWithdrawn(_) => {}
        }
    }
}
