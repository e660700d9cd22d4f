//! FundRegistry: the collection of funds and their read projections.

use std::collections::HashMap;

use charityfund_core::{AccountId, Amount, FundError, FundId, FundResult};

use crate::command::CreateFund;
use crate::event::{FundCreated, FundEvent};
use crate::fund::{Fund, FundSnapshot};

/// Owns every `Fund`, keyed by id and kept in creation order.
///
/// The administrator identity is fixed at construction; privileged decisions
/// (`create_fund` here, `withdraw` in the ledger) compare the caller against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundRegistry {
    administrator: AccountId,
    funds: Vec<Fund>,
    index: HashMap<FundId, usize>,
}

impl FundRegistry {
    pub fn new(administrator: AccountId) -> Self {
        Self {
            administrator,
            funds: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn administrator(&self) -> AccountId {
        self.administrator
    }

    pub fn ensure_administrator(&self, caller: AccountId) -> FundResult<()> {
        if caller != self.administrator {
            return Err(FundError::unauthorized(caller));
        }
        Ok(())
    }

    pub fn contains(&self, fund_id: FundId) -> bool {
        self.index.contains_key(&fund_id)
    }

    pub fn fund(&self, fund_id: FundId) -> FundResult<&Fund> {
        self.index
            .get(&fund_id)
            .map(|&idx| &self.funds[idx])
            .ok_or(FundError::FundNotFound(fund_id))
    }

    pub fn get_fund(&self, fund_id: FundId) -> FundResult<FundSnapshot> {
        self.fund(fund_id).map(Fund::snapshot)
    }

    pub fn total_donated_amount(&self, fund_id: FundId) -> FundResult<Amount> {
        self.fund(fund_id).map(Fund::donated_amount)
    }

    pub fn remaining_amount_to_target(&self, fund_id: FundId) -> FundResult<Amount> {
        self.fund(fund_id).map(Fund::remaining_amount_to_target)
    }

    pub fn is_open(&self, fund_id: FundId) -> FundResult<bool> {
        self.fund(fund_id).map(Fund::is_open)
    }

    /// All funds in creation order.
    pub fn funds(&self) -> impl Iterator<Item = &Fund> {
        self.funds.iter()
    }

    pub fn len(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    /// Decide a fund creation.
    pub fn create_fund(&self, cmd: &CreateFund) -> FundResult<Vec<FundEvent>> {
        self.ensure_administrator(cmd.caller)?;

        if self.contains(cmd.fund_id) {
            return Err(FundError::FundAlreadyExists(cmd.fund_id));
        }
        if cmd.target_amount.is_zero() {
            return Err(FundError::InvalidTarget(cmd.target_amount));
        }

        Ok(vec![FundEvent::FundCreated(FundCreated {
            fund_id: cmd.fund_id,
            cause: cmd.cause.clone(),
            target_amount: cmd.target_amount,
            duration_secs: cmd.duration_secs,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Reject a recorded event that does not fit the current state: a second
    /// creation of the same fund, or any other event for an unknown fund.
    pub(crate) fn check_recorded(&self, event: &FundEvent) -> FundResult<()> {
        let fund_id = charityfund_events::Event::fund_id(event);
        match event {
            FundEvent::FundCreated(_) if self.contains(fund_id) => {
                Err(FundError::FundAlreadyExists(fund_id))
            }
            FundEvent::FundCreated(_) => Ok(()),
            _ if !self.contains(fund_id) => Err(FundError::FundNotFound(fund_id)),
            _ => Ok(()),
        }
    }

    pub(crate) fn apply(&mut self, event: &FundEvent) {
        match event {
            FundEvent::FundCreated(e) => {
                if !self.contains(e.fund_id) {
                    self.index.insert(e.fund_id, self.funds.len());
                    self.funds.push(Fund::from_created(e));
                }
            }
            other => {
                let fund_id = charityfund_events::Event::fund_id(other);
                if let Some(&idx) = self.index.get(&fund_id) {
                    self.funds[idx].apply(other);
                }
            }
        }
    }
}
