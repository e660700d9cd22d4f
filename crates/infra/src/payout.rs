//! Outbound value transfers (withdrawals and refunds).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use charityfund_core::{AccountId, Amount};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayoutError {
    /// The recipient would not accept the funds.
    #[error("recipient {0} rejected the transfer")]
    Rejected(AccountId),

    #[error("transfer of {amount} to {recipient} failed: {reason}")]
    Failed {
        recipient: AccountId,
        amount: Amount,
        reason: String,
    },
}

/// Moves money out of the ledger.
///
/// A transfer either completes or returns an error; on error the service
/// records nothing, so the ledger and the outside world never disagree.
pub trait Payouts: Send + Sync {
    fn transfer(&self, recipient: AccountId, amount: Amount) -> Result<(), PayoutError>;
}

impl<P> Payouts for Arc<P>
where
    P: Payouts + ?Sized,
{
    fn transfer(&self, recipient: AccountId, amount: Amount) -> Result<(), PayoutError> {
        (**self).transfer(recipient, amount)
    }
}

/// In-process payouts: tracks what each account received.
///
/// Recipients marked with `refuse` reject every transfer, standing in for a
/// counterparty that refuses funds.
#[derive(Debug, Default)]
pub struct InMemoryPayouts {
    state: Mutex<PayoutState>,
}

#[derive(Debug, Default)]
struct PayoutState {
    received: HashMap<AccountId, Amount>,
    refused: HashSet<AccountId>,
}

impl InMemoryPayouts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid out to `account` so far.
    pub fn received(&self, account: AccountId) -> Amount {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.received.get(&account).copied())
            .unwrap_or(Amount::ZERO)
    }

    pub fn refuse(&self, account: AccountId) {
        if let Ok(mut state) = self.state.lock() {
            state.refused.insert(account);
        }
    }

    pub fn accept(&self, account: AccountId) {
        if let Ok(mut state) = self.state.lock() {
            state.refused.remove(&account);
        }
    }
}

impl Payouts for InMemoryPayouts {
    fn transfer(&self, recipient: AccountId, amount: Amount) -> Result<(), PayoutError> {
        let mut state = self.state.lock().map_err(|_| PayoutError::Failed {
            recipient,
            amount,
            reason: "lock poisoned".to_string(),
        })?;

        if state.refused.contains(&recipient) {
            return Err(PayoutError::Rejected(recipient));
        }

        let balance = state.received.entry(recipient).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| PayoutError::Failed {
            recipient,
            amount,
            reason: "recipient balance overflow".to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_accumulate_per_recipient() {
        let payouts = InMemoryPayouts::new();
        let account = AccountId::new();

        payouts.transfer(account, Amount::new(3)).unwrap();
        payouts.transfer(account, Amount::new(4)).unwrap();

        assert_eq!(payouts.received(account), Amount::new(7));
        assert_eq!(payouts.received(AccountId::new()), Amount::ZERO);
    }

    #[test]
    fn refusing_recipient_rejects_and_receives_nothing() {
        let payouts = InMemoryPayouts::new();
        let account = AccountId::new();
        payouts.refuse(account);

        let err = payouts.transfer(account, Amount::new(1)).unwrap_err();
        assert_eq!(err, PayoutError::Rejected(account));
        assert_eq!(payouts.received(account), Amount::ZERO);

        payouts.accept(account);
        payouts.transfer(account, Amount::new(1)).unwrap();
        assert_eq!(payouts.received(account), Amount::new(1));
    }
}
