//! FundBook: registry + ledger as one event-sourced aggregate.

use charityfund_core::{AccountId, Aggregate, FundError, FundResult};

use crate::command::FundCommand;
use crate::event::FundEvent;
use crate::ledger::FundLedger;
use crate::registry::FundRegistry;

/// The complete ledger state.
///
/// Decisions go to the component that owns the rule (creation to the registry,
/// money movement to the ledger). Every applied event is routed to both so the
/// registry's `donated_amount` and the ledger's records never drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundBook {
    registry: FundRegistry,
    ledger: FundLedger,
    version: u64,
}

impl FundBook {
    pub fn new(administrator: AccountId) -> Self {
        Self {
            registry: FundRegistry::new(administrator),
            ledger: FundLedger::new(),
            version: 0,
        }
    }

    pub fn registry(&self) -> &FundRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &FundLedger {
        &self.ledger
    }

    pub fn administrator(&self) -> AccountId {
        self.registry.administrator()
    }

    /// Apply an event read back from the journal.
    ///
    /// Unlike `apply`, refuses events that cannot follow the current state, so
    /// a damaged or hand-edited journal is reported instead of silently
    /// diverging.
    pub fn replay(&mut self, event: &FundEvent) -> FundResult<()> {
        self.registry.check_recorded(event)?;
        self.apply(event);
        Ok(())
    }
}

impl Aggregate for FundBook {
    type Command = FundCommand;
    type Event = FundEvent;
    type Error = FundError;

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.registry.apply(event);
        self.ledger.apply(event);

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FundCommand::CreateFund(cmd) => self.registry.create_fund(cmd),
            FundCommand::Donate(cmd) => self.ledger.donate(&self.registry, cmd),
            FundCommand::Withdraw(cmd) => self.ledger.withdraw(&self.registry, cmd),
            FundCommand::Refund(cmd) => self.ledger.refund(&self.registry, cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use proptest::prelude::*;

    use charityfund_core::{Amount, FundId};
    use charityfund_events::execute;

    use crate::command::{CreateFund, Donate, Refund, Withdraw};
    use crate::fund::FundStatus;

    fn ether(text: &str) -> Amount {
        Amount::from_ether(text).unwrap()
    }

    fn fund_id(raw: u64) -> FundId {
        FundId::new(raw).unwrap()
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn after(secs: i64) -> DateTime<Utc> {
        start() + TimeDelta::seconds(secs)
    }

    fn create(book: &mut FundBook, id: u64, cause: &str, target: Amount) {
        let cmd = FundCommand::CreateFund(CreateFund {
            caller: book.administrator(),
            fund_id: fund_id(id),
            cause: cause.to_string(),
            target_amount: target,
            duration_secs: 3600,
            occurred_at: start(),
        });
        execute(book, &cmd).unwrap();
    }

    fn donate(
        book: &mut FundBook,
        caller: AccountId,
        id: u64,
        amount: Amount,
    ) -> Result<Vec<FundEvent>, FundError> {
        execute(
            book,
            &FundCommand::Donate(Donate {
                caller,
                fund_id: fund_id(id),
                amount,
                occurred_at: after(1),
            }),
        )
    }

    fn withdraw(book: &mut FundBook, caller: AccountId, id: u64) -> Result<Vec<FundEvent>, FundError> {
        execute(
            book,
            &FundCommand::Withdraw(Withdraw {
                caller,
                fund_id: fund_id(id),
                occurred_at: after(2),
            }),
        )
    }

    fn refund(
        book: &mut FundBook,
        caller: AccountId,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<Vec<FundEvent>, FundError> {
        execute(
            book,
            &FundCommand::Refund(Refund {
                caller,
                fund_id: fund_id(id),
                occurred_at: at,
            }),
        )
    }

    /// Three funds: #1 partly funded, #2 fully funded (closed), #3 funded by the admin.
    fn book_with_donations() -> (FundBook, AccountId) {
        let admin = AccountId::new();
        let donor = AccountId::new();
        let mut book = FundBook::new(admin);

        create(&mut book, 1, "Animal Welfare", ether("0.5"));
        donate(&mut book, donor, 1, ether("0.2")).unwrap();
        create(&mut book, 2, "Global Warming", ether("2"));
        donate(&mut book, donor, 2, ether("2")).unwrap();
        create(&mut book, 3, "Cancer", ether("1"));
        donate(&mut book, admin, 3, ether("0.5")).unwrap();

        (book, donor)
    }

    #[test]
    fn reads_reflect_partial_donation() {
        let (book, _) = book_with_donations();
        let registry = book.registry();

        assert_eq!(registry.total_donated_amount(fund_id(1)).unwrap(), ether("0.2"));
        assert_eq!(registry.remaining_amount_to_target(fund_id(1)).unwrap(), ether("0.3"));
        assert!(registry.is_open(fund_id(1)).unwrap());
        assert!(!registry.is_open(fund_id(2)).unwrap());
    }

    #[test]
    fn donation_emits_amount_donated() {
        let admin = AccountId::new();
        let donor = AccountId::new();
        let mut book = FundBook::new(admin);
        create(&mut book, 1, "Animal Welfare", ether("0.5"));

        let events = donate(&mut book, donor, 1, ether("0.3")).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            FundEvent::AmountDonated(e) => {
                assert_eq!(e.fund_id, fund_id(1));
                assert_eq!(e.contributor, donor);
                assert_eq!(e.amount, ether("0.3"));
            }
            other => panic!("expected AmountDonated, got {other:?}"),
        }
        assert_eq!(book.ledger().contribution(fund_id(1), donor), ether("0.3"));
    }

    #[test]
    fn reaching_target_closes_fund() {
        let admin = AccountId::new();
        let mut book = FundBook::new(admin);
        create(&mut book, 1, "Animal Welfare", ether("0.5"));

        let events = donate(&mut book, AccountId::new(), 1, ether("0.5")).unwrap();
        assert!(matches!(events.last(), Some(FundEvent::FundClosed(_))));

        let fund = book.registry().get_fund(fund_id(1)).unwrap();
        assert!(!fund.is_open);
        assert_eq!(fund.status, FundStatus::Closed);
    }

    #[test]
    fn donation_to_closed_fund_is_rejected() {
        let (mut book, donor) = book_with_donations();

        let err = donate(&mut book, donor, 2, ether("0.1")).unwrap_err();
        assert_eq!(err, FundError::FundIsClosed(fund_id(2)));
    }

    #[test]
    fn closed_fund_is_reported_before_a_zero_amount() {
        let (mut book, donor) = book_with_donations();

        let err = donate(&mut book, donor, 2, Amount::ZERO).unwrap_err();
        assert_eq!(err, FundError::FundIsClosed(fund_id(2)));
    }

    #[test]
    fn closed_fund_is_reported_before_the_deadline() {
        let (mut book, donor) = book_with_donations();

        // Fund 2 is closed and its deadline is an hour away.
        let err = refund(&mut book, donor, 2, after(1)).unwrap_err();
        assert_eq!(err, FundError::FundIsClosed(fund_id(2)));
    }

    #[test]
    fn replay_rejects_events_that_cannot_follow() {
        let (mut book, donor) = book_with_donations();
        let before = book.clone();

        let duplicate = FundEvent::FundCreated(crate::event::FundCreated {
            fund_id: fund_id(1),
            cause: "Cancer".to_string(),
            target_amount: ether("9"),
            duration_secs: 60,
            occurred_at: after(5),
        });
        assert_eq!(book.replay(&duplicate).unwrap_err(), FundError::FundAlreadyExists(fund_id(1)));

        let orphan = FundEvent::AmountDonated(crate::event::AmountDonated {
            fund_id: fund_id(9),
            contributor: donor,
            amount: ether("0.1"),
            occurred_at: after(5),
        });
        assert_eq!(book.replay(&orphan).unwrap_err(), FundError::FundNotFound(fund_id(9)));
        assert_eq!(book, before);

        let valid = FundEvent::AmountDonated(crate::event::AmountDonated {
            fund_id: fund_id(1),
            contributor: donor,
            amount: ether("0.1"),
            occurred_at: after(5),
        });
        book.replay(&valid).unwrap();
        assert_eq!(book.ledger().contribution(fund_id(1), donor), ether("0.3"));
        assert_eq!(book.version(), before.version() + 1);
    }

    #[test]
    fn zero_donation_is_rejected() {
        let (mut book, donor) = book_with_donations();

        let err = donate(&mut book, donor, 1, Amount::ZERO).unwrap_err();
        assert_eq!(err, FundError::AmountIsNotPositiveNumber);
    }

    #[test]
    fn donation_over_target_is_rejected_whole() {
        let admin = AccountId::new();
        let donor = AccountId::new();
        let mut book = FundBook::new(admin);
        create(&mut book, 1, "Animal Welfare", ether("0.5"));

        donate(&mut book, donor, 1, ether("0.3")).unwrap();
        let before = book.clone();
        let err = donate(&mut book, donor, 1, ether("0.3")).unwrap_err();

        assert!(matches!(err, FundError::DonationExceedsTargetAmount { .. }));
        assert_eq!(book, before);
        assert_eq!(book.registry().total_donated_amount(fund_id(1)).unwrap(), ether("0.3"));
    }

    #[test]
    fn donation_to_unknown_fund_is_rejected() {
        let (mut book, donor) = book_with_donations();

        let err = donate(&mut book, donor, 123, ether("3")).unwrap_err();
        assert_eq!(err, FundError::FundNotFound(fund_id(123)));
    }

    #[test]
    fn administrator_withdraws_closed_fund_once() {
        let (mut book, _) = book_with_donations();
        let admin = book.administrator();

        let events = withdraw(&mut book, admin, 2).unwrap();
        assert_eq!(
            events[0].outbound_transfer(),
            Some((admin, ether("2")))
        );
        assert!(book.registry().get_fund(fund_id(2)).unwrap().is_amount_withdrawn);

        let err = withdraw(&mut book, admin, 2).unwrap_err();
        assert_eq!(err, FundError::AmountIsAlreadyWithdrawn(fund_id(2)));
    }

    #[test]
    fn withdraw_rules() {
        let (mut book, donor) = book_with_donations();
        let admin = book.administrator();

        assert_eq!(
            withdraw(&mut book, donor, 2).unwrap_err(),
            FundError::Unauthorized { caller: donor }
        );
        assert_eq!(withdraw(&mut book, admin, 1).unwrap_err(), FundError::FundIsOpen(fund_id(1)));
        assert_eq!(
            withdraw(&mut book, admin, 123).unwrap_err(),
            FundError::FundNotFound(fund_id(123))
        );
        // Authorization precedes the existence check.
        assert!(matches!(
            withdraw(&mut book, donor, 123).unwrap_err(),
            FundError::Unauthorized { .. }
        ));
    }

    #[test]
    fn contributor_is_refunded_after_deadline() {
        let (mut book, donor) = book_with_donations();

        let events = refund(&mut book, donor, 1, after(3600)).unwrap();
        assert_eq!(events[0].outbound_transfer(), Some((donor, ether("0.2"))));

        assert_eq!(book.ledger().contribution(fund_id(1), donor), Amount::ZERO);
        assert_eq!(book.registry().total_donated_amount(fund_id(1)).unwrap(), Amount::ZERO);
        // Refunds never close the fund.
        assert!(book.registry().is_open(fund_id(1)).unwrap());

        let err = refund(&mut book, donor, 1, after(3600)).unwrap_err();
        assert!(matches!(err, FundError::NoAmountToBeRefunded { .. }));
    }

    #[test]
    fn refund_rules() {
        let (mut book, donor) = book_with_donations();

        assert_eq!(
            refund(&mut book, donor, 1, after(3599)).unwrap_err(),
            FundError::FundDurationNotReached {
                fund_id: fund_id(1),
                deadline: after(3600),
            }
        );
        assert_eq!(
            refund(&mut book, donor, 2, after(3600)).unwrap_err(),
            FundError::FundIsClosed(fund_id(2))
        );
        assert_eq!(
            refund(&mut book, donor, 3, after(3600)).unwrap_err(),
            FundError::NoAmountToBeRefunded {
                fund_id: fund_id(3),
                contributor: donor,
            }
        );
        assert_eq!(
            refund(&mut book, donor, 123, after(3600)).unwrap_err(),
            FundError::FundNotFound(fund_id(123))
        );
    }

    #[test]
    fn expired_open_fund_still_accepts_donations() {
        let (mut book, donor) = book_with_donations();

        let events = execute(
            &mut book,
            &FundCommand::Donate(Donate {
                caller: donor,
                fund_id: fund_id(1),
                amount: ether("0.3"),
                occurred_at: after(7200),
            }),
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert!(!book.registry().is_open(fund_id(1)).unwrap());
    }

    #[test]
    fn version_counts_applied_events() {
        let (book, _) = book_with_donations();
        // 3 creations + 3 donations + 1 auto-close.
        assert_eq!(book.version(), 7);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Donate { donor: usize, amount: u128 },
        Refund { donor: usize },
        Withdraw,
        Advance,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0usize..3, 1u128..400).prop_map(|(donor, amount)| Op::Donate { donor, amount }),
            2 => (0usize..3).prop_map(|donor| Op::Refund { donor }),
            1 => Just(Op::Withdraw),
            1 => Just(Op::Advance),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of operations is attempted, the donated
        /// amount stays within [0, target], equals the sum of live contribution
        /// records, and a withdrawn fund is never open.
        #[test]
        fn ledger_invariants_hold(ops in prop::collection::vec(op(), 1..40)) {
            let admin = AccountId::new();
            let donors = [AccountId::new(), AccountId::new(), AccountId::new()];
            let target = Amount::new(1_000);
            let mut book = FundBook::new(admin);
            create(&mut book, 1, "Invariants", target);

            let mut now = start();
            let mut withdrawals = 0;

            for op in ops {
                let before = book.clone();
                let result = match op {
                    Op::Donate { donor, amount } => execute(&mut book, &FundCommand::Donate(Donate {
                        caller: donors[donor],
                        fund_id: fund_id(1),
                        amount: Amount::new(amount),
                        occurred_at: now,
                    })),
                    Op::Refund { donor } => execute(&mut book, &FundCommand::Refund(Refund {
                        caller: donors[donor],
                        fund_id: fund_id(1),
                        occurred_at: now,
                    })),
                    Op::Withdraw => {
                        let r = execute(&mut book, &FundCommand::Withdraw(Withdraw {
                            caller: admin,
                            fund_id: fund_id(1),
                            occurred_at: now,
                        }));
                        if r.is_ok() {
                            withdrawals += 1;
                        }
                        r
                    }
                    Op::Advance => {
                        now += TimeDelta::seconds(1800);
                        Ok(vec![])
                    }
                };

                if result.is_err() {
                    prop_assert_eq!(&book, &before);
                }

                let fund = book.registry().fund(fund_id(1)).unwrap();
                prop_assert!(fund.donated_amount() <= target);
                prop_assert_eq!(fund.donated_amount(), book.ledger().total_contributions(fund_id(1)));
                if fund.is_amount_withdrawn() {
                    prop_assert!(!fund.is_open());
                }
            }

            prop_assert!(withdrawals <= 1);
        }

        /// Property: donate then refund (after the deadline, still open) returns
        /// exactly the donation and restores the previous donated amount.
        #[test]
        fn donate_refund_round_trip(prior in 0u128..500, amount in 1u128..500) {
            let admin = AccountId::new();
            let donor = AccountId::new();
            let mut book = FundBook::new(admin);
            create(&mut book, 1, "Round trip", Amount::new(1_000));
            if prior > 0 {
                donate(&mut book, AccountId::new(), 1, Amount::new(prior)).unwrap();
            }
            let donated_before = book.registry().total_donated_amount(fund_id(1)).unwrap();

            donate(&mut book, donor, 1, Amount::new(amount)).unwrap();
            let events = refund(&mut book, donor, 1, after(3600)).unwrap();

            prop_assert_eq!(events[0].outbound_transfer(), Some((donor, Amount::new(amount))));
            prop_assert_eq!(book.registry().total_donated_amount(fund_id(1)).unwrap(), donated_before);
        }
    }
}
