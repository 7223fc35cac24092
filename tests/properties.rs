//! Property-based tests for account invariants
//!
//! - Codec round-trip: decode(encode(a)) == a
//! - Conservation: an applied transfer moves exactly `amount` and keeps the sum
//! - Silent rejection: a rejected transfer leaves both balances untouched

use account_ledger::transfer::apply;
use account_ledger::{
    codec, Account, AccountStore, InMemoryLedger, Ledger, TransferEngine, TransferOutcome,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Strategy for generating addresses (any non-empty printable text)
fn address_strategy() -> impl Strategy<Value = String> {
    "\\PC{1,24}"
}

fn account_strategy() -> impl Strategy<Value = Account> {
    (address_strategy(), any::<i64>()).prop_map(|(address, balance)| Account::new(address, balance))
}

proptest! {
    #[test]
    fn prop_codec_round_trip(account in account_strategy()) {
        let bytes = codec::encode(&account);
        let decoded = codec::decode(&account.address, &bytes).unwrap();
        prop_assert_eq!(decoded, account);
    }

    #[test]
    fn prop_applied_transfer_conserves_total(
        from_balance in 1i64..1_000_000_000,
        to_balance in -1_000_000_000i64..1_000_000_000,
        fraction in 0.0f64..=1.0,
    ) {
        let amount = ((from_balance as f64 * fraction) as i64).clamp(1, from_balance);
        let mut from = Account::new("from", from_balance);
        let mut to = Account::new("to", to_balance);

        let outcome = apply(&mut from, &mut to, amount);

        prop_assert_eq!(outcome, TransferOutcome::Applied);
        prop_assert_eq!(from.balance, from_balance - amount);
        prop_assert_eq!(to.balance, to_balance + amount);
        prop_assert_eq!(from.balance + to.balance, from_balance + to_balance);
    }

    #[test]
    fn prop_rejected_transfer_is_silent_noop(
        from_balance in -1_000_000i64..1_000_000,
        to_balance in -1_000_000i64..1_000_000,
        amount in -2_000_000i64..2_000_000,
    ) {
        prop_assume!(amount <= 0 || from_balance < amount);
        let mut from = Account::new("from", from_balance);
        let mut to = Account::new("to", to_balance);

        let outcome = apply(&mut from, &mut to, amount);

        prop_assert_eq!(outcome, TransferOutcome::Rejected);
        prop_assert_eq!(from.balance, from_balance);
        prop_assert_eq!(to.balance, to_balance);
    }

    #[test]
    fn prop_credit_overflow_is_rejected(amount in 1i64..1_000) {
        let mut from = Account::new("from", amount);
        let mut to = Account::new("to", i64::MAX);

        prop_assert_eq!(apply(&mut from, &mut to, amount), TransferOutcome::Rejected);
        prop_assert_eq!(to.balance, i64::MAX);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_ledger_transfer_matches_pure_rule(
        from_balance in 0i64..10_000,
        to_balance in 0i64..10_000,
        amount in -100i64..20_000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (from_after, to_after) = rt.block_on(async {
            let ledger = InMemoryLedger::new();
            let session: Arc<dyn Ledger> = Arc::new(ledger.session("tx"));
            let store = AccountStore::new(session);
            store.create("from", &from_balance.to_string()).await.unwrap();
            store.create("to", &to_balance.to_string()).await.unwrap();

            TransferEngine::new(store.clone())
                .transfer("from", "to", &amount.to_string())
                .await
                .unwrap();

            (
                store.fetch("from").await.unwrap().balance,
                store.fetch("to").await.unwrap().balance,
            )
        });

        let mut from = Account::new("from", from_balance);
        let mut to = Account::new("to", to_balance);
        apply(&mut from, &mut to, amount);

        prop_assert_eq!(from_after, from.balance);
        prop_assert_eq!(to_after, to.balance);
        prop_assert_eq!(from_after + to_after, from_balance + to_balance);
    }
}
