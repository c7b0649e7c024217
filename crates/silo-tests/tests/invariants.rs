//! Invariant suites over randomized operation sequences.
//!
//! Drives the farm with arbitrary interleavings of deposits, withdrawals,
//! clock advances, and rate changes, checking the ledger's accounting
//! invariants after every single operation. Individual operations are
//! allowed to fail (exhausted allowance, closed slot, overdraw); a failed
//! operation must leave the invariants intact too.

use std::collections::HashMap;

use proptest::collection::vec;
use proptest::prelude::*;

use silo_core::error::FarmError;
use silo_tests::helpers::*;

const USERS: std::ops::Range<u8> = 1u8..4;
const FUNDING_PER_USER: u64 = 1_000_000_000;
const RESERVE: u64 = 1_000_000_000_000;

#[derive(Debug, Clone)]
enum Op {
    Deposit { user: u8, amount: u64 },
    WithdrawAll { user: u8, id: u64 },
    WithdrawPart { user: u8, id: u64, amount: u64 },
    Advance { secs: u64 },
    SetApy { apy: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (USERS, 1u64..1_000_000)
            .prop_map(|(user, amount)| Op::Deposit { user, amount }),
        2 => (USERS, 1u64..6).prop_map(|(user, id)| Op::WithdrawAll { user, id }),
        2 => (USERS, 1u64..6, 1u64..2_000_000)
            .prop_map(|(user, id, amount)| Op::WithdrawPart { user, id, amount }),
        2 => (1u64..2_000_000).prop_map(|secs| Op::Advance { secs }),
        1 => (0u64..100).prop_map(|apy| Op::SetApy { apy }),
    ]
}

fn apply(h: &Harness, op: &Op) {
    match *op {
        Op::Deposit { user, amount } => {
            let _ = h.farm.deposit(&addr(user), amount);
        }
        Op::WithdrawAll { user, id } => {
            let _ = h.farm.request_withdrawal_all(&addr(user), id);
        }
        Op::WithdrawPart { user, id, amount } => {
            let _ = h.farm.request_withdrawal(&addr(user), id, amount);
        }
        Op::Advance { secs } => h.clock.advance(secs),
        Op::SetApy { apy } => {
            h.farm.set_apy(&OWNER, apy).expect("owner may set the rate");
        }
    }
}

fn funded_harness() -> Harness {
    let h = harness(12);
    // Deep reserve so interest payouts never starve; users get finite
    // funding so some deposits legitimately fail on exhausted allowance.
    h.fund_reserve(RESERVE);
    for user in USERS {
        h.fund(&addr(user), FUNDING_PER_USER);
    }
    h
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Invariant: sum of every address's stored principal equals the global
    // total-staked counter, after every operation, successful or not.
    #[test]
    fn ledger_sum_matches_total_staked(ops in vec(op_strategy(), 1..60)) {
        let h = funded_harness();
        for op in &ops {
            apply(&h, op);
            let sum: u64 = USERS.map(|u| h.farm.total_balance_of(&addr(u))).sum();
            prop_assert_eq!(sum, h.farm.total_staked(), "after {:?}", op);
        }
    }

    // Invariant: the farm's token custody always covers the staked
    // principal (the reserve absorbs all interest payouts).
    #[test]
    fn custody_covers_stake(ops in vec(op_strategy(), 1..60)) {
        let h = funded_harness();
        for op in &ops {
            apply(&h, op);
            let custody = h.farm.token_balance_of(&FARM).unwrap();
            prop_assert!(
                custody >= h.farm.total_staked(),
                "custody {} below stake {} after {:?}",
                custody, h.farm.total_staked(), op
            );
        }
    }

    // Deposit ids sequence 1, 2, 3, … per address with no gaps, whatever
    // the interleaving across addresses.
    #[test]
    fn deposit_ids_sequence(users in vec(USERS, 1..30)) {
        let h = funded_harness();
        let mut expected: HashMap<u8, u64> = HashMap::new();
        for user in users {
            let next = expected.entry(user).or_insert(0);
            *next += 1;
            let id = h.farm.deposit(&addr(user), 10).unwrap();
            prop_assert_eq!(id, *next, "user {}", user);
        }
        for (user, last) in expected {
            prop_assert_eq!(h.farm.last_deposit_id(&addr(user)), last);
        }
    }

    // A fully withdrawn slot is terminal: any further withdrawal against it
    // fails with SlotClosed, at any later time and for any amount.
    #[test]
    fn closed_slot_is_terminal(
        amount in 0u64..1_000_000,
        elapsed in 0u64..10_000_000,
        later in 0u64..10_000_000,
    ) {
        let h = funded_harness();
        let alice = addr(1);
        h.farm.deposit(&alice, 500_000).unwrap();
        h.clock.advance(elapsed);
        h.farm.request_withdrawal_all(&alice, 1).unwrap();

        h.clock.advance(later);
        let err = h.farm.request_withdrawal(&alice, 1, amount).unwrap_err();
        prop_assert_eq!(err, FarmError::SlotClosed(1));
        prop_assert_eq!(h.farm.balance(&alice, 1).unwrap(), 0);
    }

    // Identity properties end to end: zero APY or zero elapsed time pays
    // back exactly the principal.
    #[test]
    fn zero_rate_or_zero_time_is_identity(
        principal in 1u64..1_000_000_000,
        elapsed in 0u64..10_000_000,
        apy in 0u64..100,
    ) {
        let h = harness(0);
        let alice = addr(1);
        h.fund(&alice, principal);
        h.farm.deposit(&alice, principal).unwrap();

        // Zero APY: any elapsed time pays the principal.
        h.clock.advance(elapsed);
        let payout = h.farm.request_withdrawal_all(&alice, 1).unwrap();
        prop_assert_eq!(payout, principal);

        // Nonzero APY at zero elapsed time: same identity.
        h.farm.set_apy(&OWNER, apy).unwrap();
        h.fund(&alice, principal);
        h.farm.deposit(&alice, principal).unwrap();
        let payout = h.farm.request_withdrawal_all(&alice, 2).unwrap();
        prop_assert_eq!(payout, principal);
    }
}
