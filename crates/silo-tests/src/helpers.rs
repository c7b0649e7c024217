//! Shared test helpers for the E2E and invariant suites.

use std::sync::Arc;

use silo_core::traits::ManualClock;
use silo_core::types::Address;
use silo_farm::config::FarmConfig;
use silo_farm::farm::TokenFarm;
use silo_farm::token::MemoryToken;
use silo_interest::engine::InterestEngine;

pub const TOKEN_NAME: &str = "Silo Staking Token";
pub const TOKEN_SYMBOL: &str = "SILO";

/// Fixed test epoch: 2023-11-14T22:13:20Z.
pub const T0: u64 = 1_700_000_000;

/// The farm owner used by every harness.
pub const OWNER: Address = Address::from_bytes([0xA1; 20]);

/// The farm's own token account.
pub const FARM: Address = Address::from_bytes([0xFA; 20]);

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::from_bytes([seed; 20])
}

/// A farm wired to an in-memory token and a manual clock.
pub struct Harness {
    pub farm: TokenFarm,
    pub token: MemoryToken,
    pub clock: Arc<ManualClock>,
}

/// Build a harness with the given launch APY and an empty token ledger.
pub fn harness(initial_apy: u64) -> Harness {
    let token = MemoryToken::new(TOKEN_NAME, TOKEN_SYMBOL);
    let clock = Arc::new(ManualClock::new(T0));
    let farm = TokenFarm::new(
        Arc::new(token.handle(FARM)),
        Arc::new(InterestEngine::new()),
        clock.clone(),
        FarmConfig::new(OWNER, FARM).with_apy(initial_apy),
    )
    .expect("memory token always probes successfully");
    Harness { farm, token, clock }
}

impl Harness {
    /// Mint `amount` to `user` and approve the farm to pull it.
    pub fn fund(&self, user: &Address, amount: u64) {
        self.token.mint(user, amount).expect("mint within supply");
        self.token.approve_from(user, &FARM, amount);
    }

    /// Fund the reward reserve so interest payouts have backing.
    pub fn fund_reserve(&self, amount: u64) {
        self.fund(&OWNER, amount);
        self.farm
            .store_farming_rewards(&OWNER, amount)
            .expect("owner funds reserve");
    }
}

/// Opt-in log output for debugging test failures: set `RUST_LOG` and call
/// this at the top of a test.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}
