//! Trait interfaces for the Silo farm.
//!
//! These traits define the contracts between crates:
//! - [`TokenGateway`] — the external fungible-token collaborator
//! - [`InterestModel`] — pure accrual math (silo-interest implements)
//! - [`Clock`] — time source for deposit and withdrawal stamping

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MathError, TokenError};
use crate::types::Address;

/// Capability set required of any token the farm is constructed with.
///
/// A gateway instance is authenticated as one account: [`transfer`](Self::transfer)
/// moves funds out of that account, and [`transfer_from`](Self::transfer_from)
/// spends allowance granted *to* that account. The farm holds a gateway bound
/// to its own address and depends only on this capability set, never on a
/// concrete token implementation.
pub trait TokenGateway: Send + Sync {
    /// Token balance of `address` in subunits.
    fn balance_of(&self, address: &Address) -> Result<u64, TokenError>;

    /// Transfer `amount` from this gateway's own account to `to`.
    fn transfer(&self, to: &Address, amount: u64) -> Result<(), TokenError>;

    /// Transfer `amount` from `from` to `to`, spending allowance `from`
    /// granted to this gateway's account.
    fn transfer_from(&self, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError>;

    /// Remaining allowance `owner` has granted to `spender`.
    fn allowance(&self, owner: &Address, spender: &Address) -> Result<u64, TokenError>;

    /// Grant `spender` an allowance of `amount` from this gateway's own account.
    fn approve(&self, spender: &Address, amount: u64) -> Result<(), TokenError>;

    /// Total token supply in subunits.
    fn total_supply(&self) -> Result<u64, TokenError>;

    /// Token name.
    fn name(&self) -> Result<String, TokenError>;

    /// Token ticker symbol.
    fn symbol(&self) -> Result<String, TokenError>;
}

/// Pure computation of interest-inflated values.
///
/// Implementations must be deterministic: identical inputs always yield an
/// identical output, with no hidden state and no clock reads. Implemented by
/// the compound-interest engine (silo-interest).
pub trait InterestModel: Send + Sync {
    /// Value of `principal` after `elapsed_secs` of compounding at `apy`
    /// (whole percent per year).
    ///
    /// Must return `principal` unchanged when `apy` or `elapsed_secs` is zero.
    fn accrued_amount(&self, principal: u64, apy: u64, elapsed_secs: u64)
        -> Result<u64, MathError>;

    /// Interest portion only.
    ///
    /// Default implementation: accrued amount minus principal.
    fn accrued_interest(&self, principal: u64, apy: u64, elapsed_secs: u64)
        -> Result<u64, MathError> {
        let accrued = self.accrued_amount(principal, apy, elapsed_secs)?;
        accrued
            .checked_sub(principal)
            .ok_or(MathError::ArithmeticOverflow)
    }
}

/// Time source for the farm's deposit and withdrawal stamps.
///
/// The accrual math itself never reads a clock; only the ledger entry points
/// do, through this seam.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn unix_now(&self) -> u64;
}

/// Wall-clock time source for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for tests: starts at a fixed instant and only moves when
/// told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    /// Create a clock pinned at `start` (Unix seconds).
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, unix_secs: u64) {
        self.0.store(unix_secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
