//! Compound-interest engine implementing the [`InterestModel`] trait.
//!
//! Computes `principal · (1 + apy/100)^(elapsed/SECONDS_PER_YEAR)` in 64.64
//! fixed point. Interest is never persisted anywhere; callers evaluate it
//! lazily at withdrawal time from the slot's original timestamp.

use silo_core::constants::{PERCENT_BASE, SECONDS_PER_YEAR};
use silo_core::error::MathError;
use silo_core::traits::InterestModel;
use tracing::trace;

use crate::fixed::Fixed64;

/// The production accrual engine.
///
/// Implements [`InterestModel`] with:
/// - Continuous compounding over fractional years (per-second resolution)
/// - Identity short-circuits for zero rate and zero elapsed time
/// - Overflow detection instead of silent wrapping
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestEngine;

impl InterestEngine {
    /// Create a new InterestEngine.
    pub fn new() -> Self {
        Self
    }

    /// Growth factor `(1 + apy/100)^(elapsed/SECONDS_PER_YEAR)` as 64.64.
    pub fn growth_factor(apy: u64, elapsed_secs: u64) -> Result<Fixed64, MathError> {
        let apy = i64::try_from(apy).map_err(|_| MathError::ArithmeticOverflow)?;
        let elapsed = i64::try_from(elapsed_secs).map_err(|_| MathError::ArithmeticOverflow)?;
        let base = Fixed64::ONE.checked_add(Fixed64::from_ratio(apy, PERCENT_BASE as i64)?)?;
        let exponent = Fixed64::from_ratio(elapsed, SECONDS_PER_YEAR as i64)?;
        base.pow(exponent)
    }
}

impl InterestModel for InterestEngine {
    fn accrued_amount(&self, principal: u64, apy: u64, elapsed_secs: u64)
        -> Result<u64, MathError> {
        if principal == 0 {
            return Ok(0);
        }
        if apy == 0 || elapsed_secs == 0 {
            return Ok(principal);
        }
        let factor = Self::growth_factor(apy, elapsed_secs)?;
        let accrued = factor.mul_int(principal)?;
        trace!(principal, apy, elapsed_secs, accrued, "accrual computed");
        Ok(accrued)
    }
}
