//! Farm constants. All monetary values in subunits (1 token = 10^8 subunits).

pub const COIN: u64 = 100_000_000;

/// Seconds in the 365-day compounding year used by the accrual formula.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Denominator turning a whole-percent APY into a growth rate.
///
/// An APY of 12 means the per-year growth base is `1 + 12 / PERCENT_BASE`.
pub const PERCENT_BASE: u64 = 100;

/// APY (whole percent) a farm launches with unless configured otherwise.
pub const DEFAULT_APY: u64 = 12;

/// Number of bytes in an [`Address`](crate::types::Address).
pub const ADDRESS_BYTES: usize = 20;
