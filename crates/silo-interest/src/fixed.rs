//! Signed 64.64 fixed-point arithmetic.
//!
//! A [`Fixed64`] stores a rational number as a signed 128-bit integer scaled
//! by 2^64: 64 integer bits, 64 fractional bits. Everything is integer
//! arithmetic: compounding must be bit-for-bit reproducible across
//! platforms, so native floats are never used. Operations truncate toward
//! zero and fail with [`MathError::ArithmeticOverflow`] when a result leaves
//! the representable range (integer part beyond ±2^63).
//!
//! The 256-bit intermediates needed by `mul`/`div` are built from 64-bit
//! limbs; `ln` runs an iterated mantissa-squaring binary logarithm and `exp`
//! reduces its argument to `k·ln2 + r` before summing the Maclaurin series
//! for `e^r`.

use silo_core::error::MathError;

/// Number of fractional bits.
const FRAC_BITS: u32 = 64;

/// ln(2) in 64.64, truncated.
const LN_2: i128 = 0xB172_17F7_D1CF_79AB;

/// A signed 64.64 fixed-point number.
///
/// # Examples
///
/// ```
/// use silo_interest::fixed::Fixed64;
/// let x = Fixed64::from_int(3);
/// assert_eq!(x.to_int(), 3);
/// assert_eq!(x.mul(Fixed64::from_int(2)).unwrap(), Fixed64::from_int(6));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed64(i128);

impl Fixed64 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRAC_BITS);

    /// Construct from a raw 64.64 bit pattern.
    pub const fn from_bits(bits: i128) -> Self {
        Self(bits)
    }

    /// The raw 64.64 bit pattern.
    pub const fn to_bits(self) -> i128 {
        self.0
    }

    /// Convert an integer. Always exact.
    pub const fn from_int(value: i64) -> Self {
        Self((value as i128) << FRAC_BITS)
    }

    /// Floor of the represented value.
    pub const fn to_int(self) -> i64 {
        (self.0 >> FRAC_BITS) as i64
    }

    /// `num / den` as a fixed-point value, truncated toward zero.
    pub fn from_ratio(num: i64, den: i64) -> Result<Self, MathError> {
        Self::from_int(num).div(Self::from_int(den))
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::ArithmeticOverflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::ArithmeticOverflow)
    }

    /// Fixed-point multiply with a 256-bit intermediate, truncating toward zero.
    pub fn mul(self, rhs: Self) -> Result<Self, MathError> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let (hi, lo) = wide_mul(self.0.unsigned_abs(), rhs.0.unsigned_abs());
        if hi >> FRAC_BITS != 0 {
            return Err(MathError::ArithmeticOverflow);
        }
        Self::from_magnitude((hi << FRAC_BITS) | (lo >> FRAC_BITS), negative)
    }

    /// Fixed-point divide, truncating toward zero.
    pub fn div(self, rhs: Self) -> Result<Self, MathError> {
        if rhs.0 == 0 {
            return Err(MathError::DivisionByZero);
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let a = self.0.unsigned_abs();
        // The numerator is `a << 64` as a 256-bit value split into halves.
        let magnitude = wide_div(a >> FRAC_BITS, a << FRAC_BITS, rhs.0.unsigned_abs())?;
        Self::from_magnitude(magnitude, negative)
    }

    /// Multiply a non-negative factor by an integer amount, flooring to u64.
    ///
    /// This is the payout path: `principal × growth factor` stays in full
    /// 256-bit precision until the final floor.
    pub fn mul_int(self, amount: u64) -> Result<u64, MathError> {
        if self.0 < 0 {
            return Err(MathError::ArithmeticOverflow);
        }
        let (hi, lo) = wide_mul(self.0 as u128, amount as u128);
        if hi >> FRAC_BITS != 0 {
            return Err(MathError::ArithmeticOverflow);
        }
        u64::try_from((hi << FRAC_BITS) | (lo >> FRAC_BITS))
            .map_err(|_| MathError::ArithmeticOverflow)
    }

    /// Natural logarithm. Fails with [`MathError::NonPositiveLogarithm`] on
    /// zero or negative input.
    pub fn ln(self) -> Result<Self, MathError> {
        Self(self.log2_bits()?).mul(Self(LN_2))
    }

    /// Binary logarithm as raw 64.64 bits, via iterated mantissa squaring:
    /// normalize the mantissa to `[1, 2)`, then extract one fractional bit
    /// per squaring.
    fn log2_bits(self) -> Result<i128, MathError> {
        if self.0 <= 0 {
            return Err(MathError::NonPositiveLogarithm);
        }
        let raw = self.0 as u128;
        let msb = 127 - raw.leading_zeros();
        let mut result = ((msb as i128) - FRAC_BITS as i128) << FRAC_BITS;

        // Mantissa normalized so its top bit sits at bit 127 (i.e. in [1, 2)
        // scaled by 2^127).
        let mut mantissa = raw << (127 - msb);
        let mut bit: i128 = 1 << (FRAC_BITS - 1);
        while bit > 0 {
            let (hi, lo) = wide_mul(mantissa, mantissa);
            // The square of a [2^127, 2^128) mantissa is in [2^254, 2^256).
            // Top bit at 255 means the mantissa crossed 2: emit a 1 bit and
            // renormalize by an extra halving.
            if hi >> 127 != 0 {
                mantissa = hi;
                result += bit;
            } else {
                mantissa = (hi << 1) | (lo >> 127);
            }
            bit >>= 1;
        }
        Ok(result)
    }

    /// `e^self`. Truncates to zero for arguments below ~-45 and overflows
    /// once the result reaches 2^63 (arguments above ~43.7).
    pub fn exp(self) -> Result<Self, MathError> {
        // Reduce to x = k·ln2 + r with |r| ≤ ln2/2, so e^x = e^r << k.
        let quotient = self.div(Self(LN_2))?;
        let k = quotient
            .checked_add(Self(1 << (FRAC_BITS - 1)))?
            .to_int();
        if k > 63 {
            return Err(MathError::ArithmeticOverflow);
        }
        if k < -65 {
            return Ok(Self::ZERO);
        }
        let r = self.checked_sub(Self::from_int(k).mul(Self(LN_2))?)?;

        // Maclaurin series for e^r. With |r| ≤ 0.35 the terms drop below one
        // ulp well before the iteration cap.
        let mut sum = Self::ONE;
        let mut term = Self::ONE;
        for n in 1..=40i64 {
            term = term.mul(r)?.div(Self::from_int(n))?;
            if term.0 == 0 {
                break;
            }
            sum = sum.checked_add(term)?;
        }

        let magnitude = sum.0 as u128;
        if k >= 0 {
            if (k as u32) >= magnitude.leading_zeros() {
                return Err(MathError::ArithmeticOverflow);
            }
            Ok(Self((magnitude << k) as i128))
        } else {
            Ok(Self((magnitude >> (-k as u32)) as i128))
        }
    }

    /// `self ^ exponent`, computed as `exp(ln(self) · exponent)`.
    ///
    /// The base must be positive unless the exponent is zero.
    pub fn pow(self, exponent: Self) -> Result<Self, MathError> {
        if exponent.0 == 0 {
            return Ok(Self::ONE);
        }
        if self.0 == Self::ONE.0 {
            return Ok(Self::ONE);
        }
        self.ln()?.mul(exponent)?.exp()
    }

    fn from_magnitude(magnitude: u128, negative: bool) -> Result<Self, MathError> {
        if negative {
            if magnitude > 1 << 127 {
                return Err(MathError::ArithmeticOverflow);
            }
            Ok(Self((magnitude as i128).wrapping_neg()))
        } else {
            if magnitude > i128::MAX as u128 {
                return Err(MathError::ArithmeticOverflow);
            }
            Ok(Self(magnitude as i128))
        }
    }
}

/// Full 128×128 → 256-bit unsigned multiply as (high, low) halves.
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1 << 64) - 1;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle accumulator: at most 3·(2^64 − 1), fits u128 with room to spare.
    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (mid << 64) | (ll & MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value `(num_hi, num_lo)` by `den` with binary restoring
/// division. Fails if the quotient exceeds 128 bits.
fn wide_div(num_hi: u128, num_lo: u128, den: u128) -> Result<u128, MathError> {
    if den == 0 {
        return Err(MathError::DivisionByZero);
    }
    if num_hi >= den {
        return Err(MathError::ArithmeticOverflow);
    }
    let mut rem = num_hi;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        // rem may carry into bit 128 here; the wrap is compensated because
        // den is then always subtractable.
        let carry = rem >> 127;
        rem = (rem << 1) | ((num_lo >> i) & 1);
        if carry != 0 || rem >= den {
            rem = rem.wrapping_sub(den);
            quotient |= 1 << i;
        }
    }
    Ok(quotient)
}
