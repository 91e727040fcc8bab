//! U256 fixed-point arithmetic for conversion-rate and premium calculations.
//!
//! All conversion rates are expressed in 18-decimal fixed point
//! ("how many units of dest per unit of src", scaled by [`PRECISION`]).
//! Premiums and fees are expressed in basis points of [`BPS_DENOMINATOR`].

use alloy::primitives::U256;

/// 1e18, the fixed-point scale for conversion rates.
pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Basis points denominator (10000 = 100%).
pub const BPS_DENOMINATOR: U256 = U256::from_limbs([10000u64, 0, 0, 0]);

/// Largest decimal difference accepted when rescaling between two tokens.
pub const MAX_DECIMALS: u8 = 18;

/// Pre-computed powers of 10 for fast decimal conversion.
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Math failures surfaced to oracle callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// The decimal gap between source and destination exceeds [`MAX_DECIMALS`].
    #[error("decimals out of range")]
    DecimalsOutOfRange,
}

/// Fast power of 10 lookup (up to 10^38).
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    if exp < 39 {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// Apply a basis-points deduction: `value - value * bps / 10000`.
///
/// Example: `apply_premium_bps(1000, 100)` = 990 (1% premium).
#[inline(always)]
pub fn apply_premium_bps(value: U256, bps: u16) -> U256 {
    value - (value * U256::from(bps)) / BPS_DENOMINATOR
}

/// Normalize a raw feed answer with `decimals` precision to 18 decimals.
#[inline(always)]
pub fn normalize_to_wad(amount: U256, decimals: u8) -> U256 {
    if decimals == 18 {
        amount
    } else if decimals < 18 {
        amount * pow10(18 - decimals)
    } else {
        amount / pow10(decimals - 18)
    }
}

/// Truncating arithmetic mean of two fixed-point rates.
#[inline(always)]
pub fn rate_average(a: U256, b: U256) -> U256 {
    (a + b) / U256::from(2u64)
}

/// Scale `amount` of a `src_decimals` token into its destination-token
/// equivalent at `rate` (18-decimal fixed point, dest per src).
///
/// Rejects pathological decimal gaps instead of silently clamping.
pub fn calculate_return_amount(
    amount: U256,
    src_decimals: u8,
    dest_decimals: u8,
    rate: U256,
) -> Result<U256, MathError> {
    if dest_decimals >= src_decimals {
        let diff = dest_decimals - src_decimals;
        if diff > MAX_DECIMALS {
            return Err(MathError::DecimalsOutOfRange);
        }
        Ok(amount * rate * pow10(diff) / PRECISION)
    } else {
        let diff = src_decimals - dest_decimals;
        if diff > MAX_DECIMALS {
            return Err(MathError::DecimalsOutOfRange);
        }
        Ok(amount * rate / (PRECISION * pow10(diff)))
    }
}
