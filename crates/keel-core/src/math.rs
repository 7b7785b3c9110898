// crates/keel-core/src/math.rs
//
// Fixed-point helpers shared by every accounting path.
//
// Prices, rates, and ratios are stored as u64 values scaled by PRICE_SCALE
// (10^9). Products are widened to u128 before division so intermediate
// results never overflow for any realistic amount/price pair.

use crate::amount::Grains;

/// Fixed-point scale for prices, rates, and ratios: 10^9.
///
/// A ratio of 1.0 is `PRICE_SCALE`; 1.1 is `1_100_000_000`; 0.5% is
/// `5_000_000`.
pub const PRICE_SCALE: u64 = 1_000_000_000;

/// Compute `a * b / denom` with u128 intermediates, rounding down.
///
/// Results larger than `u64::MAX` saturate rather than wrap; in practice
/// this only happens with nonsensical configuration.
///
/// # Panics
/// Panics if `denom` is zero. Callers validate configuration up front, so a
/// zero denominator is a programming error, not an input error.
pub fn mul_div(a: u64, b: u64, denom: u64) -> u64 {
    assert!(denom != 0, "mul_div denominator must be non-zero");
    let wide = a as u128 * b as u128 / denom as u128;
    wide.min(u64::MAX as u128) as u64
}

/// Compute `a * b / denom` with u128 intermediates, rounding up.
///
/// Used where rounding must favor the protocol (collateral requirements,
/// share costs of a withdrawal).
///
/// # Panics
/// Panics if `denom` is zero.
pub fn mul_div_up(a: u64, b: u64, denom: u64) -> u64 {
    assert!(denom != 0, "mul_div denominator must be non-zero");
    let num = a as u128 * b as u128;
    let wide = num.div_ceil(denom as u128);
    wide.min(u64::MAX as u128) as u64
}

/// Floor-clamped subtraction: `a - b`, saturating at zero.
///
/// This is the single primitive behind every receivable and liability
/// decrement. External events (a double-counted repayment, a default claimed
/// after a partial repay) must reduce the aggregate to zero, never panic the
/// accounting with an underflow.
pub fn floor_sub(a: Grains, b: Grains) -> Grains {
    a.saturating_sub(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_exact() {
        assert_eq!(mul_div(100, 3, 4), 75);
    }

    #[test]
    fn test_mul_div_rounds_down() {
        assert_eq!(mul_div(10, 1, 3), 3);
    }

    #[test]
    fn test_mul_div_up_rounds_up() {
        assert_eq!(mul_div_up(10, 1, 3), 4);
        // Exact division does not over-round
        assert_eq!(mul_div_up(9, 1, 3), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // a * b overflows u64 but the quotient fits
        let a = u64::MAX / 2;
        assert_eq!(mul_div(a, 4, 2), u64::MAX - 1);
    }

    #[test]
    fn test_mul_div_saturates() {
        assert_eq!(mul_div(u64::MAX, 3, 1), u64::MAX);
    }

    #[test]
    #[should_panic]
    fn test_mul_div_zero_denominator_panics() {
        mul_div(1, 1, 0);
    }

    #[test]
    fn test_floor_sub() {
        assert_eq!(floor_sub(10, 3), 7);
        assert_eq!(floor_sub(3, 10), 0);
        assert_eq!(floor_sub(0, 0), 0);
    }

    #[test]
    fn test_scale_ratio_examples() {
        // 1.1x step applied to a price of 10.0
        let price = 10 * PRICE_SCALE;
        let step = 1_100_000_000;
        assert_eq!(mul_div(price, step, PRICE_SCALE), 11 * PRICE_SCALE);
        // and back down
        assert_eq!(mul_div(11 * PRICE_SCALE, PRICE_SCALE, step), 10 * PRICE_SCALE);
    }
}
