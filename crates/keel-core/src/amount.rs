// crates/keel-core/src/amount.rs
//
// $KEEL token amounts and supply constants.
//
// The smallest unit of any token in the protocol is the "grain".
// 1 KEEL = 10^9 grains. All internal accounting uses grains to avoid
// floating-point precision issues in economic calculations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of grains in one KEEL. 1 KEEL = 10^9 grains.
pub const GRAIN_PER_KEEL: u64 = 1_000_000_000;

/// Type alias for grains — the smallest unit of any token amount.
pub type Grains = u64;

/// Unix timestamp in seconds. Protocol logic never reads a clock; callers
/// pass `now` explicitly so every time-dependent transition is replayable.
pub type Timestamp = u64;

/// Seconds in one day, the auction engine's emission window.
pub const DAY_SECONDS: u64 = 86_400;

/// Seconds in one (non-leap) year, the interest accrual base.
pub const YEAR_SECONDS: u64 = 365 * DAY_SECONDS;

/// A $KEEL token amount.
///
/// Wraps an amount in grains (the smallest denomination).
/// All arithmetic is performed in integer grains to avoid floating-point
/// errors; subtraction saturates at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keel {
    /// Amount in grains (1 KEEL = 10^9 grains).
    pub grains: u64,
}

impl Keel {
    /// Create a Keel amount from a whole KEEL value (as f64).
    ///
    /// # Example
    /// ```
    /// use keel_core::amount::Keel;
    /// let amount = Keel::from_keel(1.5);
    /// assert_eq!(amount.grains, 1_500_000_000);
    /// ```
    pub fn from_keel(amount: f64) -> Self {
        Self {
            grains: (amount * GRAIN_PER_KEEL as f64) as u64,
        }
    }

    /// Create a Keel amount from a grain value.
    pub fn from_grains(grains: u64) -> Self {
        Self { grains }
    }

    /// Convert this amount to KEEL as a floating-point value.
    pub fn to_keel(&self) -> f64 {
        self.grains as f64 / GRAIN_PER_KEEL as f64
    }

    /// Returns zero KEEL.
    pub fn zero() -> Self {
        Self { grains: 0 }
    }
}

impl Add for Keel {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            grains: self.grains + rhs.grains,
        }
    }
}

impl Sub for Keel {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            grains: self.grains.saturating_sub(rhs.grains),
        }
    }
}

impl fmt::Display for Keel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.grains / GRAIN_PER_KEEL;
        let frac = self.grains % GRAIN_PER_KEEL;
        if frac == 0 {
            write!(f, "{} KEEL", whole)
        } else {
            // Display up to 9 decimal places, trimming trailing zeros
            let frac_str = format!("{:09}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{} KEEL", whole, trimmed)
        }
    }
}
