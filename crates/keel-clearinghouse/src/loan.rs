// crates/keel-clearinghouse/src/loan.rs
//
// Loan records and the interest/collateral arithmetic behind them.
//
// A loan locks collateral at a fixed loan-to-collateral ratio and accrues
// simple interest for a fixed duration. Interest is recomputed on the
// current principal whenever the term is extended or rolled.

use serde::{Deserialize, Serialize};

use keel_core::{mul_div, mul_div_up, AccountId, Grains, Timestamp, PRICE_SCALE, YEAR_SECONDS};

/// Lifecycle states of a loan.
///
///   Requested --> Cleared(Active) --> {Rolled, Extended}* --> Repaid
///                                                         \-> Defaulted
///
/// Requests clear immediately in the lend flow, so only the cleared state
/// and the two terminal states are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Cleared and outstanding.
    Active,
    /// Fully repaid; collateral returned.
    Repaid,
    /// Claimed after expiry; collateral seized.
    Defaulted,
}

/// A collateralized debt position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    /// Per-borrower loan index.
    pub id: u64,
    /// The borrowing account.
    pub borrower: AccountId,
    /// Outstanding principal in debt-token grains.
    pub principal: Grains,
    /// Outstanding interest in debt-token grains.
    pub interest_due: Grains,
    /// Collateral locked, in collateral-token grains.
    pub collateral: Grains,
    /// The loan defaults after this time.
    pub expiry: Timestamp,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Current lifecycle state.
    pub status: LoanStatus,
}

impl Loan {
    /// Total outstanding debt (principal + interest).
    pub fn total_owed(&self) -> Grains {
        self.principal + self.interest_due
    }

    /// Whether the loan has passed its expiry.
    pub fn is_defaulted(&self, now: Timestamp) -> bool {
        self.status == LoanStatus::Active && now > self.expiry
    }
}

/// Collateral required for a principal at a PRICE_SCALE-scaled
/// loan-to-collateral ratio (debt grains per collateral grain).
///
/// Rounds up: fractional requirements round against the borrower.
pub fn collateral_for(principal: Grains, loan_to_collateral: u64) -> Grains {
    mul_div_up(principal, PRICE_SCALE, loan_to_collateral)
}

/// Simple interest on `principal` at a PRICE_SCALE-scaled annual `rate`
/// over `duration` seconds. Rounds down.
pub fn interest_for(principal: Grains, rate: u64, duration: u64) -> Grains {
    mul_div(mul_div(principal, rate, PRICE_SCALE), duration, YEAR_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::DAY_SECONDS;

    #[test]
    fn test_collateral_for_exact() {
        // 2500 debt grains per collateral grain
        let ltc = 2_500 * PRICE_SCALE;
        assert_eq!(collateral_for(2_500_000, ltc), 1_000);
    }

    #[test]
    fn test_collateral_for_rounds_up() {
        let ltc = 2_500 * PRICE_SCALE;
        assert_eq!(collateral_for(2_500_001, ltc), 1_001);
    }

    #[test]
    fn test_interest_for_full_year() {
        // 0.5% annual on 1_000_000 over a year
        let rate = 5_000_000; // 0.5% scaled
        assert_eq!(interest_for(1_000_000, rate, YEAR_SECONDS), 5_000);
    }

    #[test]
    fn test_interest_for_partial_term() {
        let rate = 5_000_000;
        // Half a year accrues half the interest.
        assert_eq!(
            interest_for(1_000_000, rate, YEAR_SECONDS / 2),
            2_500
        );
        // A 121-day term.
        let term = 121 * DAY_SECONDS;
        assert_eq!(
            interest_for(1_000_000, rate, term),
            5_000 * 121 / 365
        );
    }

    #[test]
    fn test_interest_zero_principal() {
        assert_eq!(interest_for(0, 5_000_000, YEAR_SECONDS), 0);
    }

    #[test]
    fn test_loan_default_check() {
        let loan = Loan {
            id: 0,
            borrower: AccountId::from_name("alice"),
            principal: 100,
            interest_due: 1,
            collateral: 10,
            expiry: 1_000,
            created_at: 0,
            status: LoanStatus::Active,
        };
        assert!(!loan.is_defaulted(1_000));
        assert!(loan.is_defaulted(1_001));
        assert_eq!(loan.total_owed(), 101);
    }
}
