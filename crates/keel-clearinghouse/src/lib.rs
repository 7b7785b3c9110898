// crates/keel-clearinghouse/src/lib.rs
//
// keel-clearinghouse: the debt facility policy for the Keel Protocol.
//
// Collateralized loan lifecycle (lend, extend, roll, repay, default
// claims), aggregate receivables with floor-clamped decrements, and the
// treasury funding rebalance loop.

pub mod clearinghouse;
pub mod loan;

// Re-export key types for ergonomic access from downstream crates.
pub use clearinghouse::{
    Clearinghouse, ClearinghouseConfig, COLLATERAL_REWARD_PERCENT, REWARD_SATURATION,
};
pub use loan::{collateral_for, interest_for, Loan, LoanStatus};
