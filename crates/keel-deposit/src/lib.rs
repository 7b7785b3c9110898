// crates/keel-deposit/src/lib.rs
//
// keel-deposit: convertible deposit and yield facility policies for the
// Keel Protocol.
//
// Position mint/convert/reclaim with all-or-nothing batch semantics, and
// yield accounting via vault rate deltas with 8-hour snapshots for
// positions harvested after expiry.

pub mod facility;
pub mod yield_accounting;

// Re-export key types for ergonomic access from downstream crates.
pub use facility::{DepositConfig, DepositFacility};
pub use yield_accounting::{
    accrued_yield, snapshot_key, YieldAccounting, SNAPSHOT_INTERVAL,
};
