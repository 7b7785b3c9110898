// crates/keel-core/src/lib.rs
//
// keel-core: Core types, amounts, fixed-point math, and trait seams for the
// Keel Protocol.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the canonical identifiers, the protocol error type, the
// grain-denominated amount arithmetic, and the trait interfaces to external
// collaborators (token ledger, yield vault, price oracle).

pub mod amount;
pub mod error;
pub mod id;
pub mod keycode;
pub mod math;
pub mod reentrancy;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use keel_core::Grains;`

// Amount types
pub use amount::{Grains, Keel, Timestamp, DAY_SECONDS, GRAIN_PER_KEEL, YEAR_SECONDS};

// Identifier types
pub use id::{AccountId, TokenId};

// Module keycodes and versions
pub use keycode::{Keycode, Version};

// Fixed-point math
pub use math::{floor_sub, mul_div, mul_div_up, PRICE_SCALE};

// Re-entrancy gate
pub use reentrancy::{ReentrancyGate, ReentrancyGuard};

// Error type
pub use error::KeelError;

// Traits and shared handles
pub use traits::{
    lock_read, lock_write, PriceOracle, SharedLedger, SharedOracle, SharedVault, TokenLedger,
    YieldVault,
};
