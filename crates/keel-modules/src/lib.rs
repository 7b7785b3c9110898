// crates/keel-modules/src/lib.rs
//
// keel-modules: storage-owning modules for the Keel Protocol.
//
// Each module owns one concern's state: reserve custody (TRSRY), native
// token supply (MINTR), external addresses (RGSTY), deposit solvency
// accounting (CDEPO), and conversion positions (CDPOS). Every privileged
// mutation is gated on the kernel's permission table. The crate also
// carries the in-memory ledger/vault/oracle collaborators used by the
// daemon wiring and tests.

pub mod deposit_registry;
pub mod ledger;
pub mod minter;
pub mod oracle;
pub mod positions;
pub mod registry;
pub mod treasury;
pub mod vault;

// Re-export key types for ergonomic access from downstream crates.

// Modules
pub use deposit_registry::{DepositRegistry, VaultEntry};
pub use minter::{Minter, UNLIMITED_APPROVAL};
pub use positions::{Position, PositionBook, UNCONVERTIBLE};
pub use registry::AddressRegistry;
pub use treasury::Treasury;

// In-memory collaborators
pub use ledger::InMemoryLedger;
pub use oracle::IntervalOracle;
pub use vault::SharesVault;
