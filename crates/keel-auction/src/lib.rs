// crates/keel-auction/src/lib.rs
//
// keel-auction: the tick-based Dutch auction engine for the Keel Protocol.
//
// Sells convertible-deposit capacity against a per-day emission target:
// price decays with accumulated unsold capacity and steps up as demand
// exhausts ticks, clamped at a configured floor.

pub mod auctioneer;
pub mod tick;

// Re-export key types for ergonomic access from downstream crates.
pub use auctioneer::{Auctioneer, ConvertibleDepositor, Fill};
pub use tick::{AuctionConfig, Tick};
