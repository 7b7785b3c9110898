// crates/keel-heart/src/lib.rs
//
// keel-heart: the heartbeat orchestrator policy for the Keel Protocol.
//
// One keeper-callable entry point that sequences dependent updates in a
// fixed order on an exact-multiple schedule, with a linear keeper reward
// auction per beat.

pub mod heart;

// Re-export key types for ergonomic access from downstream crates.
pub use heart::{BeatTask, Heart, HeartConfig};
