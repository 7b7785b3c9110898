// crates/keel-bridge/src/lib.rs
//
// keel-bridge: cross-chain transfer surface for the Keel Protocol.
//
// Encodes (recipient, amount) payloads over an abstract message
// transport, burning on send and minting on receive. Ordering and
// delivery are the transport's responsibility.

pub mod bridge;
pub mod payload;

// Re-export key types for ergonomic access from downstream crates.
pub use bridge::{Bridge, MessageTransport};
pub use payload::BridgePayload;
