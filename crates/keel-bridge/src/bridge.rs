// crates/keel-bridge/src/bridge.rs
//
// The bridge policy: burn-on-send, mint-on-receive.
//
// Sending burns the holder's KEEL locally before dispatch; if the
// transport rejects the message, the burn is compensated by re-minting so
// the failed send leaves no supply change. Receiving decodes the payload
// and mints to the recipient.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use keel_core::{lock_write, AccountId, Grains, KeelError};
use keel_kernel::{Capability, Permission, PolicyId, PolicyManifest};
use keel_modules::{minter, Minter};

use crate::payload::BridgePayload;

/// The cross-chain message transport seam.
///
/// Implementations own ordering and delivery guarantees; the bridge only
/// hands over opaque payload bytes.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Dispatch `payload` to `destination`.
    async fn send(&self, destination: u32, payload: Vec<u8>) -> Result<(), KeelError>;
}

/// The bridge policy.
pub struct Bridge {
    capability: Capability,
    minter: Arc<RwLock<Minter>>,
    transport: Arc<dyn MessageTransport>,
}

impl Bridge {
    /// The policy's registered name.
    pub const POLICY: &'static str = "bridge";

    /// The activation manifest declaring dependencies and permissions.
    pub fn manifest() -> PolicyManifest {
        PolicyManifest {
            policy: PolicyId::new(Self::POLICY),
            dependencies: vec![(Minter::KEYCODE, Minter::VERSION.major)],
            permissions: vec![
                Permission::new(Minter::KEYCODE, minter::FN_MINT),
                Permission::new(Minter::KEYCODE, minter::FN_BURN),
            ],
        }
    }

    /// Create the bridge.
    pub fn new(
        capability: Capability,
        minter: Arc<RwLock<Minter>>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            capability,
            minter,
            transport,
        }
    }

    /// Send `amount` KEEL from `from` to `recipient` on `destination`.
    ///
    /// Burns before dispatch; a transport failure re-mints the burned
    /// amount and propagates the error.
    pub async fn send(
        &self,
        from: &AccountId,
        destination: u32,
        recipient: AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        if amount == 0 {
            return Err(KeelError::Validation("cannot bridge zero".to_string()));
        }
        let payload = BridgePayload { recipient, amount };
        let bytes = payload.encode()?;

        lock_write(&self.minter).burn(&self.capability, from, amount)?;

        if let Err(e) = self.transport.send(destination, bytes).await {
            tracing::warn!(
                "transport rejected bridge send of {} to chain {}: {}; re-minting",
                amount,
                destination,
                e
            );
            lock_write(&self.minter).mint(&self.capability, from, amount)?;
            return Err(e);
        }

        tracing::info!(
            "bridged {} from {} to {} on chain {}",
            amount,
            from,
            recipient,
            destination
        );
        Ok(())
    }

    /// Handle an inbound message: decode and mint to the recipient.
    pub fn handle_receive(&self, source: u32, payload: &[u8]) -> Result<(), KeelError> {
        let payload = BridgePayload::decode(payload)?;
        if payload.amount == 0 {
            return Err(KeelError::Validation(
                "inbound bridge payload carries zero amount".to_string(),
            ));
        }
        lock_write(&self.minter).mint(&self.capability, &payload.recipient, payload.amount)?;
        tracing::info!(
            "received {} for {} from chain {}",
            payload.amount,
            payload.recipient,
            source
        );
        Ok(())
    }
}
