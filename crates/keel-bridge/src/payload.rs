// crates/keel-bridge/src/payload.rs
//
// The bridge wire payload: (recipient, amount), JSON-encoded.
//
// Message ordering and delivery guarantees belong to the transport; the
// payload only needs a stable, self-describing encoding.

use serde::{Deserialize, Serialize};

use keel_core::{AccountId, Grains, KeelError};

/// A cross-chain transfer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePayload {
    /// The account credited on the destination chain.
    pub recipient: AccountId,
    /// KEEL grains to credit.
    pub amount: Grains,
}

impl BridgePayload {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, KeelError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    /// Returns `KeelError::Serialization` for malformed bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, KeelError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let payload = BridgePayload {
            recipient: AccountId::from_name("alice"),
            amount: 42,
        };
        let bytes = payload.encode().unwrap();
        let decoded = BridgePayload::decode(&bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = BridgePayload::decode(b"not a payload");
        assert!(matches!(result, Err(KeelError::Serialization(_))));
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let result = BridgePayload::decode(b"{\"amount\": 1}");
        assert!(matches!(result, Err(KeelError::Serialization(_))));
    }
}
