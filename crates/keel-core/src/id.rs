// crates/keel-core/src/id.rs
//
// Account and token identifiers.
//
// Accounts are opaque 32-byte identifiers (the shape of an on-chain
// address). Tokens are identified by short lowercase symbols; receipt
// tokens derive their symbol from the backing asset with a "cd-" prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque 32-byte account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Create an account id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic account id from a human-readable name.
    ///
    /// The name's bytes are cycled into the 32-byte identifier. This is a
    /// wiring/test convenience, not a cryptographic derivation.
    pub fn from_name(name: &str) -> Self {
        let mut bytes = [0u8; 32];
        if !name.is_empty() {
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = name.as_bytes()[i % name.len()];
            }
        }
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First four bytes are enough to tell accounts apart in logs.
        write!(
            f,
            "acct:{:02x}{:02x}{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// A token symbol (e.g. "keel", "reserve", "cd-reserve").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Create a token id from a symbol.
    pub fn new(symbol: &str) -> Self {
        Self(symbol.to_string())
    }

    /// The native protocol token, $KEEL.
    pub fn keel() -> Self {
        Self::new("keel")
    }

    /// The treasury reserve asset.
    pub fn reserve() -> Self {
        Self::new("reserve")
    }

    /// The convertible-deposit receipt token for a backing asset.
    pub fn cd(asset: &TokenId) -> Self {
        Self(format!("cd-{}", asset.0))
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_deterministic() {
        let a = AccountId::from_name("treasury");
        let b = AccountId::from_name("treasury");
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_name_distinct() {
        assert_ne!(AccountId::from_name("alice"), AccountId::from_name("bob"));
    }

    #[test]
    fn test_from_name_empty_is_zero() {
        assert_eq!(AccountId::from_name(""), AccountId::from_bytes([0u8; 32]));
    }

    #[test]
    fn test_display_prefix() {
        let id = AccountId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "acct:abababab");
    }

    #[test]
    fn test_cd_token_symbol() {
        let cd = TokenId::cd(&TokenId::reserve());
        assert_eq!(cd.as_str(), "cd-reserve");
    }
}
