// crates/keel-core/src/keycode.rs
//
// Module keycodes and semantic versions.
//
// Every storage-owning module is registered in the kernel under a unique
// five-character uppercase code (e.g. TRSRY, MINTR, CDEPO). Policies
// declare their module dependencies against the module's major version;
// a major bump forces dependent policies through re-activation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::KeelError;

/// A five-character uppercase ASCII module code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keycode([u8; 5]);

impl Keycode {
    /// Parse a keycode from a string.
    ///
    /// # Errors
    /// Returns `KeelError::Validation` unless the input is exactly five
    /// uppercase ASCII letters.
    pub fn new(code: &str) -> Result<Self, KeelError> {
        let bytes = code.as_bytes();
        if bytes.len() != 5 {
            return Err(KeelError::Validation(format!(
                "Keycode '{}' must be exactly 5 characters",
                code
            )));
        }
        let mut arr = [0u8; 5];
        for (i, &b) in bytes.iter().enumerate() {
            if !b.is_ascii_uppercase() {
                return Err(KeelError::Validation(format!(
                    "Keycode '{}' must be uppercase ASCII letters",
                    code
                )));
            }
            arr[i] = b;
        }
        Ok(Self(arr))
    }

    /// Construct a keycode from a static five-byte literal.
    ///
    /// Intended for `pub const KEYCODE: Keycode = Keycode::from_static(*b"TRSRY")`
    /// definitions; validation happens at compile time in const context.
    pub const fn from_static(bytes: [u8; 5]) -> Self {
        let mut i = 0;
        while i < 5 {
            assert!(
                bytes[i].is_ascii_uppercase(),
                "keycode bytes must be uppercase ASCII letters"
            );
            i += 1;
        }
        Self(bytes)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        // Constructors guarantee the bytes are ASCII.
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A semantic module version.
///
/// Policies gate on `major` only: a minor bump is compatible, a major bump
/// fails the dependency check at policy activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Create a version.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
