use thiserror::Error;

/// Protocol-wide error types for the Keel Protocol.
///
/// Every category aborts the whole operation: there is no partial commit.
/// Floor-clamped arithmetic (receivable decrements, reward underflow
/// protection) is *not* an error and never appears here.
#[derive(Debug, Error)]
pub enum KeelError {
    /// Authorization failure (ungranted permission, missing role, inactive
    /// policy). No retry path except re-authorization through governance.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Input validation failure (length mismatch, zero amount, wrong token,
    /// stale position). Safe to retry with corrected input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invariant violation (insolvency, zero-progress auction iteration,
    /// module version mismatch). Indicates a deeper inconsistency; never
    /// silently clamped.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Invalid state transition (double install, beat before deadline,
    /// shutdown facility).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found (unknown module, loan, position, snapshot).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Re-entrant call into a guarded entry point.
    #[error("Reentrancy: {0}")]
    Reentrancy(String),

    /// Serialization/deserialization error (bridge payloads, config).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KeelError {
    fn from(e: serde_json::Error) -> Self {
        KeelError::Serialization(e.to_string())
    }
}
