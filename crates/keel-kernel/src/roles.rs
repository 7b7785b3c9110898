// crates/keel-kernel/src/roles.rs
//
// Named roles for administrative entry points on policies.
//
// Roles gate human/governance actions (emergency shutdown, beat toggling,
// approval management); the permission table gates policy-to-module calls.
// Role names are short lowercase identifiers.

use std::collections::{HashMap, HashSet};

use keel_core::{AccountId, KeelError};

/// The administrative role: configuration and approvals.
pub const ROLE_ADMIN: &str = "admin";

/// The emergency role: shutdowns and beat toggling.
pub const ROLE_EMERGENCY: &str = "emergency";

/// Registry of role grants.
pub struct RoleRegistry {
    grants: HashMap<String, HashSet<AccountId>>,
}

impl RoleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// Validate a role name: non-empty, at most 32 chars, lowercase ASCII
    /// letters and underscores.
    fn validate(role: &str) -> Result<(), KeelError> {
        if role.is_empty() || role.len() > 32 {
            return Err(KeelError::Validation(format!(
                "role name '{}' must be 1-32 characters",
                role
            )));
        }
        if !role
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b == b'_')
        {
            return Err(KeelError::Validation(format!(
                "role name '{}' must be lowercase ASCII",
                role
            )));
        }
        Ok(())
    }

    /// Grant a role to an account.
    ///
    /// # Errors
    /// Returns `KeelError::Validation` for a malformed role name, or
    /// `KeelError::InvalidState` if the account already holds the role.
    pub fn grant_role(&mut self, role: &str, account: AccountId) -> Result<(), KeelError> {
        Self::validate(role)?;
        let holders = self.grants.entry(role.to_string()).or_default();
        if !holders.insert(account) {
            return Err(KeelError::InvalidState(format!(
                "{} already holds role '{}'",
                account, role
            )));
        }
        Ok(())
    }

    /// Revoke a role from an account.
    ///
    /// # Errors
    /// Returns `KeelError::NotFound` if the account does not hold the role.
    pub fn revoke_role(&mut self, role: &str, account: &AccountId) -> Result<(), KeelError> {
        let held = self
            .grants
            .get_mut(role)
            .map(|holders| holders.remove(account))
            .unwrap_or(false);
        if !held {
            return Err(KeelError::NotFound(format!(
                "{} does not hold role '{}'",
                account, role
            )));
        }
        Ok(())
    }

    /// Whether an account holds a role.
    pub fn has_role(&self, role: &str, account: &AccountId) -> bool {
        self.grants
            .get(role)
            .map(|holders| holders.contains(account))
            .unwrap_or(false)
    }

    /// Require that an account holds a role.
    ///
    /// # Errors
    /// Returns `KeelError::Unauthorized` if it does not.
    pub fn require_role(&self, role: &str, account: &AccountId) -> Result<(), KeelError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(KeelError::Unauthorized(format!(
                "{} lacks role '{}'",
                account, role
            )))
        }
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
