// crates/keel-kernel/src/permissions.rs
//
// The permission table and capability tokens.
//
// The table is the single source of truth for which policy may call which
// privileged module function. It is shared (Arc) between the kernel, which
// grants and revokes, and every module, which consults it on each
// privileged call. Checks fail closed: an entry that is not present denies.

use std::collections::HashSet;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use keel_core::{KeelError, Keycode};

/// Identifier of an installed policy (e.g. "clearinghouse", "heart").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyId(String);

impl PolicyId {
    /// Create a policy id from a name.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single `(module, function)` permission a policy may request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Keycode of the module owning the function.
    pub keycode: Keycode,
    /// Name of the privileged function.
    pub function: String,
}

impl Permission {
    /// Create a permission for a module function.
    pub fn new(keycode: Keycode, function: &str) -> Self {
        Self {
            keycode,
            function: function.to_string(),
        }
    }
}

/// An unforgeable token identifying an activated policy.
///
/// Only the kernel constructs capabilities (at policy activation). Holding
/// one does not by itself authorize anything: every privileged call is
/// checked against the live permission table, so deactivation revokes a
/// capability's power without recalling the token.
#[derive(Debug, Clone)]
pub struct Capability {
    policy: PolicyId,
}

impl Capability {
    /// Kernel-internal constructor.
    pub(crate) fn new(policy: PolicyId) -> Self {
        Self { policy }
    }

    /// The policy this capability was issued to.
    pub fn policy(&self) -> &PolicyId {
        &self.policy
    }
}

/// The `(policy, keycode, function) → granted` permission set.
pub struct PermissionTable {
    granted: RwLock<HashSet<(PolicyId, Keycode, String)>>,
}

impl PermissionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            granted: RwLock::new(HashSet::new()),
        }
    }

    /// Grant a permission to a policy. Kernel-internal.
    pub(crate) fn grant(&self, policy: &PolicyId, permission: &Permission) {
        self.granted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((
                policy.clone(),
                permission.keycode,
                permission.function.clone(),
            ));
    }

    /// Revoke every permission held by a policy. Kernel-internal.
    /// Returns the number of entries removed.
    pub(crate) fn revoke_policy(&self, policy: &PolicyId) -> usize {
        let mut granted = self.granted.write().unwrap_or_else(PoisonError::into_inner);
        let before = granted.len();
        granted.retain(|(p, _, _)| p != policy);
        before - granted.len()
    }

    /// Whether a policy currently holds a permission.
    pub fn is_granted(&self, policy: &PolicyId, keycode: Keycode, function: &str) -> bool {
        self.granted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(policy.clone(), keycode, function.to_string()))
    }

    /// Number of permissions currently held by a policy.
    pub fn count_for(&self, policy: &PolicyId) -> usize {
        self.granted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(p, _, _)| p == policy)
            .count()
    }

    /// Require that the capability's policy holds `(keycode, function)`.
    ///
    /// This is the check every privileged module method performs first.
    ///
    /// # Errors
    /// Returns `KeelError::Unauthorized` if the permission is not granted.
    pub fn require(
        &self,
        capability: &Capability,
        keycode: Keycode,
        function: &str,
    ) -> Result<(), KeelError> {
        if self.is_granted(capability.policy(), keycode, function) {
            Ok(())
        } else {
            Err(KeelError::Unauthorized(format!(
                "policy '{}' may not call {}.{}",
                capability.policy(),
                keycode,
                function
            )))
        }
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRSRY: Keycode = Keycode::from_static(*b"TRSRY");
    const MINTR: Keycode = Keycode::from_static(*b"MINTR");

    #[test]
    fn test_deny_by_default() {
        let table = PermissionTable::new();
        let cap = Capability::new(PolicyId::new("clearinghouse"));
        assert!(table.require(&cap, TRSRY, "withdraw_reserves").is_err());
    }

    #[test]
    fn test_grant_then_require() {
        let table = PermissionTable::new();
        let policy = PolicyId::new("clearinghouse");
        table.grant(&policy, &Permission::new(TRSRY, "withdraw_reserves"));

        let cap = Capability::new(policy);
        assert!(table.require(&cap, TRSRY, "withdraw_reserves").is_ok());
        // Same module, different function: still denied.
        assert!(table.require(&cap, TRSRY, "set_debt").is_err());
        // Different module: denied.
        assert!(table.require(&cap, MINTR, "withdraw_reserves").is_err());
    }

    #[test]
    fn test_revoke_policy_removes_all() {
        let table = PermissionTable::new();
        let policy = PolicyId::new("heart");
        table.grant(&policy, &Permission::new(TRSRY, "withdraw_reserves"));
        table.grant(&policy, &Permission::new(MINTR, "mint"));
        assert_eq!(table.count_for(&policy), 2);

        let removed = table.revoke_policy(&policy);
        assert_eq!(removed, 2);
        assert_eq!(table.count_for(&policy), 0);

        let cap = Capability::new(policy);
        assert!(table.require(&cap, MINTR, "mint").is_err());
    }

    #[test]
    fn test_revoke_leaves_other_policies() {
        let table = PermissionTable::new();
        let a = PolicyId::new("a");
        let b = PolicyId::new("b");
        table.grant(&a, &Permission::new(MINTR, "mint"));
        table.grant(&b, &Permission::new(MINTR, "mint"));

        table.revoke_policy(&a);
        assert!(!table.is_granted(&a, MINTR, "mint"));
        assert!(table.is_granted(&b, MINTR, "mint"));
    }
}
