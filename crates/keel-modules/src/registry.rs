// crates/keel-modules/src/registry.rs
//
// Address registry module (RGSTY): named external contract addresses.
//
// Policies resolve collaborator addresses by name at wiring time. Updates
// retain the previous address in a history list so an operator can audit
// what a name pointed to before a migration.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::{AccountId, KeelError, Keycode, Version};
use keel_kernel::{Capability, PermissionTable};

/// Privileged function name: register a new name.
pub const FN_REGISTER: &str = "register";
/// Privileged function name: update an existing name.
pub const FN_UPDATE: &str = "update";
/// Privileged function name: remove a name.
pub const FN_DEREGISTER: &str = "deregister";

/// The address registry module.
pub struct AddressRegistry {
    permissions: Arc<PermissionTable>,
    entries: HashMap<String, AccountId>,
    history: HashMap<String, Vec<AccountId>>,
}

impl AddressRegistry {
    /// The module's registry keycode.
    pub const KEYCODE: Keycode = Keycode::from_static(*b"RGSTY");

    /// The module's semantic version.
    pub const VERSION: Version = Version { major: 1, minor: 0 };

    /// Create an empty registry.
    pub fn new(permissions: Arc<PermissionTable>) -> Self {
        Self {
            permissions,
            entries: HashMap::new(),
            history: HashMap::new(),
        }
    }

    /// Register a new name.
    ///
    /// # Errors
    /// `InvalidState` if the name is already registered (use `update`).
    pub fn register(
        &mut self,
        cap: &Capability,
        name: &str,
        address: AccountId,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_REGISTER)?;
        if self.entries.contains_key(name) {
            return Err(KeelError::InvalidState(format!(
                "'{}' is already registered; use update",
                name
            )));
        }
        self.entries.insert(name.to_string(), address);
        Ok(())
    }

    /// Re-point an existing name, retaining the old address in history.
    pub fn update(
        &mut self,
        cap: &Capability,
        name: &str,
        address: AccountId,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_UPDATE)?;
        let old = self.entries.get(name).copied().ok_or_else(|| {
            KeelError::NotFound(format!("'{}' is not registered", name))
        })?;
        self.history.entry(name.to_string()).or_default().push(old);
        self.entries.insert(name.to_string(), address);
        Ok(())
    }

    /// Remove a name, retaining its last address in history.
    pub fn deregister(&mut self, cap: &Capability, name: &str) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_DEREGISTER)?;
        let old = self.entries.remove(name).ok_or_else(|| {
            KeelError::NotFound(format!("'{}' is not registered", name))
        })?;
        self.history.entry(name.to_string()).or_default().push(old);
        Ok(())
    }

    /// Resolve a name to its current address.
    pub fn get(&self, name: &str) -> Result<AccountId, KeelError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| KeelError::NotFound(format!("'{}' is not registered", name)))
    }

    /// Prior addresses a name pointed to, oldest first.
    pub fn history(&self, name: &str) -> &[AccountId] {
        self.history.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
