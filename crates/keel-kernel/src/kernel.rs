// crates/keel-kernel/src/kernel.rs
//
// The permission kernel: registry of installed modules and active policies.
//
// The kernel is the root of trust for every other component. It is an
// explicit object constructed once at wiring time and injected where
// needed; there is no global registry. Typed module handles are resolved
// by the wiring code, not looked up per call. The kernel's job is
// versioned installation bookkeeping and atomic permission grant/revoke.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use keel_core::{KeelError, Keycode, Version};

use crate::permissions::{Capability, Permission, PermissionTable, PolicyId};

/// A policy's activation manifest: what it needs and what it asks for.
///
/// Dependencies are `(keycode, expected major version)` pairs; activation
/// fails unless every dependency is installed at a matching major version.
/// Permissions are granted exactly as requested, atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyManifest {
    /// The policy being activated.
    pub policy: PolicyId,
    /// Module dependencies with their compiled-in expected major versions.
    pub dependencies: Vec<(Keycode, u32)>,
    /// The exact `(module, function)` permissions requested.
    pub permissions: Vec<Permission>,
}

/// The central permissioning kernel.
pub struct Kernel {
    /// Installed modules, keyed by keycode.
    modules: HashMap<Keycode, Version>,
    /// Active policies with their activation manifests.
    active: HashMap<PolicyId, PolicyManifest>,
    /// The shared permission table consulted by module methods.
    permissions: Arc<PermissionTable>,
}

impl Kernel {
    /// Create an empty kernel.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            active: HashMap::new(),
            permissions: Arc::new(PermissionTable::new()),
        }
    }

    /// Handle to the shared permission table, for injection into modules.
    pub fn permissions(&self) -> Arc<PermissionTable> {
        Arc::clone(&self.permissions)
    }

    /// Install a module under its keycode.
    ///
    /// # Errors
    /// Returns `KeelError::InvalidState` if the keycode is already
    /// installed; use [`Kernel::upgrade_module`] to re-point an entry.
    pub fn install_module(&mut self, keycode: Keycode, version: Version) -> Result<(), KeelError> {
        if self.modules.contains_key(&keycode) {
            return Err(KeelError::InvalidState(format!(
                "module {} is already installed; use upgrade_module",
                keycode
            )));
        }
        self.modules.insert(keycode, version);
        Ok(())
    }

    /// Re-point an installed module's registry entry to a new version.
    ///
    /// Policies that depend on the module keep their grants until
    /// deactivated; a major bump makes their next activation fail the
    /// version gate, which is the intended upgrade pressure.
    ///
    /// # Errors
    /// Returns `KeelError::NotFound` if the module was never installed.
    pub fn upgrade_module(&mut self, keycode: Keycode, version: Version) -> Result<(), KeelError> {
        match self.modules.get_mut(&keycode) {
            Some(installed) => {
                *installed = version;
                Ok(())
            }
            None => Err(KeelError::NotFound(format!(
                "module {} is not installed",
                keycode
            ))),
        }
    }

    /// Whether a module is installed.
    pub fn is_installed(&self, keycode: Keycode) -> bool {
        self.modules.contains_key(&keycode)
    }

    /// The installed version of a module, if any.
    pub fn module_version(&self, keycode: Keycode) -> Option<Version> {
        self.modules.get(&keycode).copied()
    }

    /// Activate a policy from its manifest.
    ///
    /// Verifies every declared dependency (installed, matching major
    /// version), then grants all requested permissions atomically and
    /// returns the policy's capability token.
    ///
    /// # Errors
    /// - `KeelError::InvalidState` if the policy is already active.
    /// - `KeelError::NotFound` if a dependency module is not installed.
    /// - `KeelError::Invariant` if a dependency's major version does not
    ///   match the manifest's expectation.
    pub fn activate_policy(&mut self, manifest: PolicyManifest) -> Result<Capability, KeelError> {
        if self.active.contains_key(&manifest.policy) {
            return Err(KeelError::InvalidState(format!(
                "policy '{}' is already active",
                manifest.policy
            )));
        }

        // Version gate: all dependencies checked before any grant, so a
        // failure leaves the table untouched.
        for (keycode, expected_major) in &manifest.dependencies {
            let installed = self.modules.get(keycode).ok_or_else(|| {
                KeelError::NotFound(format!(
                    "policy '{}' depends on module {} which is not installed",
                    manifest.policy, keycode
                ))
            })?;
            if installed.major != *expected_major {
                return Err(KeelError::Invariant(format!(
                    "policy '{}' expects {} major version {} but {} is installed",
                    manifest.policy, keycode, expected_major, installed
                )));
            }
        }

        for permission in &manifest.permissions {
            self.permissions.grant(&manifest.policy, permission);
        }

        let capability = Capability::new(manifest.policy.clone());
        self.active.insert(manifest.policy.clone(), manifest);
        Ok(capability)
    }

    /// Deactivate a policy, revoking all of its permissions atomically.
    ///
    /// Invariant: a deactivated policy holds zero outstanding permissions.
    ///
    /// # Errors
    /// Returns `KeelError::NotFound` if the policy is not active.
    pub fn deactivate_policy(&mut self, policy: &PolicyId) -> Result<(), KeelError> {
        if self.active.remove(policy).is_none() {
            return Err(KeelError::NotFound(format!(
                "policy '{}' is not active",
                policy
            )));
        }
        self.permissions.revoke_policy(policy);
        Ok(())
    }

    /// Whether a policy is currently active.
    pub fn is_active(&self, policy: &PolicyId) -> bool {
        self.active.contains_key(policy)
    }

    /// Ids of all active policies.
    pub fn active_policies(&self) -> Vec<PolicyId> {
        self.active.keys().cloned().collect()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRSRY: Keycode = Keycode::from_static(*b"TRSRY");
    const MINTR: Keycode = Keycode::from_static(*b"MINTR");

    fn make_manifest(name: &str) -> PolicyManifest {
        PolicyManifest {
            policy: PolicyId::new(name),
            dependencies: vec![(TRSRY, 1), (MINTR, 1)],
            permissions: vec![
                Permission::new(TRSRY, "withdraw_reserves"),
                Permission::new(MINTR, "mint"),
            ],
        }
    }

    fn kernel_with_modules() -> Kernel {
        let mut kernel = Kernel::new();
        kernel.install_module(TRSRY, Version::new(1, 0)).unwrap();
        kernel.install_module(MINTR, Version::new(1, 2)).unwrap();
        kernel
    }

    #[test]
    fn test_install_duplicate_fails() {
        let mut kernel = kernel_with_modules();
        let result = kernel.install_module(TRSRY, Version::new(2, 0));
        assert!(matches!(result, Err(KeelError::InvalidState(_))));
        // Original registration unchanged.
        assert_eq!(kernel.module_version(TRSRY), Some(Version::new(1, 0)));
    }

    #[test]
    fn test_upgrade_requires_existing() {
        let mut kernel = Kernel::new();
        let result = kernel.upgrade_module(TRSRY, Version::new(1, 0));
        assert!(matches!(result, Err(KeelError::NotFound(_))));
    }

    #[test]
    fn test_activate_grants_exactly_requested() {
        let mut kernel = kernel_with_modules();
        let cap = kernel.activate_policy(make_manifest("clearinghouse")).unwrap();

        let table = kernel.permissions();
        assert!(table.require(&cap, TRSRY, "withdraw_reserves").is_ok());
        assert!(table.require(&cap, MINTR, "mint").is_ok());
        // Not requested, not granted.
        assert!(table.require(&cap, MINTR, "burn").is_err());
    }

    #[test]
    fn test_activate_missing_dependency_fails() {
        let mut kernel = Kernel::new();
        kernel.install_module(TRSRY, Version::new(1, 0)).unwrap();

        let result = kernel.activate_policy(make_manifest("clearinghouse"));
        assert!(matches!(result, Err(KeelError::NotFound(_))));
        // No partial grants.
        let table = kernel.permissions();
        assert_eq!(table.count_for(&PolicyId::new("clearinghouse")), 0);
    }

    #[test]
    fn test_activate_major_version_mismatch_fails() {
        let mut kernel = Kernel::new();
        kernel.install_module(TRSRY, Version::new(2, 0)).unwrap();
        kernel.install_module(MINTR, Version::new(1, 0)).unwrap();

        let result = kernel.activate_policy(make_manifest("clearinghouse"));
        assert!(matches!(result, Err(KeelError::Invariant(_))));
        let table = kernel.permissions();
        assert_eq!(table.count_for(&PolicyId::new("clearinghouse")), 0);
    }

    #[test]
    fn test_minor_version_difference_is_compatible() {
        let mut kernel = kernel_with_modules();
        // MINTR is at 1.2; the manifest expects major 1.
        assert!(kernel.activate_policy(make_manifest("clearinghouse")).is_ok());
    }

    #[test]
    fn test_double_activation_fails() {
        let mut kernel = kernel_with_modules();
        kernel.activate_policy(make_manifest("heart")).unwrap();
        let result = kernel.activate_policy(make_manifest("heart"));
        assert!(matches!(result, Err(KeelError::InvalidState(_))));
    }

    #[test]
    fn test_deactivate_revokes_everything() {
        let mut kernel = kernel_with_modules();
        let cap = kernel.activate_policy(make_manifest("clearinghouse")).unwrap();
        kernel
            .deactivate_policy(&PolicyId::new("clearinghouse"))
            .unwrap();

        let table = kernel.permissions();
        assert_eq!(table.count_for(&PolicyId::new("clearinghouse")), 0);
        // The retained capability token no longer authorizes anything.
        assert!(table.require(&cap, TRSRY, "withdraw_reserves").is_err());
        assert!(table.require(&cap, MINTR, "mint").is_err());
    }

    #[test]
    fn test_reactivation_after_upgrade_gate() {
        let mut kernel = kernel_with_modules();
        kernel.activate_policy(make_manifest("clearinghouse")).unwrap();

        // Major upgrade of a dependency.
        kernel.upgrade_module(TRSRY, Version::new(2, 0)).unwrap();
        kernel
            .deactivate_policy(&PolicyId::new("clearinghouse"))
            .unwrap();

        // Re-activation against the old expectation now fails the gate.
        let result = kernel.activate_policy(make_manifest("clearinghouse"));
        assert!(matches!(result, Err(KeelError::Invariant(_))));
    }
}
