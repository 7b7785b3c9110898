// crates/keel-modules/src/minter.rs
//
// Minter module (MINTR): mint and burn of the native KEEL token.
//
// Minting is double-gated: the caller needs the `mint` permission AND a
// standing mint approval balance, which decrements as it is consumed.
// Approvals are managed through separately-permissioned entry points so a
// compromised policy cannot raise its own ceiling.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::{
    floor_sub, lock_write, AccountId, Grains, KeelError, Keycode, SharedLedger, TokenId,
    TokenLedger, Version,
};
use keel_kernel::{Capability, PermissionTable, PolicyId};

/// Privileged function name: mint KEEL.
pub const FN_MINT: &str = "mint";
/// Privileged function name: burn KEEL.
pub const FN_BURN: &str = "burn";
/// Privileged function name: raise a policy's mint approval.
pub const FN_INCREASE_MINT_APPROVAL: &str = "increase_mint_approval";
/// Privileged function name: lower a policy's mint approval.
pub const FN_DECREASE_MINT_APPROVAL: &str = "decrease_mint_approval";

/// Sentinel approval meaning "unlimited": never decremented.
pub const UNLIMITED_APPROVAL: Grains = Grains::MAX;

/// The minter module.
pub struct Minter {
    permissions: Arc<PermissionTable>,
    ledger: SharedLedger,
    native: TokenId,
    approvals: HashMap<PolicyId, Grains>,
}

impl Minter {
    /// The module's registry keycode.
    pub const KEYCODE: Keycode = Keycode::from_static(*b"MINTR");

    /// The module's semantic version.
    pub const VERSION: Version = Version { major: 1, minor: 0 };

    /// Create the minter module for the native token.
    pub fn new(permissions: Arc<PermissionTable>, ledger: SharedLedger) -> Self {
        Self {
            permissions,
            ledger,
            native: TokenId::keel(),
            approvals: HashMap::new(),
        }
    }

    /// Current mint approval for a policy.
    pub fn mint_approval(&self, policy: &PolicyId) -> Grains {
        self.approvals.get(policy).copied().unwrap_or(0)
    }

    /// Mint `amount` KEEL to `to`, consuming the caller's approval.
    ///
    /// # Errors
    /// `Unauthorized` without the `mint` grant or with insufficient
    /// approval; the approval is only decremented on success.
    pub fn mint(
        &mut self,
        cap: &Capability,
        to: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_MINT)?;
        let approval = self.mint_approval(cap.policy());
        if approval < amount {
            return Err(KeelError::Unauthorized(format!(
                "policy '{}' mint approval {} is below requested {}",
                cap.policy(),
                approval,
                amount
            )));
        }
        lock_write(&self.ledger).mint(&self.native, to, amount)?;
        if approval != UNLIMITED_APPROVAL {
            self.approvals.insert(cap.policy().clone(), approval - amount);
        }
        Ok(())
    }

    /// Burn `amount` KEEL from `from`.
    pub fn burn(
        &mut self,
        cap: &Capability,
        from: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_BURN)?;
        lock_write(&self.ledger).burn(&self.native, from, amount)
    }

    /// Raise `policy`'s mint approval by `amount`.
    pub fn increase_mint_approval(
        &mut self,
        cap: &Capability,
        policy: &PolicyId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions
            .require(cap, Self::KEYCODE, FN_INCREASE_MINT_APPROVAL)?;
        let entry = self.approvals.entry(policy.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    /// Lower `policy`'s mint approval by `amount`, floor-clamped at zero.
    pub fn decrease_mint_approval(
        &mut self,
        cap: &Capability,
        policy: &PolicyId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions
            .require(cap, Self::KEYCODE, FN_DECREASE_MINT_APPROVAL)?;
        let entry = self.approvals.entry(policy.clone()).or_insert(0);
        *entry = floor_sub(*entry, amount);
        Ok(())
    }
}
