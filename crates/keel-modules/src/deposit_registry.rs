// crates/keel-modules/src/deposit_registry.rs
//
// Deposit registry module (CDEPO): receipt-token liabilities versus vault
// shares, per (asset, operator) pair.
//
// Operators (policies) sweep assets into a yield vault and issue receipt
// tokens 1:1 against them. The registry tracks both sides and enforces the
// solvency invariant on every withdrawal: the shares remaining after the
// withdrawal must still redeem for at least the remaining liabilities.
// A violation is a hard error before any state moves, never a clamp.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::{
    floor_sub, lock_read, lock_write, AccountId, Grains, KeelError, Keycode, SharedLedger,
    SharedVault, TokenId, TokenLedger, Version, YieldVault, PRICE_SCALE,
};
use keel_kernel::{Capability, PermissionTable, PolicyId};

/// Privileged function name: sweep assets into the vault, issue receipts.
pub const FN_SWEEP: &str = "sweep";
/// Privileged function name: withdraw assets out of the vault.
pub const FN_WITHDRAW: &str = "withdraw";
/// Privileged function name: burn receipts, reducing liabilities.
pub const FN_BURN_RECEIPTS: &str = "burn_receipts";

/// One (asset, operator) accounting entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultEntry {
    /// Receipt tokens issued against this entry (asset-denominated).
    pub liabilities: Grains,
    /// Vault shares deposited for this entry.
    pub shares: Grains,
}

/// The deposit registry module.
pub struct DepositRegistry {
    permissions: Arc<PermissionTable>,
    ledger: SharedLedger,
    account: AccountId,
    vaults: HashMap<TokenId, SharedVault>,
    entries: HashMap<(TokenId, PolicyId), VaultEntry>,
}

impl DepositRegistry {
    /// The module's registry keycode.
    pub const KEYCODE: Keycode = Keycode::from_static(*b"CDEPO");

    /// The module's semantic version.
    pub const VERSION: Version = Version { major: 1, minor: 0 };

    /// Create the deposit registry.
    pub fn new(permissions: Arc<PermissionTable>, ledger: SharedLedger) -> Self {
        Self {
            permissions,
            ledger,
            account: AccountId::from_name("keel-deposit-registry"),
            vaults: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Wire the yield vault backing an asset. Wiring-time configuration.
    pub fn add_vault(&mut self, asset: TokenId, vault: SharedVault) {
        self.vaults.insert(asset, vault);
    }

    /// The registry's custody account on the ledger.
    pub fn account(&self) -> AccountId {
        self.account
    }

    fn vault(&self, asset: &TokenId) -> Result<&SharedVault, KeelError> {
        self.vaults
            .get(asset)
            .ok_or_else(|| KeelError::NotFound(format!("no vault wired for asset {}", asset)))
    }

    /// The accounting entry for an (asset, operator) pair.
    pub fn entry(&self, asset: &TokenId, operator: &PolicyId) -> VaultEntry {
        self.entries
            .get(&(asset.clone(), operator.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Assets currently redeemable for an entry's shares.
    pub fn redeemable_assets(&self, asset: &TokenId, operator: &PolicyId) -> Result<Grains, KeelError> {
        let entry = self.entry(asset, operator);
        let vault = self.vault(asset)?;
        Ok(lock_read(vault).convert_to_assets(entry.shares))
    }

    /// Current vault exchange rate for an asset: assets per PRICE_SCALE
    /// shares. An empty vault reports 1:1.
    pub fn vault_rate(&self, asset: &TokenId) -> Result<u64, KeelError> {
        let vault = self.vault(asset)?;
        Ok(lock_read(vault).convert_to_assets(PRICE_SCALE))
    }

    /// Assets withdrawable beyond the entry's liability backing.
    ///
    /// Computed in share terms with withdrawal rounding applied, so a
    /// withdrawal of exactly this amount always passes the solvency check.
    pub fn surplus_assets(&self, asset: &TokenId, operator: &PolicyId) -> Result<Grains, KeelError> {
        let entry = self.entry(asset, operator);
        let vault = self.vault(asset)?;
        let vault = lock_read(vault);
        let backing_shares = vault.preview_withdraw(entry.liabilities);
        let surplus_shares = floor_sub(entry.shares, backing_shares);
        Ok(vault.preview_redeem(surplus_shares))
    }

    /// Sweep `amount` of `asset` from `from` into the vault and issue
    /// receipt tokens 1:1 to `from`.
    pub fn sweep(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        operator: &PolicyId,
        from: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_SWEEP)?;
        if amount == 0 {
            return Err(KeelError::Validation("cannot sweep zero assets".to_string()));
        }
        let vault = Arc::clone(self.vault(asset)?);

        lock_write(&self.ledger).transfer(asset, from, &self.account, amount)?;
        let shares = lock_write(&vault).deposit(amount)?;

        let entry = self
            .entries
            .entry((asset.clone(), operator.clone()))
            .or_default();
        entry.shares += shares;
        entry.liabilities += amount;

        let receipt = TokenId::cd(asset);
        lock_write(&self.ledger).mint(&receipt, from, amount)
    }

    /// Burn `amount` receipt tokens from `from`, reducing the entry's
    /// liabilities (floor-clamped). The vault backing stays put; this is
    /// the conversion path where backing is retained by the protocol.
    pub fn burn_receipts(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        operator: &PolicyId,
        from: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions
            .require(cap, Self::KEYCODE, FN_BURN_RECEIPTS)?;
        let receipt = TokenId::cd(asset);
        lock_write(&self.ledger).burn(&receipt, from, amount)?;
        let entry = self
            .entries
            .entry((asset.clone(), operator.clone()))
            .or_default();
        entry.liabilities = floor_sub(entry.liabilities, amount);
        Ok(())
    }

    /// Withdraw `assets` from the vault to `to`.
    ///
    /// Solvency is checked before anything moves: the shares remaining
    /// after this withdrawal must still redeem for at least the entry's
    /// remaining liabilities.
    ///
    /// # Errors
    /// - `Validation` if the entry holds too few shares.
    /// - `Invariant` if the withdrawal would leave the entry insolvent.
    pub fn withdraw(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        operator: &PolicyId,
        to: &AccountId,
        assets: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_WITHDRAW)?;
        let vault = Arc::clone(self.vault(asset)?);
        let entry_key = (asset.clone(), operator.clone());
        let entry = self.entries.get(&entry_key).copied().unwrap_or_default();

        let shares_needed = lock_read(&vault).preview_withdraw(assets);
        if shares_needed > entry.shares {
            return Err(KeelError::Validation(format!(
                "entry for ({}, {}) holds {} shares, withdrawal needs {}",
                asset, operator, entry.shares, shares_needed
            )));
        }

        let remaining_shares = entry.shares - shares_needed;
        let redeemable = lock_read(&vault).convert_to_assets(remaining_shares);
        if redeemable < entry.liabilities {
            return Err(KeelError::Invariant(format!(
                "withdrawal of {} {} would leave ({}, {}) insolvent: \
                 {} redeemable against {} liabilities",
                assets, asset, asset, operator, redeemable, entry.liabilities
            )));
        }

        let shares_burned = lock_write(&vault).withdraw(assets)?;
        let entry = self.entries.entry(entry_key).or_default();
        entry.shares = floor_sub(entry.shares, shares_burned);
        lock_write(&self.ledger).transfer(asset, &self.account, to, assets)
    }
}
