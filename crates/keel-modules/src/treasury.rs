// crates/keel-modules/src/treasury.rs
//
// Treasury module (TRSRY): reserve asset custody and policy debt records.
//
// The treasury holds reserve assets at its own ledger account. Policies
// withdraw reserves and record the withdrawal as debt owed back to the
// treasury; repayment reduces the record. Every mutating entry point is
// gated by the kernel's permission table.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::{
    floor_sub, lock_read, lock_write, AccountId, Grains, KeelError, Keycode, SharedLedger,
    TokenId, TokenLedger, Version,
};
use keel_kernel::{Capability, PermissionTable, PolicyId};

/// Privileged function name: withdraw reserve assets.
pub const FN_WITHDRAW_RESERVES: &str = "withdraw_reserves";
/// Privileged function name: record new policy debt.
pub const FN_INCREASE_DEBT: &str = "increase_debt";
/// Privileged function name: reduce policy debt.
pub const FN_REPAY_DEBT: &str = "repay_debt";
/// Privileged function name: overwrite a policy debt record.
pub const FN_SET_DEBT: &str = "set_debt";

/// The treasury module.
pub struct Treasury {
    permissions: Arc<PermissionTable>,
    ledger: SharedLedger,
    account: AccountId,
    /// Outstanding debt per (asset, debtor policy).
    debt: HashMap<(TokenId, PolicyId), Grains>,
}

impl Treasury {
    /// The module's registry keycode.
    pub const KEYCODE: Keycode = Keycode::from_static(*b"TRSRY");

    /// The module's semantic version.
    pub const VERSION: Version = Version { major: 1, minor: 0 };

    /// Create the treasury module.
    pub fn new(permissions: Arc<PermissionTable>, ledger: SharedLedger) -> Self {
        Self {
            permissions,
            ledger,
            account: AccountId::from_name("keel-treasury"),
            debt: HashMap::new(),
        }
    }

    /// The treasury's ledger account. Deposits are plain transfers to it.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Current reserve balance held in `asset`.
    pub fn reserve_balance(&self, asset: &TokenId) -> Grains {
        lock_read(&self.ledger).balance_of(asset, &self.account)
    }

    /// Withdraw reserves to `to`.
    ///
    /// # Errors
    /// `Unauthorized` without the `withdraw_reserves` grant; `Validation`
    /// if the treasury balance is insufficient.
    pub fn withdraw_reserves(
        &mut self,
        cap: &Capability,
        to: &AccountId,
        asset: &TokenId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions
            .require(cap, Self::KEYCODE, FN_WITHDRAW_RESERVES)?;
        let balance = self.reserve_balance(asset);
        if balance < amount {
            return Err(KeelError::Validation(format!(
                "treasury holds {} grains of {}, cannot withdraw {}",
                balance, asset, amount
            )));
        }
        lock_write(&self.ledger).transfer(asset, &self.account, to, amount)
    }

    /// Record `amount` of new debt owed by `debtor` in `asset`.
    pub fn increase_debt(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        debtor: &PolicyId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions
            .require(cap, Self::KEYCODE, FN_INCREASE_DEBT)?;
        let entry = self
            .debt
            .entry((asset.clone(), debtor.clone()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    /// Reduce `debtor`'s debt record by `amount`, floor-clamped at zero.
    pub fn repay_debt(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        debtor: &PolicyId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_REPAY_DEBT)?;
        let entry = self
            .debt
            .entry((asset.clone(), debtor.clone()))
            .or_insert(0);
        *entry = floor_sub(*entry, amount);
        Ok(())
    }

    /// Overwrite `debtor`'s debt record (governance write-off path).
    pub fn set_debt(
        &mut self,
        cap: &Capability,
        asset: &TokenId,
        debtor: &PolicyId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_SET_DEBT)?;
        self.debt.insert((asset.clone(), debtor.clone()), amount);
        Ok(())
    }

    /// Outstanding debt owed by `debtor` in `asset`.
    pub fn debt_of(&self, asset: &TokenId, debtor: &PolicyId) -> Grains {
        self.debt
            .get(&(asset.clone(), debtor.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total outstanding debt across all debtors in `asset`.
    pub fn total_debt(&self, asset: &TokenId) -> Grains {
        self.debt
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, amount)| amount)
            .sum()
    }
}
