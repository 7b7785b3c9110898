// crates/keel-core/src/traits.rs

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::amount::{Grains, Timestamp};
use crate::error::KeelError;
use crate::id::{AccountId, TokenId};

/// Trait for fungible-token transfer/mint/burn/balance semantics.
///
/// The protocol assumes atomic, synchronous transfer semantics with no
/// callback re-entrancy. Implemented by keel-modules (InMemoryLedger).
pub trait TokenLedger: Send + Sync {
    /// Balance of `account` in `token`, in grains.
    fn balance_of(&self, token: &TokenId, account: &AccountId) -> Grains;

    /// Total minted supply of `token`, in grains.
    fn total_supply(&self, token: &TokenId) -> Grains;

    /// Move `amount` of `token` from `from` to `to`.
    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError>;

    /// Mint `amount` of `token` to `to`.
    fn mint(&mut self, token: &TokenId, to: &AccountId, amount: Grains) -> Result<(), KeelError>;

    /// Burn `amount` of `token` from `from`.
    fn burn(&mut self, token: &TokenId, from: &AccountId, amount: Grains) -> Result<(), KeelError>;
}

/// Trait for an ERC-4626-style yield vault.
///
/// The protocol treats these as deterministic pure functions of vault state
/// at call time. Implemented by keel-modules (SharesVault).
pub trait YieldVault: Send + Sync {
    /// Deposit `assets`, returning the shares minted.
    fn deposit(&mut self, assets: Grains) -> Result<Grains, KeelError>;

    /// Withdraw exactly `assets`, returning the shares burned.
    fn withdraw(&mut self, assets: Grains) -> Result<Grains, KeelError>;

    /// Redeem exactly `shares`, returning the assets released.
    fn redeem(&mut self, shares: Grains) -> Result<Grains, KeelError>;

    /// Assets currently redeemable for `shares` (pure ratio, no mutation).
    fn convert_to_assets(&self, shares: Grains) -> Grains;

    /// Shares that a withdrawal of `assets` would burn.
    fn preview_withdraw(&self, assets: Grains) -> Grains;

    /// Assets that a redemption of `shares` would release.
    fn preview_redeem(&self, shares: Grains) -> Grains;

    /// Total assets under management.
    fn total_assets(&self) -> Grains;
}

/// Trait for the price oracle / moving-average module.
///
/// The protocol only consumes the observation frequency and triggers the
/// update hook; oracle internals are out of scope.
pub trait PriceOracle: Send + Sync {
    /// Seconds between observations; the heartbeat derives its frequency
    /// from this value.
    fn observation_frequency(&self) -> u64;

    /// Record an observation if one is due. Returns whether an observation
    /// was taken.
    fn update(&mut self, now: Timestamp) -> Result<bool, KeelError>;
}

/// Shared handle to a token ledger.
pub type SharedLedger = Arc<RwLock<dyn TokenLedger>>;

/// Shared handle to a yield vault.
pub type SharedVault = Arc<RwLock<dyn YieldVault>>;

/// Shared handle to a price oracle.
pub type SharedOracle = Arc<RwLock<dyn PriceOracle>>;

/// Read-lock a shared handle, recovering from poisoning.
///
/// Protocol state is only mutated under `&mut` methods; a poisoned lock
/// means a panic mid-mutation elsewhere, and the recovered guard still
/// observes a consistent snapshot for read paths.
pub fn lock_read<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock a shared handle, recovering from poisoning.
pub fn lock_write<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
