// crates/keel-modules/src/vault.rs
//
// SharesVault: an in-memory ERC-4626-style yield vault.
//
// Shares are minted pro-rata against total assets; yield accrual moves the
// share/asset exchange rate by growing total_assets without minting shares.
// Withdrawal previews round shares up (against the withdrawer), redemption
// rounds assets down.

use keel_core::{mul_div, mul_div_up, Grains, KeelError, YieldVault, PRICE_SCALE};

/// An in-memory share/asset vault with a movable exchange rate.
pub struct SharesVault {
    total_assets: Grains,
    total_shares: Grains,
}

impl SharesVault {
    /// Create an empty vault (1:1 exchange rate until first accrual).
    pub fn new() -> Self {
        Self {
            total_assets: 0,
            total_shares: 0,
        }
    }

    /// Accrue yield: grow total assets without minting shares, raising the
    /// share/asset rate for all holders.
    pub fn accrue(&mut self, assets: Grains) {
        self.total_assets = self.total_assets.saturating_add(assets);
    }

    /// Current exchange rate: assets per PRICE_SCALE shares.
    ///
    /// An empty vault reports 1:1.
    pub fn rate(&self) -> u64 {
        if self.total_shares == 0 {
            PRICE_SCALE
        } else {
            mul_div(PRICE_SCALE, self.total_assets, self.total_shares)
        }
    }

    /// Total shares outstanding.
    pub fn total_shares(&self) -> Grains {
        self.total_shares
    }
}

impl Default for SharesVault {
    fn default() -> Self {
        Self::new()
    }
}

impl YieldVault for SharesVault {
    fn deposit(&mut self, assets: Grains) -> Result<Grains, KeelError> {
        if assets == 0 {
            return Err(KeelError::Validation("cannot deposit zero assets".to_string()));
        }
        let shares = if self.total_shares == 0 {
            assets
        } else {
            mul_div(assets, self.total_shares, self.total_assets)
        };
        self.total_assets += assets;
        self.total_shares += shares;
        Ok(shares)
    }

    fn withdraw(&mut self, assets: Grains) -> Result<Grains, KeelError> {
        if assets > self.total_assets {
            return Err(KeelError::Validation(format!(
                "vault holds {} assets, cannot withdraw {}",
                self.total_assets, assets
            )));
        }
        let shares = self.preview_withdraw(assets);
        self.total_assets -= assets;
        self.total_shares = self.total_shares.saturating_sub(shares);
        Ok(shares)
    }

    fn redeem(&mut self, shares: Grains) -> Result<Grains, KeelError> {
        if shares > self.total_shares {
            return Err(KeelError::Validation(format!(
                "vault has {} shares, cannot redeem {}",
                self.total_shares, shares
            )));
        }
        let assets = self.preview_redeem(shares);
        self.total_shares -= shares;
        self.total_assets -= assets;
        Ok(assets)
    }

    fn convert_to_assets(&self, shares: Grains) -> Grains {
        if self.total_shares == 0 {
            shares
        } else {
            mul_div(shares, self.total_assets, self.total_shares)
        }
    }

    fn preview_withdraw(&self, assets: Grains) -> Grains {
        if self.total_assets == 0 {
            0
        } else {
            mul_div_up(assets, self.total_shares, self.total_assets)
        }
    }

    fn preview_redeem(&self, shares: Grains) -> Grains {
        self.convert_to_assets(shares)
    }

    fn total_assets(&self) -> Grains {
        self.total_assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_deposit_is_one_to_one() {
        let mut vault = SharesVault::new();
        let shares = vault.deposit(1_000).unwrap();
        assert_eq!(shares, 1_000);
        assert_eq!(vault.rate(), PRICE_SCALE);
    }

    #[test]
    fn test_zero_deposit_fails() {
        let mut vault = SharesVault::new();
        assert!(vault.deposit(0).is_err());
    }

    #[test]
    fn test_accrual_raises_rate() {
        let mut vault = SharesVault::new();
        vault.deposit(1_000).unwrap();
        vault.accrue(100);
        // 1100 assets / 1000 shares = 1.1x
        assert_eq!(vault.rate(), 1_100_000_000);
        assert_eq!(vault.convert_to_assets(1_000), 1_100);
    }

    #[test]
    fn test_deposit_after_accrual_mints_fewer_shares() {
        let mut vault = SharesVault::new();
        vault.deposit(1_000).unwrap();
        vault.accrue(1_000); // rate now 2.0
        let shares = vault.deposit(1_000).unwrap();
        assert_eq!(shares, 500);
    }

    #[test]
    fn test_withdraw_burns_rounded_up_shares() {
        let mut vault = SharesVault::new();
        vault.deposit(1_000).unwrap();
        vault.accrue(500); // 1500 assets, 1000 shares
        let shares = vault.withdraw(100).unwrap();
        // 100 * 1000 / 1500 = 66.67 -> 67 shares burned
        assert_eq!(shares, 67);
        assert_eq!(vault.total_assets(), 1_400);
        assert_eq!(vault.total_shares(), 933);
    }

    #[test]
    fn test_withdraw_beyond_assets_fails() {
        let mut vault = SharesVault::new();
        vault.deposit(100).unwrap();
        assert!(vault.withdraw(101).is_err());
    }

    #[test]
    fn test_redeem_releases_assets() {
        let mut vault = SharesVault::new();
        vault.deposit(1_000).unwrap();
        vault.accrue(1_000);
        let assets = vault.redeem(500).unwrap();
        assert_eq!(assets, 1_000);
        assert_eq!(vault.total_shares(), 500);
        assert_eq!(vault.total_assets(), 1_000);
    }

    #[test]
    fn test_empty_vault_rate_is_unit() {
        let vault = SharesVault::new();
        assert_eq!(vault.rate(), PRICE_SCALE);
        assert_eq!(vault.convert_to_assets(42), 42);
    }
}
