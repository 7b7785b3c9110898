// crates/keel-modules/src/ledger.rs
//
// In-memory token ledger implementing the TokenLedger seam.
//
// Balances are keyed by (token, account); supply is tracked per token.
// Transfers are atomic and synchronous with no callback hooks, matching
// the transfer semantics the protocol assumes of its token contracts.

use std::collections::HashMap;

use keel_core::{AccountId, Grains, KeelError, TokenId, TokenLedger};

/// An in-memory fungible-token ledger.
pub struct InMemoryLedger {
    balances: HashMap<(TokenId, AccountId), Grains>,
    supply: HashMap<TokenId, Grains>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            supply: HashMap::new(),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: &TokenId, account: &AccountId) -> Grains {
        self.balances
            .get(&(token.clone(), *account))
            .copied()
            .unwrap_or(0)
    }

    fn total_supply(&self, token: &TokenId) -> Grains {
        self.supply.get(token).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Grains,
    ) -> Result<(), KeelError> {
        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(KeelError::Validation(format!(
                "insufficient {} balance: {} has {} grains, needs {}",
                token, from, from_balance, amount
            )));
        }
        self.balances
            .insert((token.clone(), *from), from_balance - amount);
        let to_balance = self.balance_of(token, to);
        self.balances
            .insert((token.clone(), *to), to_balance + amount);
        Ok(())
    }

    fn mint(&mut self, token: &TokenId, to: &AccountId, amount: Grains) -> Result<(), KeelError> {
        let balance = self.balance_of(token, to);
        self.balances.insert((token.clone(), *to), balance + amount);
        let supply = self.total_supply(token);
        self.supply.insert(token.clone(), supply + amount);
        Ok(())
    }

    fn burn(&mut self, token: &TokenId, from: &AccountId, amount: Grains) -> Result<(), KeelError> {
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(KeelError::Validation(format!(
                "cannot burn {} grains of {}: {} holds only {}",
                amount, token, from, balance
            )));
        }
        self.balances.insert((token.clone(), *from), balance - amount);
        let supply = self.total_supply(token);
        self.supply.insert(token.clone(), supply.saturating_sub(amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::GRAIN_PER_KEEL;

    fn alice() -> AccountId {
        AccountId::from_name("alice")
    }

    fn bob() -> AccountId {
        AccountId::from_name("bob")
    }

    #[test]
    fn test_mint_and_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger
            .mint(&TokenId::keel(), &alice(), 5 * GRAIN_PER_KEEL)
            .unwrap();
        assert_eq!(ledger.balance_of(&TokenId::keel(), &alice()), 5 * GRAIN_PER_KEEL);
        assert_eq!(ledger.total_supply(&TokenId::keel()), 5 * GRAIN_PER_KEEL);
    }

    #[test]
    fn test_transfer() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TokenId::reserve(), &alice(), 100).unwrap();
        ledger
            .transfer(&TokenId::reserve(), &alice(), &bob(), 40)
            .unwrap();
        assert_eq!(ledger.balance_of(&TokenId::reserve(), &alice()), 60);
        assert_eq!(ledger.balance_of(&TokenId::reserve(), &bob()), 40);
    }

    #[test]
    fn test_transfer_insufficient_fails() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TokenId::reserve(), &alice(), 10).unwrap();
        let result = ledger.transfer(&TokenId::reserve(), &alice(), &bob(), 11);
        assert!(matches!(result, Err(KeelError::Validation(_))));
        // No partial mutation.
        assert_eq!(ledger.balance_of(&TokenId::reserve(), &alice()), 10);
        assert_eq!(ledger.balance_of(&TokenId::reserve(), &bob()), 0);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TokenId::keel(), &alice(), 100).unwrap();
        ledger.burn(&TokenId::keel(), &alice(), 30).unwrap();
        assert_eq!(ledger.balance_of(&TokenId::keel(), &alice()), 70);
        assert_eq!(ledger.total_supply(&TokenId::keel()), 70);
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TokenId::keel(), &alice(), 10).unwrap();
        assert!(ledger.burn(&TokenId::keel(), &alice(), 11).is_err());
    }

    #[test]
    fn test_tokens_are_independent() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TokenId::keel(), &alice(), 7).unwrap();
        assert_eq!(ledger.balance_of(&TokenId::reserve(), &alice()), 0);
    }
}
