// crates/keel-clearinghouse/src/clearinghouse.rs
//
// The debt facility policy.
//
// Issues collateralized loans against the backed token, tracks aggregate
// receivables, rebalances its lending float against a treasury funding
// target on a fixed cadence, and liquidates defaulted loans with a
// time-scaled keeper reward. Receivable decrements are floor-clamped:
// external double-counting must drive them to zero, never panic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use keel_core::{
    floor_sub, lock_read, lock_write, mul_div, AccountId, Grains, KeelError, ReentrancyGate,
    SharedLedger, Timestamp, TokenId, TokenLedger, DAY_SECONDS, GRAIN_PER_KEEL, PRICE_SCALE,
};
use keel_kernel::{
    Capability, Permission, PolicyId, PolicyManifest, RoleRegistry, ROLE_EMERGENCY,
};
use keel_modules::{minter, treasury, Minter, Treasury};

use crate::loan::{collateral_for, interest_for, Loan, LoanStatus};

/// Keeper reward cap as a percentage of seized collateral.
pub const COLLATERAL_REWARD_PERCENT: u64 = 5;

/// Elapsed time after default at which the keeper reward saturates.
pub const REWARD_SATURATION: u64 = 7 * DAY_SECONDS;

/// Facility parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearinghouseConfig {
    /// PRICE_SCALE-scaled debt grains lendable per collateral grain.
    pub loan_to_collateral: u64,
    /// PRICE_SCALE-scaled annual interest rate.
    pub interest_rate: u64,
    /// Fixed loan duration in seconds.
    pub duration: u64,
    /// Reserve float the facility keeps on hand for lending.
    pub fund_target: Grains,
    /// Seconds between rebalance runs.
    pub fund_cadence: u64,
    /// Absolute cap on a single loan's keeper reward.
    pub max_reward: Grains,
}

impl Default for ClearinghouseConfig {
    fn default() -> Self {
        Self {
            loan_to_collateral: 2_500 * PRICE_SCALE,
            interest_rate: 5_000_000, // 0.5% annually
            duration: 121 * DAY_SECONDS,
            fund_target: 18_000_000 * GRAIN_PER_KEEL,
            fund_cadence: 7 * DAY_SECONDS,
            max_reward: GRAIN_PER_KEEL,
        }
    }
}

/// The debt facility.
pub struct Clearinghouse {
    capability: Capability,
    policy: PolicyId,
    treasury: Arc<RwLock<Treasury>>,
    minter: Arc<RwLock<Minter>>,
    roles: Arc<RwLock<RoleRegistry>>,
    ledger: SharedLedger,
    account: AccountId,
    collateral_token: TokenId,
    debt_token: TokenId,
    config: ClearinghouseConfig,
    principal_receivables: Grains,
    interest_receivables: Grains,
    loans: HashMap<AccountId, Vec<Loan>>,
    next_rebalance: Timestamp,
    active: bool,
    gate: Arc<ReentrancyGate>,
}

impl Clearinghouse {
    /// The policy's registered name.
    pub const POLICY: &'static str = "clearinghouse";

    /// The activation manifest declaring dependencies and permissions.
    pub fn manifest() -> PolicyManifest {
        PolicyManifest {
            policy: PolicyId::new(Self::POLICY),
            dependencies: vec![
                (Treasury::KEYCODE, Treasury::VERSION.major),
                (Minter::KEYCODE, Minter::VERSION.major),
            ],
            permissions: vec![
                Permission::new(Treasury::KEYCODE, treasury::FN_WITHDRAW_RESERVES),
                Permission::new(Treasury::KEYCODE, treasury::FN_INCREASE_DEBT),
                Permission::new(Treasury::KEYCODE, treasury::FN_REPAY_DEBT),
                Permission::new(Minter::KEYCODE, minter::FN_BURN),
            ],
        }
    }

    /// Create the facility with its kernel capability and module handles.
    pub fn new(
        capability: Capability,
        treasury: Arc<RwLock<Treasury>>,
        minter: Arc<RwLock<Minter>>,
        roles: Arc<RwLock<RoleRegistry>>,
        ledger: SharedLedger,
        config: ClearinghouseConfig,
    ) -> Self {
        Self {
            capability,
            policy: PolicyId::new(Self::POLICY),
            treasury,
            minter,
            roles,
            ledger,
            account: AccountId::from_name("keel-clearinghouse"),
            collateral_token: TokenId::keel(),
            debt_token: TokenId::reserve(),
            config,
            principal_receivables: 0,
            interest_receivables: 0,
            loans: HashMap::new(),
            next_rebalance: 0,
            active: true,
            gate: Arc::new(ReentrancyGate::new()),
        }
    }

    /// The facility's ledger account (lending float + locked collateral).
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Aggregate outstanding principal owed to the facility.
    pub fn principal_receivables(&self) -> Grains {
        self.principal_receivables
    }

    /// Aggregate outstanding interest owed to the facility.
    pub fn interest_receivables(&self) -> Grains {
        self.interest_receivables
    }

    /// Whether the facility is accepting new loans.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A borrower's loans, in issuance order.
    pub fn loans_of(&self, borrower: &AccountId) -> &[Loan] {
        self.loans.get(borrower).map(Vec::as_slice).unwrap_or(&[])
    }

    fn loan_mut(&mut self, borrower: &AccountId, loan_id: u64) -> Result<&mut Loan, KeelError> {
        self.loans
            .get_mut(borrower)
            .and_then(|loans| loans.get_mut(loan_id as usize))
            .ok_or_else(|| {
                KeelError::NotFound(format!("loan {} for {} does not exist", loan_id, borrower))
            })
    }

    fn loan_ref(&self, borrower: &AccountId, loan_id: u64) -> Result<&Loan, KeelError> {
        self.loans
            .get(borrower)
            .and_then(|loans| loans.get(loan_id as usize))
            .ok_or_else(|| {
                KeelError::NotFound(format!("loan {} for {} does not exist", loan_id, borrower))
            })
    }

    /// Issue a loan: lock collateral at the fixed ratio, pay out reserves
    /// from the facility float, and record receivables. The request is
    /// cleared immediately.
    ///
    /// # Errors
    /// - `InvalidState` after emergency shutdown.
    /// - `Validation` for a zero amount, mismatched tokens, insufficient
    ///   borrower collateral, or an underfunded float.
    pub fn lend(
        &mut self,
        borrower: &AccountId,
        collateral_token: &TokenId,
        debt_token: &TokenId,
        amount: Grains,
        now: Timestamp,
    ) -> Result<u64, KeelError> {
        let gate = Arc::clone(&self.gate);
        let _guard = gate.enter("lend")?;
        if !self.active {
            return Err(KeelError::InvalidState(
                "facility is shut down; no new loans".to_string(),
            ));
        }
        if amount == 0 {
            return Err(KeelError::Validation("cannot lend zero".to_string()));
        }
        if *collateral_token != self.collateral_token || *debt_token != self.debt_token {
            return Err(KeelError::Validation(format!(
                "token pair ({}, {}) does not match facility pair ({}, {})",
                collateral_token, debt_token, self.collateral_token, self.debt_token
            )));
        }

        let collateral = collateral_for(amount, self.config.loan_to_collateral);
        let interest = interest_for(amount, self.config.interest_rate, self.config.duration);

        let float = lock_read(&self.ledger).balance_of(&self.debt_token, &self.account);
        if float < amount {
            return Err(KeelError::Validation(format!(
                "facility float {} is below requested {}; rebalance is due",
                float, amount
            )));
        }

        {
            let mut ledger = lock_write(&self.ledger);
            ledger.transfer(&self.collateral_token, borrower, &self.account, collateral)?;
            ledger.transfer(&self.debt_token, &self.account, borrower, amount)?;
        }

        self.principal_receivables += amount;
        self.interest_receivables += interest;

        let loans = self.loans.entry(*borrower).or_default();
        let id = loans.len() as u64;
        loans.push(Loan {
            id,
            borrower: *borrower,
            principal: amount,
            interest_due: interest,
            collateral,
            expiry: now + self.config.duration,
            created_at: now,
            status: LoanStatus::Active,
        });

        tracing::info!(
            "cleared loan {} for {}: principal {}, collateral {}, interest {}",
            id,
            borrower,
            amount,
            collateral,
            interest
        );
        Ok(id)
    }

    /// Extend a loan by `times` full terms, accruing a fresh term of
    /// interest on the current principal per extension. Collateral is not
    /// re-validated: the locked ratio carries over.
    pub fn extend_loan(
        &mut self,
        borrower: &AccountId,
        loan_id: u64,
        times: u32,
        _now: Timestamp,
    ) -> Result<(), KeelError> {
        if times == 0 {
            return Err(KeelError::Validation(
                "extension must cover at least one term".to_string(),
            ));
        }
        let rate = self.config.interest_rate;
        let duration = self.config.duration;
        let loan = self.loan_mut(borrower, loan_id)?;
        if loan.status != LoanStatus::Active {
            return Err(KeelError::InvalidState(format!(
                "loan {} is not active",
                loan_id
            )));
        }

        let interest = interest_for(loan.principal, rate, duration).saturating_mul(times as u64);
        loan.interest_due += interest;
        loan.expiry += duration * times as u64;
        self.interest_receivables += interest;
        Ok(())
    }

    /// Roll a loan into a new term: accrue a fresh term of interest on the
    /// current principal and top up collateral to the issuance ratio if it
    /// has fallen short.
    pub fn roll_loan(
        &mut self,
        borrower: &AccountId,
        loan_id: u64,
        _now: Timestamp,
    ) -> Result<(), KeelError> {
        let rate = self.config.interest_rate;
        let duration = self.config.duration;
        let ltc = self.config.loan_to_collateral;
        let account = self.account;
        let collateral_token = self.collateral_token.clone();
        let ledger = Arc::clone(&self.ledger);

        let loan = self.loan_mut(borrower, loan_id)?;
        if loan.status != LoanStatus::Active {
            return Err(KeelError::InvalidState(format!(
                "loan {} is not active",
                loan_id
            )));
        }

        let needed = collateral_for(loan.principal, ltc);
        if needed > loan.collateral {
            let top_up = needed - loan.collateral;
            lock_write(&ledger).transfer(&collateral_token, borrower, &account, top_up)?;
            loan.collateral = needed;
        }

        let interest = interest_for(loan.principal, rate, duration);
        loan.interest_due += interest;
        loan.expiry += duration;
        self.interest_receivables += interest;
        Ok(())
    }

    /// Repay a loan, interest before principal. Collateral unlocks
    /// proportionally as principal is repaid; full repayment releases the
    /// rest and closes the loan.
    pub fn repay(
        &mut self,
        borrower: &AccountId,
        loan_id: u64,
        amount: Grains,
        _now: Timestamp,
    ) -> Result<(), KeelError> {
        let gate = Arc::clone(&self.gate);
        let _guard = gate.enter("repay")?;
        if amount == 0 {
            return Err(KeelError::Validation("cannot repay zero".to_string()));
        }
        let owed = {
            let loan = self.loan_ref(borrower, loan_id)?;
            if loan.status != LoanStatus::Active {
                return Err(KeelError::InvalidState(format!(
                    "loan {} is not active",
                    loan_id
                )));
            }
            loan.total_owed()
        };
        if amount > owed {
            return Err(KeelError::Validation(format!(
                "repayment {} exceeds outstanding debt {}",
                amount, owed
            )));
        }

        lock_write(&self.ledger).transfer(&self.debt_token, borrower, &self.account, amount)?;

        let ltc = self.config.loan_to_collateral;
        let account = self.account;
        let collateral_token = self.collateral_token.clone();
        let ledger = Arc::clone(&self.ledger);

        let loan = self.loan_mut(borrower, loan_id)?;
        let interest_paid = amount.min(loan.interest_due);
        let principal_paid = amount - interest_paid;
        loan.interest_due -= interest_paid;
        loan.principal -= principal_paid;

        if principal_paid > 0 {
            let target = collateral_for(loan.principal, ltc);
            let released = floor_sub(loan.collateral, target);
            if released > 0 {
                lock_write(&ledger).transfer(&collateral_token, &account, borrower, released)?;
                loan.collateral = target;
            }
        }
        if loan.principal == 0 && loan.interest_due == 0 {
            loan.status = LoanStatus::Repaid;
        }

        self.principal_receivables = floor_sub(self.principal_receivables, principal_paid);
        self.interest_receivables = floor_sub(self.interest_receivables, interest_paid);
        Ok(())
    }

    /// Batch-claim defaulted loans.
    ///
    /// Both slices must be the same length and pair up as
    /// `(borrower, loan_id)`. The whole batch is validated before any
    /// state moves (all-or-nothing). Per loan, the keeper reward is
    /// `min(5% of collateral, max_reward)` scaled linearly by time since
    /// default up to the 7-day saturation; the rest of the collateral is
    /// burned. Returns the total reward paid.
    pub fn claim_defaulted(
        &mut self,
        keeper: &AccountId,
        borrowers: &[AccountId],
        loan_ids: &[u64],
        now: Timestamp,
    ) -> Result<Grains, KeelError> {
        let gate = Arc::clone(&self.gate);
        let _guard = gate.enter("claim_defaulted")?;
        if borrowers.len() != loan_ids.len() {
            return Err(KeelError::Validation(format!(
                "batch length mismatch: {} borrowers, {} loan ids",
                borrowers.len(),
                loan_ids.len()
            )));
        }
        if borrowers.is_empty() {
            return Err(KeelError::Validation("empty claim batch".to_string()));
        }

        // Validation pass: the whole batch must be claimable before any
        // entry mutates state.
        let mut seen = HashSet::new();
        for (borrower, &loan_id) in borrowers.iter().zip(loan_ids) {
            if !seen.insert((*borrower, loan_id)) {
                return Err(KeelError::Validation(format!(
                    "loan {} for {} appears twice in batch",
                    loan_id, borrower
                )));
            }
            let loan = self.loan_ref(borrower, loan_id)?;
            if loan.status != LoanStatus::Active {
                return Err(KeelError::InvalidState(format!(
                    "loan {} for {} is not active",
                    loan_id, borrower
                )));
            }
            if !loan.is_defaulted(now) {
                return Err(KeelError::Validation(format!(
                    "loan {} for {} has not defaulted (expiry {})",
                    loan_id, borrower, loan.expiry
                )));
            }
        }

        let max_reward = self.config.max_reward;
        let mut total_principal: Grains = 0;
        let mut total_interest: Grains = 0;
        let mut total_collateral: Grains = 0;
        let mut total_reward: Grains = 0;

        for (borrower, &loan_id) in borrowers.iter().zip(loan_ids) {
            let loan = self.loan_mut(borrower, loan_id)?;
            let elapsed = now - loan.expiry;
            let max_auction_reward =
                mul_div(loan.collateral, COLLATERAL_REWARD_PERCENT, 100).min(max_reward);
            let reward = mul_div(
                max_auction_reward,
                elapsed.min(REWARD_SATURATION),
                REWARD_SATURATION,
            );

            total_principal += loan.principal;
            total_interest += loan.interest_due;
            total_collateral += loan.collateral;
            total_reward += reward;

            loan.principal = 0;
            loan.interest_due = 0;
            loan.collateral = 0;
            loan.status = LoanStatus::Defaulted;
        }

        self.principal_receivables = floor_sub(self.principal_receivables, total_principal);
        self.interest_receivables = floor_sub(self.interest_receivables, total_interest);

        // Burn the seized collateral net of the keeper's cut.
        let burned = floor_sub(total_collateral, total_reward);
        if burned > 0 {
            lock_write(&self.minter).burn(&self.capability, &self.account, burned)?;
        }
        if total_reward > 0 {
            lock_write(&self.ledger).transfer(
                &self.collateral_token,
                &self.account,
                keeper,
                total_reward,
            )?;
        }

        tracing::info!(
            "claimed {} defaulted loans: burned {} collateral, rewarded keeper {} with {}",
            borrowers.len(),
            burned,
            keeper,
            total_reward
        );
        Ok(total_reward)
    }

    /// Rebalance the lending float against the treasury funding target.
    ///
    /// A no-op (`Ok(false)`) before the next scheduled run, never an
    /// error. Under target, the shortfall is withdrawn from the treasury
    /// and recorded as facility debt; over target, the excess is returned
    /// and the debt record reduced.
    pub fn rebalance(&mut self, now: Timestamp) -> Result<bool, KeelError> {
        if now < self.next_rebalance {
            return Ok(false);
        }
        self.next_rebalance = now + self.config.fund_cadence;

        let float = lock_read(&self.ledger).balance_of(&self.debt_token, &self.account);
        let target = self.config.fund_target;

        if float < target {
            let shortfall = target - float;
            let available = lock_read(&self.treasury).reserve_balance(&self.debt_token);
            let amount = shortfall.min(available);
            if amount > 0 {
                let mut treasury = lock_write(&self.treasury);
                treasury.withdraw_reserves(&self.capability, &self.account, &self.debt_token, amount)?;
                treasury.increase_debt(&self.capability, &self.debt_token, &self.policy, amount)?;
                tracing::info!("rebalance funded facility with {} (shortfall {})", amount, shortfall);
            }
        } else if float > target {
            let excess = float - target;
            let treasury_account = lock_read(&self.treasury).account();
            lock_write(&self.ledger).transfer(
                &self.debt_token,
                &self.account,
                &treasury_account,
                excess,
            )?;
            lock_write(&self.treasury).repay_debt(
                &self.capability,
                &self.debt_token,
                &self.policy,
                excess,
            )?;
            tracing::info!("rebalance defunded {} back to treasury", excess);
        }
        Ok(true)
    }

    /// Emergency shutdown: zero the funding target and defund the float in
    /// one call. Requires the emergency role. Idempotent.
    pub fn emergency_shutdown(&mut self, caller: &AccountId) -> Result<(), KeelError> {
        lock_read(&self.roles).require_role(ROLE_EMERGENCY, caller)?;
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.config.fund_target = 0;

        let float = lock_read(&self.ledger).balance_of(&self.debt_token, &self.account);
        if float > 0 {
            let treasury_account = lock_read(&self.treasury).account();
            lock_write(&self.ledger).transfer(
                &self.debt_token,
                &self.account,
                &treasury_account,
                float,
            )?;
            lock_write(&self.treasury).repay_debt(
                &self.capability,
                &self.debt_token,
                &self.policy,
                float,
            )?;
        }
        tracing::warn!("clearinghouse emergency shutdown: defunded {}", float);
        Ok(())
    }
}
