// crates/keel-modules/src/positions.rs
//
// Position book module (CDPOS): convertible-deposit position records.
//
// A position carries its owner's conversion rights: how much deposit
// remains, at what price it converts, and until when. Positions are
// created by the deposit facility, consumed by convert/reclaim, and
// terminal once remaining_deposit reaches zero.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keel_core::{AccountId, Grains, KeelError, Keycode, Timestamp, TokenId, Version};
use keel_kernel::{Capability, PermissionTable};

/// Privileged function name: create a position.
pub const FN_CREATE: &str = "create";
/// Privileged function name: decrease a position's remaining deposit.
pub const FN_DECREASE: &str = "decrease";

/// Conversion-price sentinel marking a position as unconvertible
/// (reclaim-only exit).
pub const UNCONVERTIBLE: u64 = u64::MAX;

/// A convertible-deposit position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier (UUID v7 for time-ordering).
    pub id: Uuid,
    /// The position's owner.
    pub owner: AccountId,
    /// The receipt token this position draws on.
    pub cd_token: TokenId,
    /// Deposit amount still attached to this position.
    pub remaining_deposit: Grains,
    /// PRICE_SCALE-scaled conversion price, or UNCONVERTIBLE.
    pub conversion_price: u64,
    /// Conversion rights lapse at this time.
    pub expiry: Timestamp,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl Position {
    /// Whether the conversion window has lapsed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiry
    }

    /// Whether this position carries conversion rights at all.
    pub fn is_convertible(&self) -> bool {
        self.conversion_price != UNCONVERTIBLE
    }
}

/// The position book module.
pub struct PositionBook {
    permissions: Arc<PermissionTable>,
    positions: HashMap<Uuid, Position>,
    by_owner: HashMap<AccountId, Vec<Uuid>>,
}

impl PositionBook {
    /// The module's registry keycode.
    pub const KEYCODE: Keycode = Keycode::from_static(*b"CDPOS");

    /// The module's semantic version.
    pub const VERSION: Version = Version { major: 1, minor: 0 };

    /// Create an empty position book.
    pub fn new(permissions: Arc<PermissionTable>) -> Self {
        Self {
            permissions,
            positions: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// Open a position.
    ///
    /// # Errors
    /// `Validation` for a zero amount, a zero conversion price, or an
    /// expiry not in the future.
    pub fn create(
        &mut self,
        cap: &Capability,
        owner: AccountId,
        cd_token: TokenId,
        amount: Grains,
        conversion_price: u64,
        expiry: Timestamp,
        now: Timestamp,
    ) -> Result<Uuid, KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_CREATE)?;
        if amount == 0 {
            return Err(KeelError::Validation(
                "cannot open a position with zero deposit".to_string(),
            ));
        }
        if conversion_price == 0 {
            return Err(KeelError::Validation(
                "conversion price must be non-zero (use the unconvertible sentinel)".to_string(),
            ));
        }
        if expiry <= now {
            return Err(KeelError::Validation(format!(
                "expiry {} is not after now {}",
                expiry, now
            )));
        }

        let id = Uuid::now_v7();
        let position = Position {
            id,
            owner,
            cd_token,
            remaining_deposit: amount,
            conversion_price,
            expiry,
            created_at: now,
        };
        self.positions.insert(id, position);
        self.by_owner.entry(owner).or_default().push(id);
        Ok(id)
    }

    /// Decrease a position's remaining deposit.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `Validation` if `amount` exceeds the
    /// remaining deposit.
    pub fn decrease(&mut self, cap: &Capability, id: &Uuid, amount: Grains) -> Result<(), KeelError> {
        self.permissions.require(cap, Self::KEYCODE, FN_DECREASE)?;
        let position = self
            .positions
            .get_mut(id)
            .ok_or_else(|| KeelError::NotFound(format!("position {} does not exist", id)))?;
        if amount > position.remaining_deposit {
            return Err(KeelError::Validation(format!(
                "position {} holds {} grains, cannot consume {}",
                id, position.remaining_deposit, amount
            )));
        }
        position.remaining_deposit -= amount;
        Ok(())
    }

    /// Look up a position by id.
    pub fn get(&self, id: &Uuid) -> Result<&Position, KeelError> {
        self.positions
            .get(id)
            .ok_or_else(|| KeelError::NotFound(format!("position {} does not exist", id)))
    }

    /// All positions belonging to an owner, in creation order.
    pub fn positions_of(&self, owner: &AccountId) -> Vec<&Position> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.positions.get(id)).collect())
            .unwrap_or_default()
    }
}
