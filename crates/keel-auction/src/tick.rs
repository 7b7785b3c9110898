// crates/keel-auction/src/tick.rs
//
// The auction engine's tick state and configuration.
//
// A tick is the current price/capacity pair: `capacity` deposit grains are
// sellable at `price` before the price steps up. Capacity replenishes over
// time in proportion to the daily emission target; accumulated unsold
// capacity steps the price down instead.

use serde::{Deserialize, Serialize};

use keel_core::{Grains, KeelError, Timestamp, PRICE_SCALE};

/// The auction's live price/capacity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// PRICE_SCALE-scaled price: deposit grains per whole unit of output.
    pub price: u64,
    /// Deposit grains still sellable at this price.
    pub capacity: Grains,
    /// When this state was last committed.
    pub last_update: Timestamp,
}

/// Auction engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Deposit capacity emitted per day.
    pub target: Grains,
    /// Capacity of a single tick; price steps when one is exhausted.
    pub tick_size: Grains,
    /// PRICE_SCALE-scaled step ratio, strictly above 1.0. Exhaustion
    /// multiplies the price by this ratio; a full tick of idle capacity
    /// divides it.
    pub tick_step: u64,
    /// PRICE_SCALE-scaled price floor; decay clamps here.
    pub min_price: u64,
}

impl AuctionConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `KeelError::Validation` for a zero target, zero tick size,
    /// zero floor, or a step ratio at or below 1.0.
    pub fn validate(&self) -> Result<(), KeelError> {
        if self.target == 0 {
            return Err(KeelError::Validation(
                "auction target must be non-zero".to_string(),
            ));
        }
        if self.tick_size == 0 {
            return Err(KeelError::Validation(
                "tick size must be non-zero".to_string(),
            ));
        }
        if self.min_price == 0 {
            return Err(KeelError::Validation(
                "minimum price must be non-zero".to_string(),
            ));
        }
        if self.tick_step <= PRICE_SCALE {
            return Err(KeelError::Validation(format!(
                "tick step {} must exceed {} (a ratio above 1.0)",
                self.tick_step, PRICE_SCALE
            )));
        }
        Ok(())
    }
}
