// crates/keel-auction/src/auctioneer.rs
//
// The tick-based Dutch auction engine.
//
// Price discovery happens purely through elapsed time (decay) and realized
// demand (step-up); no oracle is consulted. The engine is stateless between
// bids except for (price, capacity, last_update): views derive the decayed
// tick lazily from elapsed time, so no keeper has to advance the clock.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use keel_core::{
    lock_write, mul_div, AccountId, Grains, KeelError, Timestamp, DAY_SECONDS, PRICE_SCALE,
};

use crate::tick::{AuctionConfig, Tick};

/// One bid fill: `deposit` grains consumed at `price`, producing `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Deposit grains consumed from the bid.
    pub deposit: Grains,
    /// PRICE_SCALE-scaled price this slice filled at.
    pub price: u64,
    /// Output grains owed for this slice.
    pub output: Grains,
}

/// The convertible-deposit seam the engine notifies per fill.
///
/// Implemented by the deposit facility: each fill opens a position for the
/// bidder at the fill's price.
pub trait ConvertibleDepositor: Send + Sync {
    /// Record a filled deposit slice for `bidder` at `conversion_price`.
    fn create(
        &mut self,
        bidder: &AccountId,
        deposit: Grains,
        conversion_price: u64,
        now: Timestamp,
    ) -> Result<(), KeelError>;
}

/// The auction engine.
pub struct Auctioneer {
    config: AuctionConfig,
    tick: Tick,
    depositor: Arc<RwLock<dyn ConvertibleDepositor>>,
}

impl Auctioneer {
    /// Create the engine at an initial price with a full first tick.
    ///
    /// # Errors
    /// Returns `KeelError::Validation` for an invalid configuration or an
    /// initial price below the floor.
    pub fn new(
        config: AuctionConfig,
        initial_price: u64,
        genesis: Timestamp,
        depositor: Arc<RwLock<dyn ConvertibleDepositor>>,
    ) -> Result<Self, KeelError> {
        config.validate()?;
        if initial_price < config.min_price {
            return Err(KeelError::Validation(format!(
                "initial price {} is below the floor {}",
                initial_price, config.min_price
            )));
        }
        let tick = Tick {
            price: initial_price,
            capacity: config.tick_size,
            last_update: genesis,
        };
        Ok(Self {
            config,
            tick,
            depositor,
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// The last committed tick state.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// The current tick as a pure function of elapsed time.
    ///
    /// Capacity replenishes at `target` per day. Each full `tick_size` of
    /// accumulated excess steps the price down by the step ratio; once the
    /// floor is hit the tick is treated as fully replenished and decay
    /// stops. Capacity never exceeds `tick_size`.
    pub fn current_tick(&self, now: Timestamp) -> Tick {
        let mut tick = self.tick;
        let elapsed = now.saturating_sub(tick.last_update);
        let mut new_capacity = mul_div(self.config.target, elapsed, DAY_SECONDS);
        tick.last_update = now;

        while tick.capacity.saturating_add(new_capacity) > self.config.tick_size {
            new_capacity -= self.config.tick_size - tick.capacity;
            tick.capacity = 0;
            tick.price = mul_div(tick.price, PRICE_SCALE, self.config.tick_step);
            if tick.price <= self.config.min_price {
                tick.price = self.config.min_price;
                tick.capacity = self.config.tick_size;
                return tick;
            }
        }
        tick.capacity += new_capacity;
        tick
    }

    /// Place a bid of `deposit` grains.
    ///
    /// Consumes the decayed current tick slice by slice: a slice that
    /// exhausts the tick's capacity steps the price up by the step ratio
    /// and refills capacity; the final slice leaves the remainder in
    /// place. Fills are computed against a working copy and committed only
    /// when the whole bid resolves, then the depositor seam is notified
    /// per fill.
    ///
    /// # Errors
    /// - `Validation` for a zero deposit.
    /// - `Invariant` if an iteration would consume zero deposit or produce
    ///   zero output (the monotonic-progress guard).
    pub fn bid(
        &mut self,
        bidder: &AccountId,
        deposit: Grains,
        now: Timestamp,
    ) -> Result<Vec<Fill>, KeelError> {
        if deposit == 0 {
            return Err(KeelError::Validation("cannot bid zero deposit".to_string()));
        }

        let mut tick = self.current_tick(now);
        let mut remaining = deposit;
        let mut fills = Vec::new();

        while remaining > 0 {
            let amount = remaining.min(tick.capacity);
            let output = mul_div(amount, PRICE_SCALE, tick.price);
            if amount == 0 || output == 0 {
                // Every iteration must strictly decrease the deposit and
                // owe a non-zero output; anything else would loop forever
                // or mint nothing for value.
                return Err(KeelError::Invariant(format!(
                    "zero-progress bid iteration: amount {}, output {} at price {}",
                    amount, output, tick.price
                )));
            }

            fills.push(Fill {
                deposit: amount,
                price: tick.price,
                output,
            });
            remaining -= amount;

            if amount == tick.capacity {
                // Tick exhausted: step the price up and refill.
                tick.price = mul_div(tick.price, self.config.tick_step, PRICE_SCALE);
                tick.capacity = self.config.tick_size;
            } else {
                tick.capacity -= amount;
            }
        }

        self.tick = tick;

        {
            let mut depositor = lock_write(&self.depositor);
            for fill in &fills {
                depositor.create(bidder, fill.deposit, fill.price, now)?;
            }
        }

        tracing::info!(
            "bid of {} by {} filled across {} ticks (closing price {})",
            deposit,
            bidder,
            fills.len(),
            tick.price
        );
        Ok(fills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every fill the engine reports.
    struct RecordingDepositor {
        created: Vec<(AccountId, Grains, u64)>,
    }

    impl RecordingDepositor {
        fn new() -> Self {
            Self { created: Vec::new() }
        }
    }

    impl ConvertibleDepositor for RecordingDepositor {
        fn create(
            &mut self,
            bidder: &AccountId,
            deposit: Grains,
            conversion_price: u64,
            _now: Timestamp,
        ) -> Result<(), KeelError> {
            self.created.push((*bidder, deposit, conversion_price));
            Ok(())
        }
    }

    fn config() -> AuctionConfig {
        AuctionConfig {
            target: 100,
            tick_size: 100,
            tick_step: 1_100_000_000, // 1.1x
            min_price: PRICE_SCALE,   // 1.0
        }
    }

    fn setup(initial_price: u64) -> (Auctioneer, Arc<RwLock<RecordingDepositor>>) {
        let depositor = Arc::new(RwLock::new(RecordingDepositor::new()));
        let auctioneer =
            Auctioneer::new(config(), initial_price, 0, depositor.clone()).unwrap();
        (auctioneer, depositor)
    }

    fn bidder() -> AccountId {
        AccountId::from_name("bidder")
    }

    #[test]
    fn test_initial_price_below_floor_rejected() {
        let depositor = Arc::new(RwLock::new(RecordingDepositor::new()));
        let result = Auctioneer::new(config(), PRICE_SCALE - 1, 0, depositor);
        assert!(result.is_err());
    }

    #[test]
    fn test_worked_example_three_tick_bid() {
        // tick_size=100, step=1.1x, start price 10: a 250 bid consumes
        // tick 1 (100 @ 10), steps to 11, consumes tick 2 (100 @ 11),
        // steps to 12.1, and applies the remaining 50 without stepping.
        let (mut auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        let fills = auctioneer.bid(&bidder(), 250, 0).unwrap();

        let amounts: Vec<Grains> = fills.iter().map(|f| f.deposit).collect();
        let prices: Vec<u64> = fills.iter().map(|f| f.price).collect();
        assert_eq!(amounts, vec![100, 100, 50]);
        assert_eq!(
            prices,
            vec![10 * PRICE_SCALE, 11 * PRICE_SCALE, 12_100_000_000]
        );

        // Partial third tick: price holds at 12.1 with 50 capacity left.
        let tick = auctioneer.tick();
        assert_eq!(tick.price, 12_100_000_000);
        assert_eq!(tick.capacity, 50);
    }

    #[test]
    fn test_fill_outputs_follow_price() {
        let (mut auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        let fills = auctioneer.bid(&bidder(), 250, 0).unwrap();
        // 100 deposit at price 10.0 owes 10 output, etc. (floor division).
        assert_eq!(fills[0].output, 10);
        assert_eq!(fills[1].output, mul_div(100, PRICE_SCALE, 11 * PRICE_SCALE));
        assert_eq!(fills[2].output, mul_div(50, PRICE_SCALE, 12_100_000_000));
    }

    #[test]
    fn test_exhaustion_strictly_increases_price() {
        let (mut auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        let mut last_price = 0;
        for _ in 0..5 {
            let before = auctioneer.current_tick(0).price;
            assert!(before > last_price);
            auctioneer.bid(&bidder(), 100, 0).unwrap();
            let after = auctioneer.current_tick(0).price;
            assert_eq!(after, mul_div(before, 1_100_000_000, PRICE_SCALE));
            last_price = before;
        }
    }

    #[test]
    fn test_depositor_notified_per_fill() {
        let (mut auctioneer, depositor) = setup(10 * PRICE_SCALE);
        auctioneer.bid(&bidder(), 250, 0).unwrap();
        let created = &depositor.read().unwrap().created;
        assert_eq!(created.len(), 3);
        assert_eq!(created[0], (bidder(), 100, 10 * PRICE_SCALE));
        assert_eq!(created[2], (bidder(), 50, 12_100_000_000));
    }

    #[test]
    fn test_idle_decay_steps_price_down() {
        let (mut auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        // Leave a partially consumed tick: 50 capacity at price 12.1.
        auctioneer.bid(&bidder(), 250, 0).unwrap();

        // One day replenishes 100: combined capacity 150 sheds one full
        // tick, stepping the price down (12.1 / 1.1 = 11.0) and leaving 50.
        let tick = auctioneer.current_tick(DAY_SECONDS);
        assert_eq!(tick.price, 11 * PRICE_SCALE);
        assert_eq!(tick.capacity, 50);
    }

    #[test]
    fn test_decay_clamps_at_floor_and_refills() {
        let (auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        // A year of idle time decays any price to the floor.
        let tick = auctioneer.current_tick(365 * DAY_SECONDS);
        assert_eq!(tick.price, PRICE_SCALE);
        assert_eq!(tick.capacity, 100);
    }

    #[test]
    fn test_idle_time_never_raises_price() {
        let (auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        let mut last = u64::MAX;
        for days in [0, 1, 2, 5, 30, 365] {
            let price = auctioneer.current_tick(days * DAY_SECONDS).price;
            assert!(price <= last);
            assert!(price >= PRICE_SCALE);
            last = price;
        }
    }

    #[test]
    fn test_view_does_not_mutate() {
        let (auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        let _ = auctioneer.current_tick(30 * DAY_SECONDS);
        assert_eq!(auctioneer.tick().price, 10 * PRICE_SCALE);
        assert_eq!(auctioneer.tick().last_update, 0);
    }

    #[test]
    fn test_zero_bid_rejected() {
        let (mut auctioneer, _depositor) = setup(10 * PRICE_SCALE);
        assert!(matches!(
            auctioneer.bid(&bidder(), 0, 0),
            Err(KeelError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_progress_iteration_is_hard_error() {
        // An extreme price makes a small slice convert to zero output;
        // the guard must fail the bid rather than loop or mint nothing.
        let depositor = Arc::new(RwLock::new(RecordingDepositor::new()));
        let config = AuctionConfig {
            target: 100,
            tick_size: 100,
            tick_step: 1_100_000_000,
            min_price: PRICE_SCALE,
        };
        let huge_price = 1_000_000_000_000_000_000; // 10^9 per unit, scaled
        let mut auctioneer = Auctioneer::new(config, huge_price, 0, depositor.clone()).unwrap();

        let result = auctioneer.bid(&bidder(), 1, 0);
        assert!(matches!(result, Err(KeelError::Invariant(_))));
        // Nothing committed, nobody notified.
        assert_eq!(auctioneer.tick().price, huge_price);
        assert!(depositor.read().unwrap().created.is_empty());
    }
}
