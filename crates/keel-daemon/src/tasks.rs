// crates/keel-daemon/src/tasks.rs
//
// BeatTask adapters wiring policies into the heart's sequence.
//
// Order matters: the oracle observation lands first, then the
// clearinghouse funding rebalance, then the yield-rate snapshot that
// closes the deposit facility's accounting interval.

use std::sync::{Arc, RwLock};

use keel_core::{lock_write, KeelError, PriceOracle, SharedOracle, Timestamp};
use keel_clearinghouse::Clearinghouse;
use keel_deposit::DepositFacility;
use keel_heart::BeatTask;

/// Triggers the price oracle's observation hook.
pub struct OracleUpdateTask {
    oracle: SharedOracle,
}

impl OracleUpdateTask {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }
}

impl BeatTask for OracleUpdateTask {
    fn name(&self) -> &str {
        "oracle-update"
    }

    fn run(&mut self, now: Timestamp) -> Result<(), KeelError> {
        let observed = lock_write(&self.oracle).update(now)?;
        if observed {
            tracing::debug!("oracle observation recorded at {}", now);
        }
        Ok(())
    }
}

/// Runs the clearinghouse funding rebalance; early calls are no-ops.
pub struct RebalanceTask {
    clearinghouse: Arc<RwLock<Clearinghouse>>,
}

impl RebalanceTask {
    pub fn new(clearinghouse: Arc<RwLock<Clearinghouse>>) -> Self {
        Self { clearinghouse }
    }
}

impl BeatTask for RebalanceTask {
    fn name(&self) -> &str {
        "clearinghouse-rebalance"
    }

    fn run(&mut self, now: Timestamp) -> Result<(), KeelError> {
        let ran = lock_write(&self.clearinghouse).rebalance(now)?;
        if ran {
            tracing::debug!("clearinghouse rebalanced at {}", now);
        }
        Ok(())
    }
}

/// Records the deposit facility's vault-rate snapshot for this interval.
pub struct YieldSnapshotTask {
    facility: Arc<RwLock<DepositFacility>>,
}

impl YieldSnapshotTask {
    pub fn new(facility: Arc<RwLock<DepositFacility>>) -> Self {
        Self { facility }
    }
}

impl BeatTask for YieldSnapshotTask {
    fn name(&self) -> &str {
        "yield-snapshot"
    }

    fn run(&mut self, now: Timestamp) -> Result<(), KeelError> {
        lock_write(&self.facility).record_snapshot(now)
    }
}
