// crates/keel-heart/src/heart.rs
//
// The heartbeat orchestrator.
//
// A single external entry point, callable by any keeper, that sequences
// dependent policy updates in a fixed order and auctions the call off via
// a linearly increasing reward. The schedule snaps to exact frequency
// multiples from genesis: a late beat does not let the next fire early,
// and a skipped beat is absorbed without drift.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use keel_core::{
    lock_read, lock_write, mul_div, AccountId, Grains, KeelError, Timestamp, GRAIN_PER_KEEL,
};
use keel_kernel::{
    Capability, Permission, PolicyId, PolicyManifest, RoleRegistry, ROLE_EMERGENCY,
};
use keel_modules::{minter, Minter};

/// One step of the beat sequence.
///
/// Steps run in registration order within a single beat; a failing step
/// aborts the whole beat (no schedule update, no reward). Implementations
/// must be internally all-or-nothing.
pub trait BeatTask: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Execute the step.
    fn run(&mut self, now: Timestamp) -> Result<(), KeelError>;
}

/// Heart parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartConfig {
    /// Reward minted to the keeper at full auction saturation.
    pub max_reward: Grains,
    /// Seconds over which the reward ramps from zero to `max_reward`.
    pub auction_duration: u64,
}

impl Default for HeartConfig {
    fn default() -> Self {
        Self {
            max_reward: GRAIN_PER_KEEL,
            auction_duration: 600,
        }
    }
}

/// The heartbeat orchestrator.
pub struct Heart {
    capability: Capability,
    minter: Arc<RwLock<Minter>>,
    roles: Arc<RwLock<RoleRegistry>>,
    frequency: u64,
    last_beat: Timestamp,
    active: bool,
    tasks: Vec<Box<dyn BeatTask>>,
    config: HeartConfig,
}

impl Heart {
    /// The policy's registered name.
    pub const POLICY: &'static str = "heart";

    /// The activation manifest declaring dependencies and permissions.
    pub fn manifest() -> PolicyManifest {
        PolicyManifest {
            policy: PolicyId::new(Self::POLICY),
            dependencies: vec![(Minter::KEYCODE, Minter::VERSION.major)],
            permissions: vec![Permission::new(Minter::KEYCODE, minter::FN_MINT)],
        }
    }

    /// Create the heart.
    ///
    /// `frequency` is derived from the oracle's observation interval at
    /// wiring time; `genesis` seeds the schedule.
    ///
    /// # Errors
    /// Returns `KeelError::Validation` for a zero frequency or a zero
    /// auction duration.
    pub fn new(
        capability: Capability,
        minter: Arc<RwLock<Minter>>,
        roles: Arc<RwLock<RoleRegistry>>,
        frequency: u64,
        config: HeartConfig,
        genesis: Timestamp,
    ) -> Result<Self, KeelError> {
        if frequency == 0 {
            return Err(KeelError::Validation(
                "beat frequency must be non-zero".to_string(),
            ));
        }
        if config.auction_duration == 0 {
            return Err(KeelError::Validation(
                "reward auction duration must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            capability,
            minter,
            roles,
            frequency,
            last_beat: genesis,
            active: true,
            tasks: Vec::new(),
            config,
        })
    }

    /// Append a step to the beat sequence. Order of registration is the
    /// order of execution.
    pub fn add_task(&mut self, task: Box<dyn BeatTask>) {
        self.tasks.push(task);
    }

    /// Seconds between beats.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// The last committed beat time.
    pub fn last_beat(&self) -> Timestamp {
        self.last_beat
    }

    /// Whether beating is enabled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a beat is due at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.active && now >= self.last_beat + self.frequency
    }

    /// The keeper reward a beat at `now` would pay: zero until the beat is
    /// due, then a linear ramp to `max_reward` over the auction duration,
    /// flat thereafter.
    pub fn current_reward(&self, now: Timestamp) -> Grains {
        if !self.active {
            return 0;
        }
        let due = self.last_beat + self.frequency;
        if now < due {
            return 0;
        }
        let elapsed = now - due;
        if elapsed >= self.config.auction_duration {
            self.config.max_reward
        } else {
            mul_div(self.config.max_reward, elapsed, self.config.auction_duration)
        }
    }

    /// Beat: run the task sequence in order, snap the schedule to the
    /// prior frequency multiple, and mint the keeper their reward.
    /// Returns the reward paid.
    ///
    /// # Errors
    /// - `InvalidState` while beating is disabled or before the deadline.
    /// - Any task error aborts the beat: no schedule update, no reward.
    pub fn beat(&mut self, keeper: &AccountId, now: Timestamp) -> Result<Grains, KeelError> {
        if !self.active {
            return Err(KeelError::InvalidState("beating is disabled".to_string()));
        }
        if now < self.last_beat + self.frequency {
            return Err(KeelError::InvalidState(format!(
                "beat not due until {} (now {})",
                self.last_beat + self.frequency,
                now
            )));
        }

        for task in &mut self.tasks {
            if let Err(e) = task.run(now) {
                tracing::warn!("beat task '{}' failed: {}", task.name(), e);
                return Err(e);
            }
        }

        let reward = self.current_reward(now);
        // Snap to the prior multiple of frequency so a late beat does not
        // let the next one fire early.
        self.last_beat = now - ((now - self.last_beat) % self.frequency);
        if reward > 0 {
            lock_write(&self.minter).mint(&self.capability, keeper, reward)?;
        }

        tracing::info!(
            "beat at {} by {}: {} tasks, reward {}",
            now,
            keeper,
            self.tasks.len(),
            reward
        );
        Ok(reward)
    }

    /// Enable or disable beating. Requires the emergency role.
    pub fn toggle_beat(&mut self, caller: &AccountId, active: bool) -> Result<(), KeelError> {
        lock_read(&self.roles).require_role(ROLE_EMERGENCY, caller)?;
        self.active = active;
        tracing::warn!("beating {}", if active { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Re-seed the schedule so the next beat is due immediately.
    /// Requires the emergency role; used after a pause.
    pub fn reset_beat(&mut self, caller: &AccountId, now: Timestamp) -> Result<(), KeelError> {
        lock_read(&self.roles).require_role(ROLE_EMERGENCY, caller)?;
        self.last_beat = now.saturating_sub(self.frequency);
        Ok(())
    }
}
