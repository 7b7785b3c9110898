// crates/keel-daemon/src/config.rs
//
// Runtime configuration for the Keel Protocol daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use keel_core::{GRAIN_PER_KEEL, PRICE_SCALE};

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct KeelConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reserve grains minted to the treasury at startup.
    #[serde(default = "default_genesis_reserves")]
    pub genesis_reserves: u64,

    /// Oracle observation frequency in seconds; the heart derives its
    /// beat cadence from this value.
    #[serde(default = "default_oracle_frequency")]
    pub oracle_frequency: u64,

    /// Keeper reward at full auction saturation, in grains.
    #[serde(default = "default_heart_max_reward")]
    pub heart_max_reward: u64,

    /// Seconds over which the beat reward ramps to its maximum.
    #[serde(default = "default_heart_auction_duration")]
    pub heart_auction_duration: u64,

    /// Auction deposit capacity emitted per day, in grains.
    #[serde(default = "default_auction_target")]
    pub auction_target: u64,

    /// Capacity of a single auction tick, in grains.
    #[serde(default = "default_auction_tick_size")]
    pub auction_tick_size: u64,

    /// PRICE_SCALE-scaled auction step ratio.
    #[serde(default = "default_auction_tick_step")]
    pub auction_tick_step: u64,

    /// PRICE_SCALE-scaled auction price floor.
    #[serde(default = "default_auction_min_price")]
    pub auction_min_price: u64,

    /// PRICE_SCALE-scaled auction starting price.
    #[serde(default = "default_auction_initial_price")]
    pub auction_initial_price: u64,

    /// Clearinghouse lending float target, in grains.
    #[serde(default = "default_fund_target")]
    pub fund_target: u64,

    /// Seconds between clearinghouse rebalances.
    #[serde(default = "default_fund_cadence")]
    pub fund_cadence: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_genesis_reserves() -> u64 {
    25_000_000 * GRAIN_PER_KEEL
}

fn default_oracle_frequency() -> u64 {
    8 * 3_600
}

fn default_heart_max_reward() -> u64 {
    GRAIN_PER_KEEL
}

fn default_heart_auction_duration() -> u64 {
    600
}

fn default_auction_target() -> u64 {
    10_000 * GRAIN_PER_KEEL
}

fn default_auction_tick_size() -> u64 {
    1_000 * GRAIN_PER_KEEL
}

fn default_auction_tick_step() -> u64 {
    1_100_000_000 // 1.1x
}

fn default_auction_min_price() -> u64 {
    PRICE_SCALE
}

fn default_auction_initial_price() -> u64 {
    10 * PRICE_SCALE
}

fn default_fund_target() -> u64 {
    18_000_000 * GRAIN_PER_KEEL
}

fn default_fund_cadence() -> u64 {
    7 * 86_400
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            genesis_reserves: default_genesis_reserves(),
            oracle_frequency: default_oracle_frequency(),
            heart_max_reward: default_heart_max_reward(),
            heart_auction_duration: default_heart_auction_duration(),
            auction_target: default_auction_target(),
            auction_tick_size: default_auction_tick_size(),
            auction_tick_step: default_auction_tick_step(),
            auction_min_price: default_auction_min_price(),
            auction_initial_price: default_auction_initial_price(),
            fund_target: default_fund_target(),
            fund_cadence: default_fund_cadence(),
        }
    }
}

impl KeelConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: KeelConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeelConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.oracle_frequency, 8 * 3_600);
        assert_eq!(config.auction_tick_step, 1_100_000_000);
    }

    #[test]
    fn test_partial_toml_falls_back() {
        let config: KeelConfig = toml::from_str("oracle_frequency = 3600").unwrap();
        assert_eq!(config.oracle_frequency, 3_600);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.fund_cadence, 7 * 86_400);
    }
}
