// crates/keel-daemon/src/main.rs
//
// Binary entrypoint for the Keel Protocol daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, wires
// the kernel/modules/policies, and runs the keeper loop that drives the
// heartbeat.

mod config;
mod tasks;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;

use config::KeelConfig;
use tasks::{OracleUpdateTask, RebalanceTask, YieldSnapshotTask};

use keel_auction::{AuctionConfig, Auctioneer, ConvertibleDepositor};
use keel_clearinghouse::{Clearinghouse, ClearinghouseConfig};
use keel_core::{
    lock_read, lock_write, AccountId, PriceOracle, SharedLedger, SharedOracle, Timestamp,
    TokenId, TokenLedger,
};
use keel_deposit::{DepositConfig, DepositFacility};
use keel_heart::{Heart, HeartConfig};
use keel_kernel::{
    Kernel, Permission, PolicyId, PolicyManifest, RoleRegistry, ROLE_ADMIN, ROLE_EMERGENCY,
};
use keel_modules::{
    minter, registry, AddressRegistry, DepositRegistry, InMemoryLedger, IntervalOracle, Minter,
    PositionBook, SharesVault, Treasury, UNLIMITED_APPROVAL,
};

/// Keel Protocol daemon: wires the kernel and runs the keeper loop.
#[derive(Parser, Debug)]
#[command(name = "keel-daemon", version = "0.1.0", about = "Keel Protocol daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.keel/config.toml")]
    config: String,

    /// Account name the keeper loop collects beat rewards under.
    #[arg(long, default_value = "keeper")]
    keeper: String,
}

/// The wired protocol instance.
struct Protocol {
    kernel: Kernel,
    heart: Arc<RwLock<Heart>>,
    auctioneer: Arc<RwLock<Auctioneer>>,
    clearinghouse: Arc<RwLock<Clearinghouse>>,
    address_registry: AddressRegistry,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the
    // file is not found.
    let keel_config = match KeelConfig::load(&args.config) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", args.config);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                args.config,
                e
            );
            KeelConfig::default()
        }
    };

    tracing::info!("Keel Protocol Daemon v0.1.0");
    tracing::info!("Oracle frequency: {}s", keel_config.oracle_frequency);
    tracing::info!(
        "Genesis reserves: {} grains to treasury",
        keel_config.genesis_reserves
    );

    let genesis = Utc::now().timestamp() as Timestamp;
    let protocol = wire_protocol(&keel_config, genesis)?;

    tracing::info!(
        "Active policies: {:?}",
        protocol
            .kernel
            .active_policies()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>()
    );
    tracing::info!(
        "Governor registered at {}",
        protocol.address_registry.get("governor")?
    );
    {
        let tick = lock_read(&protocol.auctioneer).current_tick(genesis);
        tracing::info!(
            "Auction open: price {} capacity {}",
            tick.price,
            tick.capacity
        );
    }

    let keeper = AccountId::from_name(&args.keeper);
    run_keeper_loop(&protocol, keeper).await;

    let receivables = {
        let clearinghouse = lock_read(&protocol.clearinghouse);
        (
            clearinghouse.principal_receivables(),
            clearinghouse.interest_receivables(),
        )
    };
    tracing::info!(
        "Keel daemon shut down (receivables: {} principal, {} interest)",
        receivables.0,
        receivables.1
    );
    Ok(())
}

/// Construct the kernel, install modules, activate policies, and register
/// the heartbeat's task sequence.
fn wire_protocol(
    config: &KeelConfig,
    genesis: Timestamp,
) -> Result<Protocol, Box<dyn std::error::Error>> {
    let ledger: SharedLedger = Arc::new(RwLock::new(InMemoryLedger::new()));
    let vault = Arc::new(RwLock::new(SharesVault::new()));
    let oracle: SharedOracle = Arc::new(RwLock::new(IntervalOracle::new(
        config.oracle_frequency,
    )));

    // Kernel and module installation.
    let mut kernel = Kernel::new();
    kernel.install_module(Treasury::KEYCODE, Treasury::VERSION)?;
    kernel.install_module(Minter::KEYCODE, Minter::VERSION)?;
    kernel.install_module(AddressRegistry::KEYCODE, AddressRegistry::VERSION)?;
    kernel.install_module(DepositRegistry::KEYCODE, DepositRegistry::VERSION)?;
    kernel.install_module(PositionBook::KEYCODE, PositionBook::VERSION)?;

    let treasury = Arc::new(RwLock::new(Treasury::new(
        kernel.permissions(),
        Arc::clone(&ledger),
    )));
    let minter_module = Arc::new(RwLock::new(Minter::new(
        kernel.permissions(),
        Arc::clone(&ledger),
    )));
    let mut address_registry = AddressRegistry::new(kernel.permissions());
    let deposit_registry = Arc::new(RwLock::new(DepositRegistry::new(
        kernel.permissions(),
        Arc::clone(&ledger),
    )));
    lock_write(&deposit_registry).add_vault(TokenId::reserve(), vault);
    let positions = Arc::new(RwLock::new(PositionBook::new(kernel.permissions())));

    // Seed the treasury with genesis reserves.
    let treasury_account = lock_read(&treasury).account();
    lock_write(&ledger).mint(
        &TokenId::reserve(),
        &treasury_account,
        config.genesis_reserves,
    )?;

    // Governance roles.
    let governor = AccountId::from_name("governor");
    let mut roles = RoleRegistry::new();
    roles.grant_role(ROLE_ADMIN, governor)?;
    roles.grant_role(ROLE_EMERGENCY, governor)?;
    let roles = Arc::new(RwLock::new(roles));

    // The governance policy manages mint approvals and the address book.
    let governance_cap = kernel.activate_policy(PolicyManifest {
        policy: PolicyId::new("governance"),
        dependencies: vec![
            (Minter::KEYCODE, Minter::VERSION.major),
            (AddressRegistry::KEYCODE, AddressRegistry::VERSION.major),
        ],
        permissions: vec![
            Permission::new(Minter::KEYCODE, minter::FN_INCREASE_MINT_APPROVAL),
            Permission::new(Minter::KEYCODE, minter::FN_DECREASE_MINT_APPROVAL),
            Permission::new(AddressRegistry::KEYCODE, registry::FN_REGISTER),
            Permission::new(AddressRegistry::KEYCODE, registry::FN_UPDATE),
        ],
    })?;
    address_registry.register(&governance_cap, "governor", governor)?;
    address_registry.register(
        &governance_cap,
        "yield_vault",
        AccountId::from_name("yield-vault"),
    )?;

    // Clearinghouse.
    let clearinghouse_cap = kernel.activate_policy(Clearinghouse::manifest())?;
    let clearinghouse = Arc::new(RwLock::new(Clearinghouse::new(
        clearinghouse_cap,
        Arc::clone(&treasury),
        Arc::clone(&minter_module),
        Arc::clone(&roles),
        Arc::clone(&ledger),
        ClearinghouseConfig {
            fund_target: config.fund_target,
            fund_cadence: config.fund_cadence,
            ..ClearinghouseConfig::default()
        },
    )));

    // Convertible deposit facility.
    let facility_cap = kernel.activate_policy(DepositFacility::manifest())?;
    let facility = Arc::new(RwLock::new(DepositFacility::new(
        facility_cap,
        Arc::clone(&deposit_registry),
        Arc::clone(&positions),
        Arc::clone(&minter_module),
        Arc::clone(&ledger),
        treasury_account,
        TokenId::reserve(),
        DepositConfig::default(),
    )?));
    lock_write(&minter_module).increase_mint_approval(
        &governance_cap,
        &PolicyId::new(DepositFacility::POLICY),
        UNLIMITED_APPROVAL,
    )?;

    // Auction engine, selling capacity into the deposit facility.
    let depositor: Arc<RwLock<dyn ConvertibleDepositor>> = facility.clone();
    let auctioneer = Arc::new(RwLock::new(Auctioneer::new(
        AuctionConfig {
            target: config.auction_target,
            tick_size: config.auction_tick_size,
            tick_step: config.auction_tick_step,
            min_price: config.auction_min_price,
        },
        config.auction_initial_price,
        genesis,
        depositor,
    )?));

    // Heart, beating at the oracle's observation frequency.
    let heart_cap = kernel.activate_policy(Heart::manifest())?;
    let frequency = lock_read(&oracle).observation_frequency();
    let mut heart = Heart::new(
        heart_cap,
        Arc::clone(&minter_module),
        Arc::clone(&roles),
        frequency,
        HeartConfig {
            max_reward: config.heart_max_reward,
            auction_duration: config.heart_auction_duration,
        },
        genesis,
    )?;
    lock_write(&minter_module).increase_mint_approval(
        &governance_cap,
        &PolicyId::new(Heart::POLICY),
        UNLIMITED_APPROVAL,
    )?;
    heart.add_task(Box::new(OracleUpdateTask::new(oracle)));
    heart.add_task(Box::new(RebalanceTask::new(Arc::clone(&clearinghouse))));
    heart.add_task(Box::new(YieldSnapshotTask::new(Arc::clone(&facility))));
    let heart = Arc::new(RwLock::new(heart));

    Ok(Protocol {
        kernel,
        heart,
        auctioneer,
        clearinghouse,
        address_registry,
    })
}

/// Poll the heart once a second, beating whenever it is due, until
/// interrupted.
async fn run_keeper_loop(protocol: &Protocol, keeper: AccountId) {
    tracing::info!(
        "Keeper loop started (frequency {}s, keeper {})",
        lock_read(&protocol.heart).frequency(),
        keeper
    );
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Keeper loop received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now().timestamp() as Timestamp;
                if lock_read(&protocol.heart).is_due(now) {
                    match lock_write(&protocol.heart).beat(&keeper, now) {
                        Ok(reward) => {
                            let tick = lock_read(&protocol.auctioneer).current_tick(now);
                            tracing::info!(
                                "Beat at {}: reward {}, auction price {}",
                                now,
                                reward,
                                tick.price
                            );
                        }
                        Err(e) => tracing::warn!("Beat failed: {}", e),
                    }
                }
            }
        }
    }
}
