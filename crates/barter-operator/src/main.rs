//! barter-operator — the cross-chain swap operator binary.
//!
//! Startup sequence:
//!   1. Load configuration from the environment
//!   2. Connect the pool ledger endpoint and run clean-slate recovery
//!   3. Start the coordinator poll loop
//!   4. Start the settlement worker on its own timer
//!   5. Wait for a termination signal, then stop both cleanly

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use barter_coordinator::{Coordinator, CoordinatorConfig};
use barter_crypto::OperatorKey;
use barter_escrowd::{EscrowdClient, PortAllocator};
use barter_oracle::HttpRateSource;
use barter_pool::{EscrowPool, GraphqlBackend, PoolClient};
use barter_resolver::KvDirectory;
use barter_settlement::{SettlementWorker, TranscriptProver};

mod config;
use config::OperatorConfig;

#[derive(Parser, Debug)]
#[command(
    name = "barter-operator",
    version,
    about = "Cross-chain barter operator — drives atomic swaps between the escrow pool and local escrow daemons"
)]
struct Args {
    /// Override the tracked-keys file path (TRACKED_KEYS_PATH).
    #[arg(long)]
    tracked_keys: Option<std::path::PathBuf>,

    /// Override the poll interval in milliseconds (POLL_INTERVAL_MS).
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the operator (the default).
    Run,
    /// Generate a fresh operator keypair and print it.
    Keygen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::Keygen) = args.command {
        return keygen();
    }

    let mut config = OperatorConfig::from_env().context("loading operator configuration")?;
    if let Some(path) = args.tracked_keys {
        config.pool.tracked_keys_path = path;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    init_tracing(&config.log_level);
    info!("barter operator starting");

    // ── Operator identity ─────────────────────────────────────────────────────
    let operator = Arc::new(
        OperatorKey::from_encoded(&config.operator_private_key)
            .context("parsing OPERATOR_PRIVATE_KEY")?,
    );
    info!(address = %operator.address(), "operator identity loaded");

    // ── Clients ───────────────────────────────────────────────────────────────
    let backend = GraphqlBackend::new(
        config.pool.graphql_endpoint.clone(),
        config.pool.pool_address.clone(),
        Arc::clone(&operator),
        config.pool.tx_fee,
    );
    let pool = Arc::new(PoolClient::new(backend, config.pool.tracked_keys_path.clone()));

    let allocator = Arc::new(PortAllocator::new(config.l2_base_port, config.l2_port_range));
    let escrowd = Arc::new(EscrowdClient::new(config.escrowd.clone(), allocator));

    let slippage_bps = config.oracle.slippage_bps;
    let rates = Arc::new(HttpRateSource::new(config.oracle.clone()));
    let directory = Arc::new(KvDirectory::new(config.resolver.clone()));

    // ── Coordinator (connect + clean-slate recovery) ──────────────────────────
    let mut coordinator = Coordinator::new(
        Arc::clone(&pool),
        Arc::clone(&escrowd),
        Arc::clone(&rates),
        Arc::clone(&directory),
        CoordinatorConfig {
            poll_interval: config.poll_interval,
            slippage_bps,
        },
    );
    coordinator
        .initialize()
        .await
        .context("initializing coordinator")?;

    match pool.pool_snapshot().await {
        Ok(snapshot) => info!(balance = snapshot.balance, "escrow pool balance at startup"),
        Err(e) => warn!(error = %e, "could not read pool balance at startup"),
    }

    // ── Tasks ─────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let coordinator_task = tokio::spawn(coordinator.run(shutdown_rx.clone()));

    let worker = SettlementWorker::new(
        Arc::clone(&pool),
        TranscriptProver,
        config.settlement.clone(),
    );
    let worker_task = tokio::spawn(worker.run(shutdown_rx));

    info!("operator ready");
    tokio::signal::ctrl_c()
        .await
        .context("listening for termination signal")?;
    info!("termination signal received; shutting down");

    let _ = shutdown_tx.send(true);
    let _ = coordinator_task.await;
    let _ = worker_task.await;

    info!("shutdown complete");
    Ok(())
}

fn keygen() -> anyhow::Result<()> {
    let key = OperatorKey::generate();
    println!("operator seed (base58): {}", key.seed_base58());
    println!("pool-facing address:    {}", key.address());
    println!();
    println!("Export the seed as OPERATOR_PRIVATE_KEY. It is printed once and never stored.");
    Ok(())
}

fn init_tracing(level: &str) {
    // RUST_LOG wins when set; LOG_LEVEL provides the baseline otherwise.
    let fallback = format!("{level},barter={level}");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.parse().expect("static filter directive")),
        )
        .init();
}
