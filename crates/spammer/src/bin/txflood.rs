//! txflood CLI
//!
//! Splits one funded root account into a tree of derived accounts, then
//! floods the target network with transfer transactions from all of them.
//!
//! # Usage
//!
//! ```bash
//! # 100 accounts, 50 transactions each, against one node
//! txflood --endpoint http://127.0.0.1:26657 \
//!     --root-key <64-char-hex-seed> --parallel 100 --times 50 \
//!     --denom stake --fee 10
//!
//! # One derived sub-tree per endpoint
//! txflood --endpoint http://10.0.0.1:26657 --endpoint http://10.0.0.2:26657 \
//!     --root-key <seed> --parallel 100 --times 50 --snapshot-out accounts.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use txflood_client::HttpLedgerClient;
use txflood_spammer::{
    snapshot, Account, AccountPool, DerivationEngine, LoadGenerator, SpamConfig,
    DEFAULT_MAX_IN_FLIGHT_SPLITS,
};
use txflood_types::Address;

/// Ledger network load generator.
#[derive(Parser, Debug)]
#[command(name = "txflood")]
#[command(version, about, long_about = None)]
struct Cli {
    /// RPC endpoint (repeat for one derived sub-tree per node)
    #[arg(long = "endpoint", required = true)]
    endpoints: Vec<String>,

    /// Hex-encoded 32-byte seed of the funded root key
    #[arg(long)]
    root_key: String,

    /// Number of accounts to derive per endpoint
    #[arg(long, default_value_t = 100)]
    parallel: usize,

    /// Transactions each derived account sends
    #[arg(long, default_value_t = 50)]
    times: u64,

    /// Fee denomination
    #[arg(long, default_value = "stake")]
    denom: String,

    /// Fee amount per transaction
    #[arg(long, default_value_t = 10)]
    fee: u128,

    /// Gas limit per message
    #[arg(long, default_value_t = 100_000)]
    gas: u64,

    /// Receiver address for load transfers (defaults to the root's address)
    #[arg(long)]
    receiver: Option<Address>,

    /// Ceiling on concurrent in-flight splits
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT_SPLITS)]
    max_splits: usize,

    /// Write the derived pool to this file before the flood starts
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> SpamConfig {
        SpamConfig {
            endpoints: self.endpoints,
            root_key: self.root_key,
            fan_out: self.parallel,
            repeat: self.times,
            denom: self.denom,
            fee_amount: self.fee,
            gas_limit: self.gas,
            receiver: self.receiver,
            max_in_flight_splits: self.max_splits,
            snapshot_path: self.snapshot_out,
            ready_timeout: Duration::from_secs(30),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config();
    config.validate().context("invalid configuration")?;

    let clients: Vec<Arc<HttpLedgerClient>> = config
        .endpoints
        .iter()
        .map(|endpoint| Arc::new(HttpLedgerClient::new(endpoint.clone())))
        .collect();

    wait_for_ready(&clients, config.ready_timeout).await?;

    let keypair = config.root_keypair()?;
    let mut root = Account::open(
        clients[0].as_ref(),
        keypair,
        config.fee(),
        config.gas_limit,
        config.receiver,
    )
    .await
    .context("opening root account")?;
    root.remaining_sends = config.repeat;
    info!(%root, "root account opened");

    // Pre-flight: the root must cover every descendant's full send quota.
    root.ensure_can_fund(config.fan_out * config.endpoints.len(), config.repeat)
        .context("pre-flight capacity check")?;

    // One sub-root per endpoint, funded by a single multi-send transaction.
    let sub_roots = if clients.len() > 1 {
        DerivationEngine::new(Arc::clone(&clients[0]))
            .seed(&mut root, clients.len())
            .await
            .context("seeding per-endpoint sub-roots")?
    } else {
        vec![root]
    };

    // Phase 1: derive a pool behind every endpoint concurrently.
    let mut derivations: JoinSet<Result<(usize, AccountPool)>> = JoinSet::new();
    for (idx, sub_root) in sub_roots.into_iter().enumerate() {
        let client = Arc::clone(&clients[idx]);
        let fan_out = config.fan_out;
        let max_splits = config.max_in_flight_splits;
        derivations.spawn(async move {
            let engine = DerivationEngine::new(client).with_max_in_flight(max_splits);
            let pool = engine.derive(sub_root, fan_out).await?;
            Ok((idx, pool))
        });
    }

    let mut pools: Vec<Option<AccountPool>> = (0..clients.len()).map(|_| None).collect();
    while let Some(joined) = derivations.join_next().await {
        let (idx, pool) = joined.context("derivation task")??;
        pools[idx] = Some(pool);
    }

    if let Some(path) = &config.snapshot_path {
        let mut flat = Vec::new();
        let mut counts = Vec::with_capacity(pools.len());
        for pool in pools.iter_mut() {
            let accounts = pool
                .take()
                .map(AccountPool::into_accounts)
                .unwrap_or_default();
            counts.push(accounts.len());
            flat.extend(accounts);
        }
        snapshot::save(path, &flat)?;
        // Rebuild the per-endpoint pools in place.
        let mut drained = flat.into_iter();
        for (pool, count) in pools.iter_mut().zip(counts) {
            let accounts: Vec<Account> = drained.by_ref().take(count).collect();
            *pool = Some(AccountPool::from_accounts(accounts));
        }
    }

    // Phase 2: flood every endpoint from its pool concurrently.
    let start = Instant::now();
    let mut runs: JoinSet<Result<txflood_spammer::SpamReport>> = JoinSet::new();
    for (idx, pool) in pools.into_iter().enumerate() {
        let Some(pool) = pool else { continue };
        let client = Arc::clone(&clients[idx]);
        let repeat = config.repeat;
        runs.spawn(async move {
            let generator = LoadGenerator::new(client);
            Ok(generator.run(pool, repeat).await?)
        });
    }

    let mut total_confirmed = 0u64;
    while let Some(joined) = runs.join_next().await {
        let report = joined.context("load generation task")??;
        total_confirmed += report.total_confirmed;
    }

    info!(
        total_confirmed,
        elapsed_secs = start.elapsed().as_secs(),
        "run complete"
    );
    Ok(())
}

/// Block until every endpoint answers, or give up after `timeout`.
async fn wait_for_ready(clients: &[Arc<HttpLedgerClient>], timeout: Duration) -> Result<()> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        let mut all_ready = true;
        for client in clients {
            if !client.is_ready().await {
                warn!(endpoint = client.base_url(), "endpoint not ready");
                all_ready = false;
                break;
            }
        }
        if all_ready {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    anyhow::bail!("endpoints not ready within {timeout:?}")
}
