//! # Megafarm — Testnet Farming Orchestrator
//!
//! Runs a configured task flow across many wallets with bounded
//! concurrency, resuming each wallet from its persistent task ledger.
//!
//! Usage:
//!   megafarm run                         # Execute the configured flow
//!   megafarm plan                        # Preview one resolved plan
//!   megafarm status                      # Ledger progress summary
//!   megafarm reset --all                 # Forget all recorded progress

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use megafarm_core::config::Config;
use megafarm_engine::{RpcInitializer, Scheduler, TaskRegistry};
use megafarm_ledger::TaskLedger;
use megafarm_tasks::Catalog;

#[derive(Parser)]
#[command(name = "megafarm", version, about = "🌾 Megafarm — testnet farming orchestrator")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private keys file, one key per line
    #[arg(long, default_value = "private_keys.txt")]
    keys: String,

    /// Proxies file, one proxy per line (optional)
    #[arg(long, default_value = "proxies.txt")]
    proxies: String,

    /// Task ledger database path [default: ~/.megafarm/ledger.db]
    #[arg(long)]
    db_path: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the configured flow across all selected accounts
    Run,
    /// Resolve the flow once and print the plan without executing
    Plan {
        /// Seed for the resolver, for a reproducible preview
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show ledger progress
    Status,
    /// Clear recorded progress so the flow starts over
    Reset {
        /// Reset every wallet
        #[arg(long)]
        all: bool,
        /// Reset one account by its 1-based ordinal in the keys file
        #[arg(long)]
        account: Option<usize>,
    },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Read one trimmed entry per line, skipping blanks and `#` comments.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Service modules register their task handlers here as they are
/// linked into the build.
fn build_registry() -> TaskRegistry {
    TaskRegistry::new()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "megafarm=debug"
    } else {
        "megafarm=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = Config::load_from(&expand_path(&cli.config))?;

    let db_path = match &cli.db_path {
        Some(p) => expand_path(p),
        None => TaskLedger::default_path(),
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let ledger = TaskLedger::open(&db_path)?;

    match &cli.command {
        Command::Run => run(&cli, config, ledger).await,
        Command::Plan { seed } => plan(config, *seed),
        Command::Status => status(ledger).await,
        Command::Reset { all, account } => reset(&cli, ledger, *all, *account).await,
    }
}

async fn run(cli: &Cli, config: Config, ledger: TaskLedger) -> Result<()> {
    let private_keys = read_lines(&expand_path(&cli.keys))?;
    if private_keys.is_empty() {
        bail!("No private keys found in {}", cli.keys);
    }
    let proxies = match std::fs::metadata(expand_path(&cli.proxies)) {
        Ok(_) => read_lines(&expand_path(&cli.proxies))?,
        Err(_) => Vec::new(),
    };
    tracing::info!(
        "Loaded {} keys and {} proxies",
        private_keys.len(),
        proxies.len()
    );

    let registry = build_registry();
    if registry.is_empty() {
        tracing::warn!("No task handlers are registered in this build; every task will fail");
    }

    let scheduler = Scheduler::new(
        Arc::new(config),
        Arc::new(Catalog::builtin()),
        Arc::new(ledger),
        Arc::new(registry),
        Arc::new(RpcInitializer),
    );
    let report = scheduler.run(&private_keys, &proxies).await?;

    tracing::info!(
        "Run finished: {}/{} accounts succeeded ({:.1}%)",
        report.succeeded(),
        report.attempted(),
        report.success_rate()
    );
    for account in &report.accounts {
        if !account.failed.is_empty() {
            tracing::warn!(
                "[{}] {} failed tasks: {}",
                account.index,
                account.failed.len(),
                account.failed.join(", ")
            );
        }
    }
    Ok(())
}

fn plan(config: Config, seed: Option<u64>) -> Result<()> {
    let catalog = Catalog::builtin();
    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let plan = catalog.resolve_plan(&config.flow.tasks, &mut rng);
    if plan.is_empty() {
        println!("The configured flow resolves to an empty plan.");
        return Ok(());
    }
    println!("One possible plan for this flow ({} tasks):", plan.len());
    for (i, task) in plan.iter().enumerate() {
        println!("  {}. {task}", i + 1);
    }
    Ok(())
}

async fn status(ledger: TaskLedger) -> Result<()> {
    let stats = ledger.stats().await?;
    println!("🌾 Megafarm ledger");
    println!("   Wallets:   {}", stats.wallets);
    println!("   Pending:   {}", stats.pending);
    println!("   Completed: {}", stats.completed);
    Ok(())
}

async fn reset(cli: &Cli, ledger: TaskLedger, all: bool, account: Option<usize>) -> Result<()> {
    match (all, account) {
        (true, _) => {
            let removed = ledger.reset_all().await?;
            println!("Cleared {removed} recorded tasks across all wallets.");
        }
        (false, Some(ordinal)) => {
            let private_keys = read_lines(&expand_path(&cli.keys))?;
            let Some(key) = ordinal.checked_sub(1).and_then(|i| private_keys.get(i)) else {
                bail!("Account {ordinal} is out of range (have {})", private_keys.len());
            };
            if !ledger.has_wallet(key).await? {
                println!("Account {ordinal} has no recorded tasks.");
                return Ok(());
            }
            let removed = ledger.reset_wallet(key).await?;
            println!("Cleared {removed} recorded tasks for account {ordinal}.");
        }
        (false, None) => bail!("Pass --all or --account <N>"),
    }
    Ok(())
}
