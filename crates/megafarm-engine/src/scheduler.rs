//! Run-level coordination: account selection, proxy binding, shuffle,
//! and the bounded worker gate across all account runners.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Semaphore;

use megafarm_core::config::Config;
use megafarm_core::error::Result;
use megafarm_core::types::{AccountReport, RunReport};
use megafarm_ledger::TaskLedger;
use megafarm_tasks::{Catalog, TaskName};

use crate::context::AccountInitializer;
use crate::dispatch::TaskRegistry;
use crate::runner::AccountRunner;

/// One selected account: its 1-based ordinal, private key, and the
/// proxy bound to it before any shuffling.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedAccount {
    pub index: usize,
    pub private_key: String,
    pub proxy: Option<String>,
}

/// Top-level coordinator for one run.
pub struct Scheduler {
    config: Arc<Config>,
    catalog: Arc<Catalog>,
    ledger: Arc<TaskLedger>,
    registry: Arc<TaskRegistry>,
    initializer: Arc<dyn AccountInitializer>,
}

impl Scheduler {
    pub fn new(
        config: Arc<Config>,
        catalog: Arc<Catalog>,
        ledger: Arc<TaskLedger>,
        registry: Arc<TaskRegistry>,
        initializer: Arc<dyn AccountInitializer>,
    ) -> Self {
        Self {
            config,
            catalog,
            ledger,
            registry,
            initializer,
        }
    }

    /// Resolve the configured task list into this run's concrete plan.
    /// Called once per run: the expansion is run-specific-random but
    /// shared by every account.
    pub fn resolve_plan(&self, rng: &mut impl Rng) -> Vec<TaskName> {
        self.catalog.resolve_plan(&self.config.flow.tasks, rng)
    }

    /// Pick which accounts run: an explicit 1-based ordinal list wins,
    /// then an inclusive nonzero `[start, end]` range, else everyone.
    /// Each selected account is bound to a proxy by its pre-shuffle
    /// position (`position mod proxy_count`).
    pub fn select_accounts(
        config: &Config,
        private_keys: &[String],
        proxies: &[String],
    ) -> Vec<SelectedAccount> {
        let settings = &config.settings;
        let mut selected: Vec<(usize, String)> = Vec::new();

        if !settings.exact_accounts_to_use.is_empty() {
            for &ordinal in &settings.exact_accounts_to_use {
                match ordinal.checked_sub(1).and_then(|i| private_keys.get(i)) {
                    Some(key) => selected.push((ordinal, key.clone())),
                    None => tracing::warn!(
                        "Account {ordinal} is out of range (have {}), skipping",
                        private_keys.len()
                    ),
                }
            }
            tracing::info!("Using specific accounts: {:?}", settings.exact_accounts_to_use);
        } else if settings.accounts_range != (0, 0) {
            let (start, end) = settings.accounts_range;
            let end = end.min(private_keys.len());
            for ordinal in start.max(1)..=end {
                selected.push((ordinal, private_keys[ordinal - 1].clone()));
            }
        } else {
            for (i, key) in private_keys.iter().enumerate() {
                selected.push((i + 1, key.clone()));
            }
        }

        selected
            .into_iter()
            .enumerate()
            .map(|(position, (index, private_key))| SelectedAccount {
                index,
                private_key,
                proxy: if proxies.is_empty() {
                    None
                } else {
                    Some(proxies[position % proxies.len()].clone())
                },
            })
            .collect()
    }

    /// Run every selected account under the concurrency gate and
    /// aggregate the per-account reports. Runner failures never cancel
    /// siblings; the run always proceeds to natural completion.
    pub async fn run(
        &self,
        private_keys: &[String],
        proxies: &[String],
    ) -> Result<RunReport> {
        let mut rng = rand::thread_rng();
        let plan = Arc::new(self.resolve_plan(&mut rng));
        tracing::info!(
            "Resolved plan ({} tasks): {}",
            plan.len(),
            plan.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(" | ")
        );

        let mut accounts = Self::select_accounts(&self.config, private_keys, proxies);
        if accounts.is_empty() {
            tracing::warn!("No accounts selected, nothing to run");
            return Ok(RunReport::default());
        }

        // Proxy binding above used pre-shuffle positions; shuffling
        // only reorders when an account runs.
        let order = if self.config.settings.shuffle_wallets {
            accounts.shuffle(&mut rng);
            "random"
        } else {
            "sequential"
        };
        tracing::info!(
            "Starting {} accounts in {order} order: {}",
            accounts.len(),
            accounts
                .iter()
                .map(|a| a.index.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let semaphore = Arc::new(Semaphore::new(self.config.settings.threads));
        let mut handles = Vec::with_capacity(accounts.len());

        for account in accounts {
            let semaphore = semaphore.clone();
            let plan = plan.clone();
            let config = self.config.clone();
            let ledger = self.ledger.clone();
            let registry = self.registry.clone();
            let initializer = self.initializer.clone();

            handles.push(tokio::spawn(async move {
                // A closed semaphore is impossible here; treat it as a
                // skipped account rather than panicking.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return AccountReport {
                        index: account.index,
                        wallet: String::new(),
                        completed: Vec::new(),
                        failed: Vec::new(),
                        success: false,
                    };
                };

                // Stagger inside the gated region: it spends the
                // slot's wall clock, not an extra slot.
                let stagger = config
                    .settings
                    .random_initialization_pause
                    .pick(&mut rand::thread_rng());
                if stagger > 0 {
                    tracing::info!(
                        "[{}] Sleeping {stagger}s before start...",
                        account.index
                    );
                    tokio::time::sleep(Duration::from_secs(stagger)).await;
                }

                let runner = AccountRunner::new(
                    account.index,
                    account.private_key,
                    account.proxy,
                    plan,
                    config.clone(),
                    ledger,
                    registry,
                    initializer,
                );
                let report = runner.run().await;

                let pause = config
                    .settings
                    .random_pause_between_accounts
                    .pick(&mut rand::thread_rng());
                if pause > 0 {
                    tracing::info!(
                        "[{}] Sleeping {pause}s before next account...",
                        report.index
                    );
                    tokio::time::sleep(Duration::from_secs(pause)).await;
                }
                report
            }));
        }

        let mut report = RunReport::default();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(account_report) => report.accounts.push(account_report),
                Err(e) => tracing::error!("Account task panicked: {e}"),
            }
        }
        Ok(report)
    }
}
