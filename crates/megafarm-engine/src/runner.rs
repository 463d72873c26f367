//! Per-account flow: initialize, walk the pending plan, record
//! outcomes, always clean up.

use std::sync::Arc;
use std::time::Duration;

use megafarm_core::config::Config;
use megafarm_core::types::{mask_key, AccountReport};
use megafarm_ledger::TaskLedger;
use megafarm_tasks::TaskName;

use crate::context::{AccountContext, AccountInitializer};
use crate::dispatch::TaskRegistry;
use crate::retry::with_retry;

/// Lifecycle of one account within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerState {
    Uninitialized,
    Initialized,
    Running(usize),
    Completed,
    Aborted,
}

/// Drives one account through its pending plan, strictly sequentially.
/// Failures stay inside this runner: they become entries in the
/// [`AccountReport`], never errors that could cancel sibling accounts.
pub struct AccountRunner {
    index: usize,
    private_key: String,
    proxy: Option<String>,
    plan: Arc<Vec<TaskName>>,
    config: Arc<Config>,
    ledger: Arc<TaskLedger>,
    registry: Arc<TaskRegistry>,
    initializer: Arc<dyn AccountInitializer>,
    state: RunnerState,
}

impl AccountRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        private_key: String,
        proxy: Option<String>,
        plan: Arc<Vec<TaskName>>,
        config: Arc<Config>,
        ledger: Arc<TaskLedger>,
        registry: Arc<TaskRegistry>,
        initializer: Arc<dyn AccountInitializer>,
    ) -> Self {
        Self {
            index,
            private_key,
            proxy,
            plan,
            config,
            ledger,
            registry,
            initializer,
            state: RunnerState::Uninitialized,
        }
    }

    /// Execute the account flow to completion. Never panics the caller
    /// and never leaks the session: cleanup runs on every exit path.
    pub async fn run(mut self) -> AccountReport {
        let wallet = mask_key(&self.private_key);

        let mut ctx = match AccountContext::new(self.index, &self.private_key, self.proxy.clone())
        {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!("[{}] Account flow failed: {e}", self.index);
                self.state = RunnerState::Aborted;
                return Self::aborted_report(self.index, wallet);
            }
        };

        if !self.initialize(&mut ctx).await {
            self.state = RunnerState::Aborted;
            self.initializer.cleanup(&mut ctx).await;
            return Self::aborted_report(self.index, wallet);
        }
        self.state = RunnerState::Initialized;

        let report = self.execute_flow(&mut ctx, wallet).await;
        // Teardown is unconditional: the flow above has already folded
        // every failure into the report.
        self.initializer.cleanup(&mut ctx).await;
        report
    }

    /// Session + chain-client setup, retried like any other operation.
    async fn initialize(&self, ctx: &mut AccountContext) -> bool {
        let attempts = self.config.settings.attempts.max(1);
        let pause = self.config.settings.pause_between_attempts;
        for attempt in 1..=attempts {
            match self.initializer.initialize(ctx, &self.config).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::error!("[{}] Initialization failed: {e}", self.index);
                    if attempt < attempts {
                        let secs = pause.pick(&mut rand::thread_rng());
                        tracing::info!(
                            "[{}] Sleeping {secs}s before attempt {}/{attempts}...",
                            self.index,
                            attempt + 1
                        );
                        tokio::time::sleep(Duration::from_secs(secs)).await;
                    }
                }
            }
        }
        false
    }

    async fn execute_flow(&mut self, ctx: &mut AccountContext, wallet: String) -> AccountReport {
        // Balance and tx count are informational; failure here must
        // not touch the flow.
        if let Ok(chain) = ctx.chain() {
            match chain.wallet_stats(&ctx.wallet.address).await {
                Ok((eth, txs)) => tracing::info!(
                    "[{}] {} | balance {eth:.6} ETH | {txs} txs",
                    self.index,
                    ctx.wallet.address
                ),
                Err(e) => tracing::debug!("[{}] Wallet stats unavailable: {e}", self.index),
            }
        }

        if let Err(e) = self.ledger.ensure_plan(&self.private_key, &self.plan).await {
            tracing::error!("[{}] {e}", self.index);
            self.state = RunnerState::Aborted;
            return Self::aborted_report(self.index, wallet);
        }
        let pending = match self.ledger.pending_tasks(&self.private_key).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!("[{}] {e}", self.index);
                self.state = RunnerState::Aborted;
                return Self::aborted_report(self.index, wallet);
            }
        };

        if pending.is_empty() {
            tracing::warn!(
                "[{}] No pending tasks found for this wallet, nothing to do",
                self.index
            );
            self.state = RunnerState::Completed;
            return AccountReport {
                index: self.index,
                wallet,
                completed: Vec::new(),
                failed: Vec::new(),
                success: true,
            };
        }

        let plan_line = pending
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {t}", i + 1))
            .collect::<Vec<_>>()
            .join(" | ");
        tracing::info!("[{}] Task execution plan: {plan_line}", self.index);

        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for (position, task) in pending.iter().enumerate() {
            self.state = RunnerState::Running(position);

            if task.is_skip() {
                tracing::info!("[{}] Skipping task: {task}", self.index);
                continue;
            }

            tracing::info!("[{}] Executing task: {task}", self.index);
            let success = self.execute_task(ctx, task).await;

            if success {
                if let Err(e) = self.ledger.mark_completed(&self.private_key, task).await {
                    // Completion that cannot be recorded would re-run a
                    // side-effecting operation next time; stop here.
                    tracing::error!("[{}] {e}", self.index);
                    failed.push(task.as_str().to_string());
                    self.state = RunnerState::Aborted;
                    break;
                }
                completed.push(task.as_str().to_string());
                self.pause_between_actions(task).await;
            } else {
                failed.push(task.as_str().to_string());
                if !self.config.flow.skip_failed_tasks {
                    tracing::error!(
                        "[{}] Failed to complete task {task}, stopping wallet execution",
                        self.index
                    );
                    self.state = RunnerState::Aborted;
                    break;
                }
                tracing::warn!(
                    "[{}] Failed to complete task {task}, skipping to next task",
                    self.index
                );
                self.pause_between_actions(task).await;
            }
        }

        if self.state != RunnerState::Aborted {
            self.state = RunnerState::Completed;
        }

        AccountReport {
            index: self.index,
            wallet,
            success: failed.is_empty(),
            completed,
            failed,
        }
    }

    /// One task through the retry wrapper. Unexpected handler errors
    /// land here and count as a task failure.
    async fn execute_task(&self, ctx: &AccountContext, task: &TaskName) -> bool {
        let registry = &self.registry;
        let result = with_retry(
            self.config.settings.attempts,
            self.config.settings.pause_between_attempts,
            self.index,
            || registry.dispatch(task, ctx),
        )
        .await;
        match result {
            Ok(outcome) => outcome.success,
            Err(e) => {
                tracing::error!("[{}] Task {task} error: {e}", self.index);
                false
            }
        }
    }

    async fn pause_between_actions(&self, task: &TaskName) {
        let secs = self
            .config
            .settings
            .random_pause_between_actions
            .pick(&mut rand::thread_rng());
        tracing::info!("[{}] Sleeping {secs}s after {task}", self.index);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    fn aborted_report(index: usize, wallet: String) -> AccountReport {
        AccountReport {
            index,
            wallet,
            completed: Vec::new(),
            failed: Vec::new(),
            success: false,
        }
    }
}
