//! End-to-end flow tests: runner + ledger + registry wired together
//! with fake handlers, no network.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use megafarm_core::config::{Config, PauseRange, SettingsConfig};
use megafarm_core::error::Result;
use megafarm_core::types::TaskOutcome;
use megafarm_engine::{
    AccountContext, AccountInitializer, AccountRunner, Scheduler, TaskHandler, TaskRegistry,
};
use megafarm_ledger::TaskLedger;
use megafarm_tasks::{Catalog, TaskExpr, TaskId, TaskName};

struct NoopInitializer;

#[async_trait]
impl AccountInitializer for NoopInitializer {
    async fn initialize(&self, _ctx: &mut AccountContext, _config: &Config) -> Result<()> {
        Ok(())
    }

    async fn cleanup(&self, _ctx: &mut AccountContext) {}
}

/// Fails the first `fail_first` calls, then succeeds.
struct Flaky {
    fail_first: u32,
    calls: AtomicU32,
}

impl Flaky {
    fn new(fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_first,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl TaskHandler for Flaky {
    async fn execute(&self, _ctx: &AccountContext) -> Result<TaskOutcome> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(if n < self.fail_first {
            TaskOutcome::failed()
        } else {
            TaskOutcome::ok()
        })
    }
}

struct Counting {
    calls: AtomicU32,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl TaskHandler for Counting {
    async fn execute(&self, _ctx: &AccountContext) -> Result<TaskOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TaskOutcome::ok())
    }
}

/// Tracks how many executions overlap in time.
struct Gauge {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Gauge {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TaskHandler for Gauge {
    async fn execute(&self, _ctx: &AccountContext) -> Result<TaskOutcome> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(TaskOutcome::ok())
    }
}

/// Records which (account, proxy) pair each execution ran under.
struct Recording {
    seen: std::sync::Mutex<Vec<(usize, Option<String>)>>,
}

impl Recording {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TaskHandler for Recording {
    async fn execute(&self, ctx: &AccountContext) -> Result<TaskOutcome> {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.index, ctx.proxy.clone()));
        Ok(TaskOutcome::ok())
    }
}

fn test_key(i: usize) -> String {
    format!("0x{i:064x}")
}

fn test_config(attempts: u32, skip_failed_tasks: bool) -> Config {
    let mut config = Config {
        settings: SettingsConfig {
            attempts,
            pause_between_attempts: PauseRange(0, 0),
            random_pause_between_accounts: PauseRange(0, 0),
            random_pause_between_actions: PauseRange(0, 0),
            random_initialization_pause: PauseRange(0, 0),
            ..SettingsConfig::default()
        },
        ..Config::default()
    };
    config.flow.skip_failed_tasks = skip_failed_tasks;
    config
}

fn plan(names: &[&str]) -> Arc<Vec<TaskName>> {
    Arc::new(names.iter().map(|n| TaskName::new(n)).collect())
}

fn runner(
    key: &str,
    plan: Arc<Vec<TaskName>>,
    config: Config,
    ledger: Arc<TaskLedger>,
    registry: Arc<TaskRegistry>,
) -> AccountRunner {
    AccountRunner::new(
        1,
        key.to_string(),
        None,
        plan,
        Arc::new(config),
        ledger,
        registry,
        Arc::new(NoopInitializer),
    )
}

#[tokio::test]
async fn test_flaky_task_recovers_within_attempts() {
    let ledger = Arc::new(TaskLedger::open_in_memory().unwrap());
    let flaky = Flaky::new(2);
    let refuel = Counting::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, flaky.clone());
    registry.register(TaskId::CrustyRefuel, refuel.clone());

    let key = test_key(1);
    let report = runner(
        &key,
        plan(&["faucet", "skip", "crusty_refuel"]),
        test_config(3, false),
        ledger.clone(),
        Arc::new(registry),
    )
    .run()
    .await;

    assert!(report.success);
    assert_eq!(report.completed, vec!["faucet", "crusty_refuel"]);
    assert!(report.failed.is_empty());
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    assert_eq!(refuel.calls.load(Ordering::SeqCst), 1);

    // The skip sentinel never reaches the ledger, and nothing is left
    // pending.
    assert!(ledger.pending_tasks(&key).await.unwrap().is_empty());
    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.completed, 2);
}

#[tokio::test]
async fn test_failure_aborts_account_and_preserves_pending() {
    let ledger = Arc::new(TaskLedger::open_in_memory().unwrap());
    let bebop = Counting::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, Flaky::new(u32::MAX));
    registry.register(TaskId::Bebop, bebop.clone());
    registry.register(TaskId::Owlto, Counting::new());

    let key = test_key(2);
    let report = runner(
        &key,
        plan(&["faucet", "bebop", "owlto"]),
        test_config(2, false),
        ledger.clone(),
        Arc::new(registry),
    )
    .run()
    .await;

    assert!(!report.success);
    assert!(report.completed.is_empty());
    assert_eq!(report.failed, vec!["faucet"]);
    assert_eq!(bebop.calls.load(Ordering::SeqCst), 0);

    // Later tasks stay pending for the next run.
    let pending = ledger.pending_tasks(&key).await.unwrap();
    let names: Vec<&str> = pending.iter().map(|t| t.as_str()).collect();
    assert_eq!(names, ["faucet", "bebop", "owlto"]);
}

#[tokio::test]
async fn test_skip_failed_tasks_continues_past_failure() {
    let ledger = Arc::new(TaskLedger::open_in_memory().unwrap());
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, Flaky::new(u32::MAX));
    registry.register(TaskId::Bebop, Counting::new());
    registry.register(TaskId::Owlto, Counting::new());

    let key = test_key(3);
    let report = runner(
        &key,
        plan(&["faucet", "bebop", "owlto"]),
        test_config(2, true),
        ledger.clone(),
        Arc::new(registry),
    )
    .run()
    .await;

    assert!(!report.success);
    assert_eq!(report.completed, vec!["bebop", "owlto"]);
    assert_eq!(report.failed, vec!["faucet"]);

    // Only the failed task remains pending.
    let pending = ledger.pending_tasks(&key).await.unwrap();
    assert_eq!(pending, vec![TaskName::new("faucet")]);
}

#[tokio::test]
async fn test_resume_after_completion_executes_nothing() {
    let ledger = Arc::new(TaskLedger::open_in_memory().unwrap());
    let key = test_key(4);
    let the_plan = plan(&["faucet", "bebop"]);

    let first = Counting::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, first.clone());
    registry.register(TaskId::Bebop, first.clone());
    let report = runner(
        &key,
        the_plan.clone(),
        test_config(1, false),
        ledger.clone(),
        Arc::new(registry),
    )
    .run()
    .await;
    assert!(report.success);
    assert_eq!(first.calls.load(Ordering::SeqCst), 2);

    // Second run over the same wallet: nothing pending, no dispatches.
    let second = Counting::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, second.clone());
    registry.register(TaskId::Bebop, second.clone());
    let report = runner(
        &key,
        the_plan,
        test_config(1, false),
        ledger,
        Arc::new(registry),
    )
    .run()
    .await;
    assert!(report.success);
    assert!(report.completed.is_empty());
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_task_name_is_a_task_failure() {
    let ledger = Arc::new(TaskLedger::open_in_memory().unwrap());
    let report = runner(
        &test_key(5),
        plan(&["definitely_not_a_task"]),
        test_config(1, true),
        ledger,
        Arc::new(TaskRegistry::new()),
    )
    .run()
    .await;
    assert!(!report.success);
    assert_eq!(report.failed, vec!["definitely_not_a_task"]);
}

#[tokio::test]
async fn test_scheduler_bounds_concurrency() {
    let mut config = test_config(1, false);
    config.settings.threads = 2;
    config.flow.tasks = vec![TaskExpr::Atomic("faucet".into())];

    let gauge = Gauge::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, gauge.clone());

    let keys: Vec<String> = (1..=8).map(test_key).collect();
    let scheduler = Scheduler::new(
        Arc::new(config),
        Arc::new(Catalog::builtin()),
        Arc::new(TaskLedger::open_in_memory().unwrap()),
        Arc::new(registry),
        Arc::new(NoopInitializer),
    );

    let report = scheduler.run(&keys, &[]).await.unwrap();
    assert_eq!(report.attempted(), 8);
    assert_eq!(report.succeeded(), 8);
    assert!(gauge.max_active.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_shuffle_reorders_runs_but_not_proxy_binding() {
    let mut config = test_config(1, false);
    config.settings.threads = 1;
    config.settings.shuffle_wallets = true;
    config.flow.tasks = vec![TaskExpr::Atomic("faucet".into())];

    let recording = Recording::new();
    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, recording.clone());

    let keys: Vec<String> = (1..=5).map(test_key).collect();
    let proxies = vec!["p0".to_string(), "p1".to_string()];
    let scheduler = Scheduler::new(
        Arc::new(config),
        Arc::new(Catalog::builtin()),
        Arc::new(TaskLedger::open_in_memory().unwrap()),
        Arc::new(registry),
        Arc::new(NoopInitializer),
    );

    let report = scheduler.run(&keys, &proxies).await.unwrap();
    assert_eq!(report.attempted(), 5);
    assert_eq!(report.succeeded(), 5);

    // Every account runs exactly once, and each keeps the proxy bound
    // to its pre-shuffle position regardless of the order it ran in.
    let mut seen = recording.seen.lock().unwrap().clone();
    seen.sort();
    let expected: Vec<(usize, Option<String>)> = (1..=5)
        .map(|i| (i, Some(if i % 2 == 1 { "p0" } else { "p1" }.to_string())))
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_scheduler_runs_only_selected_accounts() {
    let mut config = test_config(1, false);
    config.settings.threads = 4;
    config.settings.exact_accounts_to_use = vec![3, 7];
    config.flow.tasks = vec![TaskExpr::Atomic("faucet".into())];

    let mut registry = TaskRegistry::new();
    registry.register(TaskId::Faucet, Counting::new());

    let keys: Vec<String> = (1..=10).map(test_key).collect();
    let scheduler = Scheduler::new(
        Arc::new(config),
        Arc::new(Catalog::builtin()),
        Arc::new(TaskLedger::open_in_memory().unwrap()),
        Arc::new(registry),
        Arc::new(NoopInitializer),
    );

    let report = scheduler.run(&keys, &[]).await.unwrap();
    let mut indices: Vec<usize> = report.accounts.iter().map(|a| a.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![3, 7]);
    assert!((report.success_rate() - 100.0).abs() < f64::EPSILON);
}
