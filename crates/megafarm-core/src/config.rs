//! Megafarm run configuration.
//!
//! Loaded once per invocation from a TOML file and passed explicitly
//! into the scheduler and runners — there is no ambient config
//! singleton, which keeps unit tests free to build their own.

use serde::{Deserialize, Serialize};
use std::path::Path;

use megafarm_tasks::TaskExpr;

use crate::error::{MegafarmError, Result};

/// Root configuration, immutable for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub rpcs: RpcsConfig,
    #[serde(default)]
    pub others: OthersConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MegafarmError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| MegafarmError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.settings.threads == 0 {
            return Err(MegafarmError::Config("settings.threads must be >= 1".into()));
        }
        if self.settings.attempts == 0 {
            return Err(MegafarmError::Config("settings.attempts must be >= 1".into()));
        }
        let (start, end) = self.settings.accounts_range;
        if (start == 0) != (end == 0) || start > end && end != 0 {
            return Err(MegafarmError::Config(format!(
                "settings.accounts_range [{start}, {end}] is not a valid inclusive range"
            )));
        }
        Ok(())
    }
}

/// An inclusive `[min, max]` pause interval in seconds.
///
/// Serialized as a two-element array, matching the config file shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PauseRange(pub u64, pub u64);

impl PauseRange {
    /// Draw a uniform duration in seconds from the interval.
    pub fn pick(&self, rng: &mut impl rand::Rng) -> u64 {
        let (lo, hi) = (self.0.min(self.1), self.0.max(self.1));
        rng.gen_range(lo..=hi)
    }
}

/// `[settings]` — scheduling and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Max accounts in flight at once.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Attempts per task before it is recorded as failed.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Inclusive 1-based account range; `[0, 0]` means "not set".
    #[serde(default)]
    pub accounts_range: (usize, usize),
    /// Explicit 1-based account ordinals; wins over `accounts_range`.
    #[serde(default)]
    pub exact_accounts_to_use: Vec<usize>,
    #[serde(default = "default_attempt_pause")]
    pub pause_between_attempts: PauseRange,
    #[serde(default = "default_account_pause")]
    pub random_pause_between_accounts: PauseRange,
    #[serde(default = "default_action_pause")]
    pub random_pause_between_actions: PauseRange,
    #[serde(default = "default_init_pause")]
    pub random_initialization_pause: PauseRange,
    /// Randomize the order accounts are processed in.
    #[serde(default)]
    pub shuffle_wallets: bool,
    #[serde(default = "default_confirmation_wait")]
    pub wait_for_transaction_confirmation_in_seconds: u64,
}

fn default_threads() -> usize { 1 }
fn default_attempts() -> u32 { 5 }
fn default_attempt_pause() -> PauseRange { PauseRange(3, 10) }
fn default_account_pause() -> PauseRange { PauseRange(3, 15) }
fn default_action_pause() -> PauseRange { PauseRange(3, 10) }
fn default_init_pause() -> PauseRange { PauseRange(0, 10) }
fn default_confirmation_wait() -> u64 { 120 }

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            attempts: default_attempts(),
            accounts_range: (0, 0),
            exact_accounts_to_use: Vec::new(),
            pause_between_attempts: default_attempt_pause(),
            random_pause_between_accounts: default_account_pause(),
            random_pause_between_actions: default_action_pause(),
            random_initialization_pause: default_init_pause(),
            shuffle_wallets: false,
            wait_for_transaction_confirmation_in_seconds: default_confirmation_wait(),
        }
    }
}

/// `[flow]` — what to run and how to treat failures.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowConfig {
    /// Top-level task list; entries may be atomic names, preset names,
    /// `{ group = [...] }`, or `{ one_of = [...] }`, nested arbitrarily.
    #[serde(default)]
    pub tasks: Vec<TaskExpr>,
    /// `false` aborts an account on its first failed task; `true`
    /// records the failure and moves on to the next task.
    #[serde(default)]
    pub skip_failed_tasks: bool,
}

/// `[rpcs]` — candidate RPC endpoints, tried in order at init.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RpcsConfig {
    #[serde(default)]
    pub megaeth: Vec<String>,
}

/// `[others]` — transport knobs shared by session and RPC clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OthersConfig {
    #[serde(default = "bool_true")]
    pub skip_ssl_verification: bool,
    #[serde(default = "bool_true")]
    pub use_proxy_for_rpc: bool,
}

fn bool_true() -> bool { true }

impl Default for OthersConfig {
    fn default() -> Self {
        Self {
            skip_ssl_verification: true,
            use_proxy_for_rpc: true,
        }
    }
}
