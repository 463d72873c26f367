//! Megafarm error taxonomy.
//!
//! Two of these are run-fatal: `Config` (cannot load settings) and
//! `Ledger` (cannot determine completion state — proceeding would risk
//! duplicate on-chain side effects). Everything else is scoped to one
//! account or one task and is converted into report entries by the
//! runner rather than propagated across accounts.

use thiserror::Error;

/// All errors produced by the Megafarm crates.
#[derive(Error, Debug)]
pub enum MegafarmError {
    /// Configuration could not be loaded or is invalid. Run-fatal.
    #[error("Config error: {0}")]
    Config(String),

    /// The task ledger is unreadable or uninitialized. Run-fatal.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Session or chain-client setup failed for one account.
    #[error("Initialization error: {0}")]
    Init(String),

    /// A task handler failed in an unexpected way (network layer,
    /// malformed response). Recorded as a task failure by the runner.
    #[error("Task error: {0}")]
    Task(String),

    /// A private key could not be parsed into a wallet.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// JSON-RPC transport or protocol error.
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, MegafarmError>;

impl MegafarmError {
    /// Whether this error must stop the whole run rather than one account.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Ledger(_))
    }
}
