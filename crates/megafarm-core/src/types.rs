//! Report types and the uniform task result shape.

use serde::{Deserialize, Serialize};

/// Result of one task handler invocation.
///
/// Every handler returns this one shape; the retry wrapper keys off
/// `success` alone and the payload rides along untouched for the
/// caller (tx hashes, claimed amounts, quest ids).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl TaskOutcome {
    pub fn ok() -> Self {
        Self { success: true, payload: None }
    }

    pub fn ok_with(payload: serde_json::Value) -> Self {
        Self { success: true, payload: Some(payload) }
    }

    pub fn failed() -> Self {
        Self { success: false, payload: None }
    }

    pub fn failed_with(payload: serde_json::Value) -> Self {
        Self { success: false, payload: Some(payload) }
    }
}

/// Per-account outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    /// 1-based account ordinal.
    pub index: usize,
    /// Masked wallet identifier, safe to print.
    pub wallet: String,
    /// Task names completed this run, in execution order.
    pub completed: Vec<String>,
    /// Task names that failed this run, in execution order.
    pub failed: Vec<String>,
    /// True when no task failed this run (vacuously true for an
    /// empty pending list).
    pub success: bool,
}

/// Aggregate outcome across all accounts of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.accounts.len()
    }

    pub fn succeeded(&self) -> usize {
        self.accounts.iter().filter(|a| a.success).count()
    }

    /// Fraction of accounts that finished without a failed task, in
    /// percent. 100.0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.accounts.is_empty() {
            return 100.0;
        }
        self.succeeded() as f64 / self.accounts.len() as f64 * 100.0
    }
}

/// Mask a secret for logging: first six and last four characters.
///
/// Short inputs are fully masked rather than partially leaked. Counts
/// characters, not bytes: masking runs before key validation, so it
/// must not panic on arbitrary lines from the keys file.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
