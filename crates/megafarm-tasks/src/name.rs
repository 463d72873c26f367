//! Case-folded task names.

use serde::{Deserialize, Serialize};

/// The sentinel name meaning "present in the plan, but do nothing":
/// the runner advances past it without dispatching or touching the
/// ledger.
pub const SKIP: &str = "skip";

/// An opaque, case-insensitive atomic task name.
///
/// Names are lowercased on construction so that lookups, ledger keys,
/// and dispatch all agree on one spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the `skip` no-op sentinel.
    pub fn is_skip(&self) -> bool {
        self.0 == SKIP
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
