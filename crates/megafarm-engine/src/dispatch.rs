//! Task dispatch: the boundary between the engine and service modules.
//!
//! Handlers are registered per [`TaskId`] — the closed identifier set —
//! so a misspelled plan entry can never silently bind to nothing. An
//! unknown or unregistered name is a logged per-task failure, not an
//! error: plans may legitimately reference modules that are not linked
//! into this build.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use megafarm_core::error::Result;
use megafarm_core::types::TaskOutcome;
use megafarm_tasks::{TaskId, TaskName};

use crate::context::AccountContext;

/// One atomic operation (claim a faucet, refuel, mint).
///
/// Handlers return `Ok` with `success = false` for ordinary failures
/// the retry wrapper should retry; `Err` is reserved for unexpected
/// breakage and propagates to the runner, which records a task failure.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, ctx: &AccountContext) -> Result<TaskOutcome>;
}

/// Registration table mapping task identifiers to handlers.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    handlers: HashMap<TaskId, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a task identifier, replacing any previous one.
    pub fn register(&mut self, id: TaskId, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(id, handler);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute one atomic task by name for the given account.
    pub async fn dispatch(&self, name: &TaskName, ctx: &AccountContext) -> Result<TaskOutcome> {
        let Some(id) = TaskId::parse(name) else {
            tracing::error!("[{}] Task {} not found", ctx.index, name);
            return Ok(TaskOutcome::failed());
        };
        let Some(handler) = self.handlers.get(&id) else {
            tracing::error!("[{}] No handler registered for task {}", ctx.index, id);
            return Ok(TaskOutcome::failed());
        };
        handler.execute(ctx).await
    }
}
