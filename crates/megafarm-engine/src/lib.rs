//! Execution engine: everything between a parsed config and a finished
//! run report.
//!
//! The flow is layered top-down:
//!
//! - [`scheduler::Scheduler`] selects accounts, binds proxies, resolves
//!   the run's task plan, and fans runners out under a concurrency gate.
//! - [`runner::AccountRunner`] drives one account through init, its
//!   pending tasks, and cleanup.
//! - [`dispatch::TaskRegistry`] maps task names to [`dispatch::TaskHandler`]
//!   implementations; [`retry::with_retry`] wraps each dispatch.
//! - [`context::AccountContext`] owns the per-account wallet, HTTP
//!   session, and chain client that handlers borrow.

pub mod client;
pub mod context;
pub mod dispatch;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod wallet;

pub use context::{AccountContext, AccountInitializer, RpcInitializer};
pub use dispatch::{TaskHandler, TaskRegistry};
pub use retry::with_retry;
pub use runner::AccountRunner;
pub use scheduler::{Scheduler, SelectedAccount};
pub use wallet::Wallet;
