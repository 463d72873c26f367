//! # Megafarm Tasks
//!
//! Declarative task planning: what to run, in what grouping, and which
//! atomic operations exist.
//!
//! ```text
//! config [flow].tasks
//!   ├── "CRUSTY_SWAP"              → preset, expands via Catalog
//!   ├── "faucet"                   → atomic task
//!   ├── { group = [a, b, c] }      → all of them, random relative order
//!   └── { one_of = [x, y] }        → exactly one, chosen at random
//!
//! Catalog::expand → TaskExpr::resolve(rng) → flat Vec<TaskName>
//! ```
//!
//! Resolution is a pure function of (expression, rng): a seeded rng
//! reproduces the same plan, which the tests rely on. The resolver
//! knows nothing about which names are dispatchable — unknown names
//! surface later, at dispatch time, as per-task failures.

pub mod catalog;
pub mod expr;
pub mod id;
pub mod name;

pub use catalog::Catalog;
pub use expr::TaskExpr;
pub use id::TaskId;
pub use name::TaskName;
