//! # Megafarm Core
//!
//! Shared foundation for the Megafarm workspace: run configuration,
//! the error taxonomy, and the report types every other crate speaks.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, FlowConfig, OthersConfig, PauseRange, RpcsConfig, SettingsConfig};
pub use error::{MegafarmError, Result};
pub use types::{mask_key, AccountReport, RunReport, TaskOutcome};
