//! Configuration loading
//!
//! Precedence: CLI flags > `DIFF_CONTEXT_*` environment > config file > defaults.

pub mod loader;

pub use loader::{load_config, ENV_PREFIX};
