//! Logging setup for hosts and the CLI.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogError, LogGuard};
