//! # Sigpatch Utilities
//!
//! Shared utilities and logging for Sigpatch.
//!
//! This crate provides the logging infrastructure used across the Sigpatch
//! workspace, built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, init_logging, init_logging_with_level};
pub use tracing::{debug, error, info, trace, warn};
