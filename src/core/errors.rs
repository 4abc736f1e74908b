/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::sync::LockStrategy;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for guarded value construction and configuration
pub type GuardedResult<T> = Result<T, GuardedError>;

/// Errors surfaced by configuration and strict construction
///
/// Reading and transforming a guarded value never fail; only choosing how
/// it is locked can.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum GuardedError {
    #[error("Lock strategy {requested} is not supported on this platform")]
    #[diagnostic(
        code(guarded::unsupported_strategy),
        help("Use FallbackPolicy::Substitute or pick a portable strategy such as `spin` or `mutex`.")
    )]
    UnsupportedStrategy { requested: LockStrategy },

    #[error("Unknown lock strategy: {0}")]
    #[diagnostic(
        code(guarded::invalid_strategy),
        help("Valid strategies: queue, spin, mutex, unfair, read_write, semaphore, recursive, exclusive, monitor.")
    )]
    InvalidStrategy(String),

    #[error("Unknown fallback policy: {0}")]
    #[diagnostic(
        code(guarded::invalid_fallback),
        help("Valid policies: substitute, reject.")
    )]
    InvalidFallback(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(guarded::invalid_config))]
    InvalidConfig(String),
}

impl From<serde_json::Error> for GuardedError {
    fn from(err: serde_json::Error) -> Self {
        GuardedError::InvalidConfig(err.to_string())
    }
}
