//! Base error type.
//!
//! Sub-crates define their own error enums and wrap `HvError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::AgentId;

/// The top-level error type for `hv-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum HvError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    /// Invalid parameter value.  Always fatal at init.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parameter file could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `hv-*` crates.
pub type HvResult<T> = Result<T, HvError>;
