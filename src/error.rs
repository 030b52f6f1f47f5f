//! Error types.
//!
//! The analysis entry points never fail: stages degrade to safe defaults. These
//! errors surface only from configuration parsing helpers and the zero-shot
//! provider seam.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Configuration document could not be interpreted.
    #[error("configuration error: {0}")]
    Config(String),

    /// A single pattern failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The zero-shot provider returned an error.
    #[error("zero-shot provider error: {0}")]
    Provider(String),

    /// The zero-shot provider did not answer within the configured timeout.
    #[error("zero-shot provider timed out after {0} ms")]
    ProviderTimeout(u64),

    /// The zero-shot provider reported itself as not healthy.
    #[error("zero-shot provider unhealthy: {0}")]
    ProviderUnhealthy(String),
}

pub type Result<T> = std::result::Result<T, Error>;
