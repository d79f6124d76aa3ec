//! Invocation error types

use thiserror::Error;

/// Error types for a single model invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The model server could not be reached or refused the model
    #[error("Model server unavailable: {0}")]
    Unavailable(String),

    /// The invocation did not finish within the deadline
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// The server answered but the body was not a usable completion
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
