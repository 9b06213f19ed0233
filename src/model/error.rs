//! Model gateway error types

use thiserror::Error;

/// Errors returned by a [`ModelGateway`](crate::model::ModelGateway)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// No credentials configured or the model service cannot be used
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// The upstream provider rejected or failed the request
    #[error("Model request failed: {0}")]
    RequestFailed(String),

    /// The call did not finish in time
    #[error("Model timeout after {0} ms")]
    Timeout(u64),
}

impl ModelError {
    /// Whether this error came from an elapsed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout(_))
    }
}
