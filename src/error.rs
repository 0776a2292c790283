//! Error taxonomy for the clearing module.
//!
//! Every service-layer failure maps to one of these variants; the API layer
//! turns them into the standard `{"error": {"code", "message"}}` body. The
//! netting engine never swallows an error: an order-type violation surfaces
//! immediately with the offending type value in the message.

use thiserror::Error;

/// Service-level error. Carries enough context for the caller to report.
#[derive(Debug, Error)]
pub enum ClearingError {
    /// Malformed or out-of-range input, including unknown order types during
    /// matrix construction (aborts the whole netting computation).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials, or insufficient role.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unexpected internal failure (persistence, serialization).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClearingError {
    /// Stable API error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            ClearingError::InvalidInput(_) => "ERR_INVALID_INPUT",
            ClearingError::NotFound(_) => "ERR_NOT_FOUND",
            ClearingError::Unauthorized(_) => "ERR_UNAUTHORIZED",
            ClearingError::Internal(_) => "ERR_INTERNAL",
        }
    }
}
