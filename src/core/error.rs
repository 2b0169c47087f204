//! Failure taxonomy for rate lookups

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// Currency symbol is not present in the catalog.
    #[error("Currency not found: {0}")]
    NotFound(String),

    /// Caller supplied a date that is not `YYYY-MM-DD`.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Provider rejected the currency/date combination, or its document
    /// did not carry the expected records.
    #[error("Validation failed: {}", .message.as_deref().unwrap_or("unexpected provider response"))]
    Validation { message: Option<String> },

    /// Provider could not be reached, timed out or answered with a non-success status.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl RateError {
    pub fn validation(message: impl Into<String>) -> Self {
        RateError::Validation {
            message: Some(message.into()),
        }
    }

    pub fn invalid_document() -> Self {
        RateError::Validation { message: None }
    }
}

pub type Result<T, E = RateError> = std::result::Result<T, E>;
