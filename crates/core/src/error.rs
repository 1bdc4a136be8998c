//! Domain error model.

use thiserror::Error;

/// Result type used across the domain and service layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Error taxonomy shared by every operation.
///
/// Transport adapters translate these kinds into their own status codes. The
/// core never retries; `Conflict` and `Unavailable` are the retryable kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or policy-rejected input (e.g. the unset source sentinel).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced supply, warehouse or product does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent storage conflict; the whole operation may be retried.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An outbound channel or transport is down; retryable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller may safely retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }

    /// Stable machine-readable code, used in transport error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}
