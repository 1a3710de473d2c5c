//! Backend error types

/// Failure reported by a backend call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Row absent, or hidden by row-level policy
    #[error("{what} not found")]
    NotFound { what: String },

    /// Uniqueness or other constraint violation
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Token missing, expired, or lacking permission
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other refusal
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// Create not found error
    #[inline]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create conflict error
    #[inline]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create unauthorized error
    #[inline]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create rejected error
    #[inline]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Check if this is a constraint conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this is a missing row
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;
