//! Error types for the service layer
//!
//! Every failure falls into one of three kinds:
//! - validation: input rejected before any backend call
//! - rejection: the backend, network or a permission rule refused the
//!   operation; stored state is unchanged
//! - not found: the record does not exist or is not visible to the team

use riskdesk_backend::BackendError;
use riskdesk_model::{ExportError, SignoffError, ValidationError};

/// Coarse classification shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Rejection,
    NotFound,
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// Form input failed validation
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Sign-off rule violated
    #[error(transparent)]
    Signoff(#[from] SignoffError),

    /// Action reserved for team admins
    #[error("only a team admin may {action}")]
    Forbidden { action: &'static str },

    /// Record absent or owned by another team
    #[error("{what} not found")]
    NotFound { what: String },

    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// CSV rendering failed
    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeskError {
    /// Create not found error
    #[inline]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskError::Validation(_) => ErrorKind::Validation,
            DeskError::NotFound { .. } => ErrorKind::NotFound,
            DeskError::Backend(err) if err.is_not_found() => ErrorKind::NotFound,
            DeskError::Signoff(_)
            | DeskError::Forbidden { .. }
            | DeskError::Backend(_)
            | DeskError::Export(_)
            | DeskError::Config(_) => ErrorKind::Rejection,
        }
    }
}

/// Result alias for service operations
pub type DeskResult<T> = Result<T, DeskError>;
