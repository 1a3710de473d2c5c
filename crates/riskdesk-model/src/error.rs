//! Validation errors for user-supplied input
//!
//! These are raised before any backend call is attempted.

/// Input validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was empty or missing
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A numeric field fell outside its allowed range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A field is present but not well formed
    #[error("{field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl ValidationError {
    /// Create missing field error
    #[inline]
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Create out of range error
    #[inline]
    #[must_use]
    pub fn out_of_range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// Create malformed field error
    #[inline]
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    #[inline]
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::OutOfRange { field, .. }
            | Self::Malformed { field, .. } => field,
        }
    }
}

/// Returns `Err(MissingField)` when `value` is blank.
pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::missing(field))
    } else {
        Ok(())
    }
}

/// Blank optional text collapses to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
