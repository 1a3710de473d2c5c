//! Dynamic risks: ad-hoc, time-stamped risks logged on site
//!
//! These live on the project rather than on an assessment and carry no
//! likelihood/impact scoring.

use crate::error::{non_blank, require_text, ValidationError};
use crate::ids::{DynamicRiskId, ProjectId};
use crate::team::PersonName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback when the logger's profile is unavailable
pub const UNKNOWN_USER: &str = "Unknown User";

/// Whether the logged risk is expected to go away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RiskStatus {
    #[default]
    Temporary,
    Permanent,
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskStatus::Temporary => "Temporary",
            RiskStatus::Permanent => "Permanent",
        })
    }
}

/// A logged dynamic risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRisk {
    pub id: DynamicRiskId,
    pub project_id: ProjectId,
    pub logged_at: DateTime<Utc>,
    pub risk_description: String,
    pub control_measures_taken: String,
    pub personnel_on_site: Option<String>,
    pub is_safe_to_continue: bool,
    pub risk_status: Option<RiskStatus>,
    pub logged_by: Option<PersonName>,
}

impl DynamicRisk {
    /// Name of whoever logged the risk
    #[must_use]
    pub fn logger_name(&self) -> String {
        self.logged_by
            .as_ref()
            .map_or_else(|| UNKNOWN_USER.to_string(), |p| p.display(UNKNOWN_USER))
    }
}

/// Dynamic risk form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDynamicRisk {
    pub risk_description: String,
    pub control_measures_taken: String,
    pub personnel_on_site: Option<String>,
    pub is_safe_to_continue: bool,
    pub risk_status: RiskStatus,
}

impl Default for NewDynamicRisk {
    fn default() -> Self {
        Self {
            risk_description: String::new(),
            control_measures_taken: String::new(),
            personnel_on_site: None,
            is_safe_to_continue: true,
            risk_status: RiskStatus::Temporary,
        }
    }
}

impl NewDynamicRisk {
    /// Create new form
    #[inline]
    pub fn new(description: impl Into<String>, controls: impl Into<String>) -> Self {
        Self {
            risk_description: description.into(),
            control_measures_taken: controls.into(),
            ..Self::default()
        }
    }

    /// With personnel on site
    #[inline]
    #[must_use]
    pub fn with_personnel(mut self, personnel: impl Into<String>) -> Self {
        self.personnel_on_site = Some(personnel.into());
        self
    }

    /// Mark as not safe to continue
    #[inline]
    #[must_use]
    pub fn unsafe_to_continue(mut self) -> Self {
        self.is_safe_to_continue = false;
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: RiskStatus) -> Self {
        self.risk_status = status;
        self
    }

    /// Validate and normalize
    ///
    /// # Errors
    /// If the description or the controls taken are blank
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        require_text(&self.risk_description, "risk description")?;
        require_text(&self.control_measures_taken, "control measures taken")?;
        self.personnel_on_site = non_blank(self.personnel_on_site);
        Ok(self)
    }
}
