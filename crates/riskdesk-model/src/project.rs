//! Projects and the risk assessments filed under them

use crate::error::{non_blank, require_text, ValidationError};
use crate::ids::{AssessmentId, ProjectId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const W3W_PREFIX: &str = "///";

/// A project (site or job) owned by a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub reference: Option<String>,
    pub team_id: TeamId,
    pub location_address: Option<String>,
    pub location_what3words: Option<String>,
    pub last_edited_at: DateTime<Utc>,
}

impl Project {
    /// Reference or `N/A`
    #[inline]
    #[must_use]
    pub fn reference_display(&self) -> &str {
        self.reference.as_deref().unwrap_or("N/A")
    }

    /// what3words address rendered with a single `///` prefix
    #[must_use]
    pub fn what3words_display(&self) -> Option<String> {
        self.location_what3words
            .as_deref()
            .map(|w| format!("{W3W_PREFIX}{}", w.trim().trim_start_matches(W3W_PREFIX)))
    }

    /// Lightweight reference embedded in assessments
    #[must_use]
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            team_id: self.team_id,
        }
    }
}

/// New project form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub reference: Option<String>,
    pub location_address: Option<String>,
    pub location_what3words: Option<String>,
}

impl NewProject {
    /// Create new form with a name
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// With reference
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// With site address
    #[inline]
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.location_address = Some(address.into());
        self
    }

    /// With what3words address
    #[inline]
    #[must_use]
    pub fn with_what3words(mut self, words: impl Into<String>) -> Self {
        self.location_what3words = Some(words.into());
        self
    }

    /// Validate and normalize blank optionals to `None`
    ///
    /// # Errors
    /// If the name is blank
    pub fn validate(self) -> Result<Self, ValidationError> {
        require_text(&self.name, "project name")?;
        Ok(Self {
            name: self.name.trim().to_string(),
            reference: non_blank(self.reference),
            location_address: non_blank(self.location_address),
            location_what3words: non_blank(self.location_what3words),
        })
    }
}

/// Project columns embedded in an assessment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub team_id: TeamId,
}

/// A risk assessment together with its owning project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: AssessmentId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub project: ProjectSummary,
}

impl RiskAssessment {
    /// Team that owns this assessment
    #[inline]
    #[must_use]
    pub fn team_id(&self) -> TeamId {
        self.project.team_id
    }
}

/// Row shown in a project's assessment list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentListItem {
    pub id: AssessmentId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&RiskAssessment> for AssessmentListItem {
    fn from(ra: &RiskAssessment) -> Self {
        Self {
            id: ra.id,
            name: ra.name.clone(),
            description: ra.description.clone(),
            created_at: ra.created_at,
        }
    }
}

/// New risk assessment form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssessment {
    pub name: String,
    pub description: Option<String>,
}

impl NewAssessment {
    /// Create new form
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// With site and risk summary
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate and normalize
    ///
    /// # Errors
    /// If the name is blank
    pub fn validate(self) -> Result<Self, ValidationError> {
        require_text(&self.name, "risk assessment name")?;
        Ok(Self {
            name: self.name.trim().to_string(),
            description: non_blank(self.description),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(w3w: Option<&str>) -> Project {
        Project {
            id: ProjectId::new(),
            name: "Depot".into(),
            reference: None,
            team_id: TeamId::new(),
            location_address: None,
            location_what3words: w3w.map(str::to_string),
            last_edited_at: Utc::now(),
        }
    }

    #[test]
    fn what3words_gets_single_prefix() {
        assert_eq!(
            project(Some("///filled.count.soap")).what3words_display().as_deref(),
            Some("///filled.count.soap")
        );
        assert_eq!(
            project(Some("filled.count.soap")).what3words_display().as_deref(),
            Some("///filled.count.soap")
        );
        assert_eq!(project(None).what3words_display(), None);
        assert_eq!(project(None).reference_display(), "N/A");
    }

    #[test]
    fn new_project_normalizes_optionals() {
        let form = NewProject::new(" Depot ")
            .with_reference("")
            .with_what3words("///a.b.c")
            .validate()
            .unwrap();
        assert_eq!(form.name, "Depot");
        assert_eq!(form.reference, None);
        assert_eq!(form.location_what3words.as_deref(), Some("///a.b.c"));

        assert!(NewProject::new("   ").validate().is_err());
    }

    #[test]
    fn new_assessment_requires_name() {
        let err = NewAssessment::new("").validate().unwrap_err();
        assert_eq!(err.field(), "risk assessment name");

        let form = NewAssessment::new("Track renewal")
            .with_description("")
            .validate()
            .unwrap();
        assert_eq!(form.description, None);
    }
}
