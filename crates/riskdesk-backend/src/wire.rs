//! Row and payload shapes as the REST backend sends and accepts them

use crate::error::BackendError;
use crate::normalize::embedded;
use chrono::{DateTime, Utc};
use riskdesk_model::{
    AssessmentId, DynamicRisk, DynamicRiskId, EntryId, HazardId, NamedRef, NewAssessment,
    NewDynamicRisk, NewProject, PersonName, ProfileUpdate, ProjectId, ProjectSummary, RaEntry,
    Rating, RiskAssessment, RiskId, RiskStatus, Role, TeamId, UserId,
};
use serde::{Deserialize, Serialize};

/// Embed used when reading entries
pub(crate) const ENTRY_SELECT: &str = "*,hazard:hazards(name),risk:risks(name)";
/// Embed used when reading assessments
pub(crate) const ASSESSMENT_SELECT: &str = "*,project:projects(id,name,team_id)";
/// Embed used when reading dynamic risks
pub(crate) const DYNAMIC_RISK_SELECT: &str = "*,logged_by:profiles(first_name,last_name)";

/// `ra_entries` row with its hazard and risk names
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EntryRow {
    pub(crate) id: EntryId,
    pub(crate) ra_id: AssessmentId,
    #[serde(default)]
    pub(crate) task_description: Option<String>,
    pub(crate) hazard_id: HazardId,
    #[serde(default, deserialize_with = "embedded")]
    pub(crate) hazard: Option<NamedRef>,
    pub(crate) risk_id: RiskId,
    #[serde(default, deserialize_with = "embedded")]
    pub(crate) risk: Option<NamedRef>,
    #[serde(default)]
    pub(crate) person_affected: Option<String>,
    pub(crate) initial_likelihood: Rating,
    pub(crate) initial_impact: Rating,
    #[serde(default)]
    pub(crate) control_measures: Option<String>,
    pub(crate) resultant_likelihood: Rating,
    pub(crate) resultant_impact: Rating,
}

impl From<EntryRow> for RaEntry {
    fn from(row: EntryRow) -> Self {
        RaEntry {
            id: row.id,
            ra_id: row.ra_id,
            task_description: row.task_description,
            hazard_id: row.hazard_id,
            hazard: row.hazard,
            risk_id: row.risk_id,
            risk: row.risk,
            person_affected: row.person_affected,
            initial_likelihood: row.initial_likelihood,
            initial_impact: row.initial_impact,
            control_measures: row.control_measures,
            resultant_likelihood: row.resultant_likelihood,
            resultant_impact: row.resultant_impact,
        }
    }
}

/// `risk_assessments` row with its project
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssessmentRow {
    pub(crate) id: AssessmentId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "embedded")]
    pub(crate) project: Option<ProjectSummary>,
}

impl TryFrom<AssessmentRow> for RiskAssessment {
    type Error = BackendError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let project = row
            .project
            .ok_or_else(|| BackendError::not_found(format!("project of assessment {}", row.id)))?;
        Ok(RiskAssessment {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            project,
        })
    }
}

/// `dynamic_risks` row with the logger's name
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DynamicRiskRow {
    pub(crate) id: DynamicRiskId,
    pub(crate) project_id: ProjectId,
    pub(crate) logged_at: DateTime<Utc>,
    pub(crate) risk_description: String,
    pub(crate) control_measures_taken: String,
    #[serde(default)]
    pub(crate) personnel_on_site: Option<String>,
    pub(crate) is_safe_to_continue: bool,
    #[serde(default)]
    pub(crate) risk_status: Option<RiskStatus>,
    #[serde(default, deserialize_with = "embedded")]
    pub(crate) logged_by: Option<PersonName>,
}

impl From<DynamicRiskRow> for DynamicRisk {
    fn from(row: DynamicRiskRow) -> Self {
        DynamicRisk {
            id: row.id,
            project_id: row.project_id,
            logged_at: row.logged_at,
            risk_description: row.risk_description,
            control_measures_taken: row.control_measures_taken,
            personnel_on_site: row.personnel_on_site,
            is_safe_to_continue: row.is_safe_to_continue,
            risk_status: row.risk_status,
            logged_by: row.logged_by,
        }
    }
}

/// `projects` insert payload
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProjectInsert<'a> {
    pub(crate) team_id: TeamId,
    pub(crate) name: &'a str,
    pub(crate) reference: Option<&'a str>,
    pub(crate) location_address: Option<&'a str>,
    pub(crate) location_what3words: Option<&'a str>,
}

impl<'a> ProjectInsert<'a> {
    pub(crate) fn new(team_id: TeamId, form: &'a NewProject) -> Self {
        Self {
            team_id,
            name: &form.name,
            reference: form.reference.as_deref(),
            location_address: form.location_address.as_deref(),
            location_what3words: form.location_what3words.as_deref(),
        }
    }
}

/// `risk_assessments` insert payload
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AssessmentInsert<'a> {
    pub(crate) project_id: ProjectId,
    pub(crate) team_id: TeamId,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
}

impl<'a> AssessmentInsert<'a> {
    pub(crate) fn new(project: &ProjectSummary, form: &'a NewAssessment) -> Self {
        Self {
            project_id: project.id,
            team_id: project.team_id,
            name: &form.name,
            description: form.description.as_deref(),
        }
    }
}

/// `dynamic_risks` insert payload
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DynamicRiskInsert<'a> {
    pub(crate) project_id: ProjectId,
    pub(crate) team_id: TeamId,
    pub(crate) logged_by_user_id: UserId,
    pub(crate) risk_description: &'a str,
    pub(crate) personnel_on_site: Option<&'a str>,
    pub(crate) control_measures_taken: &'a str,
    pub(crate) is_safe_to_continue: bool,
    pub(crate) risk_status: RiskStatus,
}

impl<'a> DynamicRiskInsert<'a> {
    pub(crate) fn new(
        project_id: ProjectId,
        team_id: TeamId,
        logged_by: UserId,
        form: &'a NewDynamicRisk,
    ) -> Self {
        Self {
            project_id,
            team_id,
            logged_by_user_id: logged_by,
            risk_description: &form.risk_description,
            personnel_on_site: form.personnel_on_site.as_deref(),
            control_measures_taken: &form.control_measures_taken,
            is_safe_to_continue: form.is_safe_to_continue,
            risk_status: form.risk_status,
        }
    }
}

/// `ra_signatories` / `ra_signatures` insert payload
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct SignoffInsert {
    pub(crate) ra_id: AssessmentId,
    pub(crate) user_id: UserId,
    pub(crate) team_id: TeamId,
}

/// `profiles` name patch
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProfilePatch<'a> {
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) job_title: Option<&'a str>,
}

impl<'a> From<&'a ProfileUpdate> for ProfilePatch<'a> {
    fn from(update: &'a ProfileUpdate) -> Self {
        Self {
            first_name: &update.first_name,
            last_name: &update.last_name,
            job_title: update.job_title.as_deref(),
        }
    }
}

/// `profiles` role patch
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct RolePatch {
    pub(crate) role: Role,
}

/// `create_hazard_if_not_exists` arguments
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HazardProcArgs<'a> {
    pub(crate) hazard_name: &'a str,
    pub(crate) p_team_id: TeamId,
}

/// `create_risk_and_link` arguments
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RiskProcArgs<'a> {
    pub(crate) risk_name: &'a str,
    pub(crate) p_hazard_id: HazardId,
    pub(crate) p_team_id: TeamId,
}

/// `/auth/v1/user` response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthUser {
    pub(crate) id: UserId,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) details: Option<String>,
}

impl ErrorBody {
    /// Postgres unique-violation code
    pub(crate) const UNIQUE_VIOLATION: &'static str = "23505";

    pub(crate) fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(Self::UNIQUE_VIOLATION)
    }

    pub(crate) fn describe(&self, fallback: &str) -> String {
        match (&self.message, &self.details) {
            (Some(message), Some(details)) => format!("{message} ({details})"),
            (Some(message), None) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn project_insert_carries_location() {
        let team = TeamId::new();
        let form = NewProject::new("Depot").with_what3words("filled.count.soap");
        let body = serde_json::to_value(ProjectInsert::new(team, &form)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "team_id": team.to_string(),
                "name": "Depot",
                "reference": null,
                "location_address": null,
                "location_what3words": "filled.count.soap",
            })
        );
    }

    #[test]
    fn entry_row_accepts_list_embeds() {
        let json = format!(
            r#"{{
                "id": 3, "ra_id": "{ra}", "task_description": "Lifting",
                "hazard_id": "{h}", "hazard": [{{"name": "Falling load"}}],
                "risk_id": "{r}", "risk": {{"name": "Crush injury"}},
                "person_affected": null,
                "initial_likelihood": 4, "initial_impact": 5,
                "control_measures": "Exclusion zone",
                "resultant_likelihood": 1, "resultant_impact": 5,
                "created_at": "2024-01-01T00:00:00Z"
            }}"#,
            ra = AssessmentId::new(),
            h = HazardId::new(),
            r = RiskId::new(),
        );
        let entry: RaEntry = serde_json::from_str::<EntryRow>(&json).unwrap().into();
        assert_eq!(entry.hazard_name(), Some("Falling load"));
        assert_eq!(entry.risk_name(), Some("Crush injury"));
        assert_eq!(entry.initial_risk().value(), 20);
        assert_eq!(entry.person_affected, None);
    }

    #[test]
    fn entry_row_rejects_out_of_range_rating() {
        let json = format!(
            r#"{{"id":1,"ra_id":"{}","hazard_id":"{}","risk_id":"{}",
                "initial_likelihood":6,"initial_impact":1,
                "resultant_likelihood":1,"resultant_impact":1}}"#,
            AssessmentId::new(),
            HazardId::new(),
            RiskId::new(),
        );
        assert!(serde_json::from_str::<EntryRow>(&json).is_err());
    }

    #[test]
    fn assessment_without_project_is_not_found() {
        let json = format!(
            r#"{{"id":"{}","name":"RA","created_at":"2024-05-01T09:00:00Z","project":[]}}"#,
            AssessmentId::new()
        );
        let row: AssessmentRow = serde_json::from_str(&json).unwrap();
        let err = RiskAssessment::try_from(row).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn dynamic_risk_row_with_null_logger() {
        let json = format!(
            r#"{{"id":9,"project_id":"{}","logged_at":"2024-05-01T09:00:00Z",
                "risk_description":"Wet floor","control_measures_taken":"Signs",
                "is_safe_to_continue":false,"risk_status":"Permanent","logged_by":null}}"#,
            ProjectId::new()
        );
        let risk: DynamicRisk = serde_json::from_str::<DynamicRiskRow>(&json).unwrap().into();
        assert_eq!(risk.logger_name(), "Unknown User");
        assert_eq!(risk.risk_status, Some(RiskStatus::Permanent));
    }

    #[test]
    fn error_body_detects_unique_violation() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"code":"23505","message":"duplicate key"}"#).unwrap();
        assert!(body.is_unique_violation());
        assert_eq!(body.describe("fallback"), "duplicate key");
        assert_eq!(ErrorBody::default().describe("fallback"), "fallback");
    }
}
