//! The backend contract
//!
//! Every persisted record and the two catalogue procedures go through
//! [`Backend`]. Implementations enforce the same uniqueness rules: a
//! duplicate signatory or signature is a [`BackendError::Conflict`].
//!
//! [`BackendError::Conflict`]: crate::BackendError::Conflict

use crate::error::BackendResult;
use async_trait::async_trait;
use riskdesk_model::{
    AssessmentId, AssessmentListItem, DynamicRisk, EntryId, EntryRecord, Hazard, HazardId,
    Invite, NewAssessment, NewDynamicRisk, NewProject, Profile, ProfileUpdate, Project,
    ProjectId, ProjectSummary, RaEntry, Risk, RiskAssessment, RiskId, Role, Signatory,
    Signature, TeamId, TeamMember, UserId,
};

/// Persistence and auth collaborator
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    // ----- auth / profiles -----

    /// Resolve an access token to the user it was issued for
    async fn resolve_user(&self, access_token: &str) -> BackendResult<UserId>;

    async fn get_profile(&self, user: UserId) -> BackendResult<Profile>;

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate) -> BackendResult<Profile>;

    /// Members of `team`, in backend order
    async fn list_team_members(&self, team: TeamId) -> BackendResult<Vec<TeamMember>>;

    async fn update_role(&self, user: UserId, role: Role) -> BackendResult<()>;

    async fn insert_invite(&self, invite: &Invite) -> BackendResult<()>;

    // ----- projects / assessments -----

    /// Projects of `team`, most recently edited first
    async fn list_projects(&self, team: TeamId) -> BackendResult<Vec<Project>>;

    async fn get_project(&self, id: ProjectId) -> BackendResult<Project>;

    async fn insert_project(&self, team: TeamId, project: &NewProject) -> BackendResult<Project>;

    /// Assessments filed under `project`, newest first
    async fn list_assessments(&self, project: ProjectId) -> BackendResult<Vec<AssessmentListItem>>;

    async fn get_assessment(&self, id: AssessmentId) -> BackendResult<RiskAssessment>;

    async fn insert_assessment(
        &self,
        project: &ProjectSummary,
        assessment: &NewAssessment,
    ) -> BackendResult<RiskAssessment>;

    // ----- entries -----

    /// Entries of an assessment with hazard and risk names embedded
    async fn list_entries(&self, ra: AssessmentId) -> BackendResult<Vec<RaEntry>>;

    async fn insert_entry(&self, record: &EntryRecord) -> BackendResult<RaEntry>;

    async fn update_entry(&self, id: EntryId, record: &EntryRecord) -> BackendResult<RaEntry>;

    async fn delete_entry(&self, id: EntryId) -> BackendResult<()>;

    // ----- hazard / risk catalogue -----

    /// Hazards visible to `team`, by name
    async fn list_hazards(&self, team: TeamId) -> BackendResult<Vec<Hazard>>;

    /// Risks linked to `hazard`, by name
    async fn list_risks_for_hazard(&self, hazard: HazardId) -> BackendResult<Vec<Risk>>;

    /// Id of the hazard called `name`, creating it when absent
    async fn create_hazard_if_not_exists(&self, name: &str, team: TeamId) -> BackendResult<HazardId>;

    /// Create a risk called `name` and link it to `hazard`
    async fn create_risk_and_link(
        &self,
        name: &str,
        hazard: HazardId,
        team: TeamId,
    ) -> BackendResult<RiskId>;

    // ----- dynamic risks -----

    /// Dynamic risks of `project`, most recently logged first
    async fn list_dynamic_risks(&self, project: ProjectId) -> BackendResult<Vec<DynamicRisk>>;

    async fn insert_dynamic_risk(
        &self,
        project: ProjectId,
        team: TeamId,
        logged_by: UserId,
        risk: &NewDynamicRisk,
    ) -> BackendResult<DynamicRisk>;

    // ----- sign-off -----

    async fn list_signatories(&self, ra: AssessmentId) -> BackendResult<Vec<Signatory>>;

    /// Fails with a conflict when the pair is already required
    async fn insert_signatory(&self, team: TeamId, signatory: Signatory) -> BackendResult<()>;

    async fn delete_signatory(&self, signatory: Signatory) -> BackendResult<()>;

    async fn list_signatures(&self, ra: AssessmentId) -> BackendResult<Vec<Signature>>;

    /// Fails with a conflict when `user` already signed `ra`
    async fn insert_signature(
        &self,
        team: TeamId,
        ra: AssessmentId,
        user: UserId,
    ) -> BackendResult<Signature>;
}
