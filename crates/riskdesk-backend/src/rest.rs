//! PostgREST-style HTTP backend
//!
//! Tables live under `/rest/v1/<table>`, procedures under
//! `/rest/v1/rpc/<name>` and the token owner under `/auth/v1/user`.
//! Row visibility is decided server side by the caller's access token.

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::wire::{
    AssessmentInsert, AssessmentRow, AuthUser, DynamicRiskInsert, DynamicRiskRow, EntryRow,
    ErrorBody, HazardProcArgs, ProfilePatch, ProjectInsert, RiskProcArgs, RolePatch,
    SignoffInsert, ASSESSMENT_SELECT, DYNAMIC_RISK_SELECT, ENTRY_SELECT,
};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use riskdesk_model::{
    AssessmentId, AssessmentListItem, DynamicRisk, EntryId, EntryRecord, Hazard, HazardId,
    Invite, NewAssessment, NewDynamicRisk, NewProject, Profile, ProfileUpdate, Project,
    ProjectId, ProjectSummary, RaEntry, Risk, RiskAssessment, RiskId, Role, Signatory,
    Signature, TeamId, TeamMember, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PROFILE_SELECT: &str = "id,team_id,first_name,last_name,job_title,role";
const MEMBER_SELECT: &str = "id,first_name,last_name,role";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Connection settings for [`RestBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key sent with every request
    pub anon_key: String,
    /// Signed-in user's token; the anon key is used as bearer without one
    #[serde(default)]
    pub access_token: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    /// Create new config
    #[inline]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// With access token
    #[inline]
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// With timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new("http://localhost:54321", "")
    }
}

/// [`Backend`] over HTTP
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestBackend {
    /// Build the HTTP client
    ///
    /// # Errors
    /// `Transport` if the client cannot be constructed
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Same client, acting as the owner of `token`
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rest/v1/rpc/{procedure}", self.base)
    }

    fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        let bearer = bearer
            .or(self.access_token.as_deref())
            .unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Vec<T>> {
        debug!(table, "select");
        let request = self
            .request(Method::GET, &self.table_url(table), None)
            .query(query);
        decode(request.send().await?, table).await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<T> {
        first(self.select(table, query).await?, table)
    }

    async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
        select: &str,
    ) -> BackendResult<T> {
        debug!(table, "insert");
        let request = self
            .request(Method::POST, &self.table_url(table), None)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("select", select)])
            .json(body);
        first(decode(request.send().await?, table).await?, table)
    }

    async fn insert_only<B: Serialize + Sync>(&self, table: &str, body: &B) -> BackendResult<()> {
        debug!(table, "insert");
        let request = self
            .request(Method::POST, &self.table_url(table), None)
            .json(body);
        check(request.send().await?, table).await.map(drop)
    }

    async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
        select: &str,
    ) -> BackendResult<T> {
        debug!(table, "update");
        let request = self
            .request(Method::PATCH, &self.table_url(table), None)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(filters)
            .query(&[("select", select)])
            .json(body);
        first(decode(request.send().await?, table).await?, table)
    }

    async fn delete(&self, table: &str, filters: &[(&str, String)]) -> BackendResult<()> {
        debug!(table, "delete");
        let request = self
            .request(Method::DELETE, &self.table_url(table), None)
            .query(filters);
        check(request.send().await?, table).await.map(drop)
    }

    async fn rpc<T: DeserializeOwned, A: Serialize + Sync>(
        &self,
        procedure: &str,
        args: &A,
    ) -> BackendResult<T> {
        debug!(procedure, "rpc");
        let request = self
            .request(Method::POST, &self.rpc_url(procedure), None)
            .json(args);
        let text = check(request.send().await?, procedure).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn first<T>(rows: Vec<T>, what: &str) -> BackendResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::not_found(what))
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> BackendResult<Vec<T>> {
    let text = check(response, what).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Body text of a 2xx response, or the mapped error
async fn check(response: Response, what: &str) -> BackendResult<String> {
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        return Ok(text);
    }
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    Err(map_status(status, &body, what))
}

pub(crate) fn map_status(status: StatusCode, body: &ErrorBody, what: &str) -> BackendError {
    let message = body.describe(status.canonical_reason().unwrap_or("request failed"));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::unauthorized(message),
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => BackendError::not_found(what),
        StatusCode::CONFLICT => BackendError::conflict(message),
        _ if body.is_unique_violation() => BackendError::conflict(message),
        other => BackendError::rejected(other.as_u16(), message),
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn resolve_user(&self, access_token: &str) -> BackendResult<UserId> {
        let url = format!("{}/auth/v1/user", self.base);
        let response = self
            .request(Method::GET, &url, Some(access_token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let text = check(response, "user").await?;
        let user: AuthUser = serde_json::from_str(&text)?;
        Ok(user.id)
    }

    async fn get_profile(&self, user: UserId) -> BackendResult<Profile> {
        self.select_one(
            "profiles",
            &[("select", PROFILE_SELECT.into()), ("id", eq(user))],
        )
        .await
    }

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate) -> BackendResult<Profile> {
        self.update(
            "profiles",
            &[("id", eq(user))],
            &ProfilePatch::from(update),
            PROFILE_SELECT,
        )
        .await
    }

    async fn list_team_members(&self, team: TeamId) -> BackendResult<Vec<TeamMember>> {
        self.select(
            "profiles",
            &[("select", MEMBER_SELECT.into()), ("team_id", eq(team))],
        )
        .await
    }

    async fn update_role(&self, user: UserId, role: Role) -> BackendResult<()> {
        let _: Profile = self
            .update("profiles", &[("id", eq(user))], &RolePatch { role }, PROFILE_SELECT)
            .await?;
        Ok(())
    }

    async fn insert_invite(&self, invite: &Invite) -> BackendResult<()> {
        self.insert_only("invites", invite).await
    }

    async fn list_projects(&self, team: TeamId) -> BackendResult<Vec<Project>> {
        self.select(
            "projects",
            &[
                ("select", "*".into()),
                ("team_id", eq(team)),
                ("order", "last_edited_at.desc".into()),
            ],
        )
        .await
    }

    async fn get_project(&self, id: ProjectId) -> BackendResult<Project> {
        self.select_one("projects", &[("select", "*".into()), ("id", eq(id))])
            .await
    }

    async fn insert_project(&self, team: TeamId, project: &NewProject) -> BackendResult<Project> {
        self.insert("projects", &ProjectInsert::new(team, project), "*")
            .await
    }

    async fn list_assessments(&self, project: ProjectId) -> BackendResult<Vec<AssessmentListItem>> {
        self.select(
            "risk_assessments",
            &[
                ("select", "id,name,description,created_at".into()),
                ("project_id", eq(project)),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn get_assessment(&self, id: AssessmentId) -> BackendResult<RiskAssessment> {
        let row: AssessmentRow = self
            .select_one(
                "risk_assessments",
                &[("select", ASSESSMENT_SELECT.into()), ("id", eq(id))],
            )
            .await?;
        row.try_into()
    }

    async fn insert_assessment(
        &self,
        project: &ProjectSummary,
        assessment: &NewAssessment,
    ) -> BackendResult<RiskAssessment> {
        let row: AssessmentRow = self
            .insert(
                "risk_assessments",
                &AssessmentInsert::new(project, assessment),
                ASSESSMENT_SELECT,
            )
            .await?;
        row.try_into()
    }

    async fn list_entries(&self, ra: AssessmentId) -> BackendResult<Vec<RaEntry>> {
        let rows: Vec<EntryRow> = self
            .select(
                "ra_entries",
                &[
                    ("select", ENTRY_SELECT.into()),
                    ("ra_id", eq(ra)),
                    ("order", "id.asc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(RaEntry::from).collect())
    }

    async fn insert_entry(&self, record: &EntryRecord) -> BackendResult<RaEntry> {
        let row: EntryRow = self.insert("ra_entries", record, ENTRY_SELECT).await?;
        Ok(row.into())
    }

    async fn update_entry(&self, id: EntryId, record: &EntryRecord) -> BackendResult<RaEntry> {
        let row: EntryRow = self
            .update("ra_entries", &[("id", eq(id))], record, ENTRY_SELECT)
            .await?;
        Ok(row.into())
    }

    async fn delete_entry(&self, id: EntryId) -> BackendResult<()> {
        self.delete("ra_entries", &[("id", eq(id))]).await
    }

    async fn list_hazards(&self, _team: TeamId) -> BackendResult<Vec<Hazard>> {
        self.select(
            "hazards",
            &[("select", "id,name".into()), ("order", "name.asc".into())],
        )
        .await
    }

    async fn list_risks_for_hazard(&self, hazard: HazardId) -> BackendResult<Vec<Risk>> {
        self.select(
            "risks",
            &[
                ("select", "id,name,hazard_risks!inner(hazard_id)".into()),
                ("hazard_risks.hazard_id", eq(hazard)),
                ("order", "name.asc".into()),
            ],
        )
        .await
    }

    async fn create_hazard_if_not_exists(&self, name: &str, team: TeamId) -> BackendResult<HazardId> {
        self.rpc(
            "create_hazard_if_not_exists",
            &HazardProcArgs {
                hazard_name: name,
                p_team_id: team,
            },
        )
        .await
    }

    async fn create_risk_and_link(
        &self,
        name: &str,
        hazard: HazardId,
        team: TeamId,
    ) -> BackendResult<RiskId> {
        self.rpc(
            "create_risk_and_link",
            &RiskProcArgs {
                risk_name: name,
                p_hazard_id: hazard,
                p_team_id: team,
            },
        )
        .await
    }

    async fn list_dynamic_risks(&self, project: ProjectId) -> BackendResult<Vec<DynamicRisk>> {
        let rows: Vec<DynamicRiskRow> = self
            .select(
                "dynamic_risks",
                &[
                    ("select", DYNAMIC_RISK_SELECT.into()),
                    ("project_id", eq(project)),
                    ("order", "logged_at.desc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(DynamicRisk::from).collect())
    }

    async fn insert_dynamic_risk(
        &self,
        project: ProjectId,
        team: TeamId,
        logged_by: UserId,
        risk: &NewDynamicRisk,
    ) -> BackendResult<DynamicRisk> {
        let row: DynamicRiskRow = self
            .insert(
                "dynamic_risks",
                &DynamicRiskInsert::new(project, team, logged_by, risk),
                DYNAMIC_RISK_SELECT,
            )
            .await?;
        Ok(row.into())
    }

    async fn list_signatories(&self, ra: AssessmentId) -> BackendResult<Vec<Signatory>> {
        self.select(
            "ra_signatories",
            &[("select", "ra_id,user_id".into()), ("ra_id", eq(ra))],
        )
        .await
    }

    async fn insert_signatory(&self, team: TeamId, signatory: Signatory) -> BackendResult<()> {
        self.insert_only(
            "ra_signatories",
            &SignoffInsert {
                ra_id: signatory.ra_id,
                user_id: signatory.user_id,
                team_id: team,
            },
        )
        .await
    }

    async fn delete_signatory(&self, signatory: Signatory) -> BackendResult<()> {
        self.delete(
            "ra_signatories",
            &[("ra_id", eq(signatory.ra_id)), ("user_id", eq(signatory.user_id))],
        )
        .await
    }

    async fn list_signatures(&self, ra: AssessmentId) -> BackendResult<Vec<Signature>> {
        self.select(
            "ra_signatures",
            &[("select", "ra_id,user_id,signed_at".into()), ("ra_id", eq(ra))],
        )
        .await
    }

    async fn insert_signature(
        &self,
        team: TeamId,
        ra: AssessmentId,
        user: UserId,
    ) -> BackendResult<Signature> {
        self.insert(
            "ra_signatures",
            &SignoffInsert {
                ra_id: ra,
                user_id: user,
                team_id: team,
            },
            "ra_id,user_id,signed_at",
        )
        .await
    }
}
