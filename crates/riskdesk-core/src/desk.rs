//! The riskdesk service
//!
//! [`RiskDesk`] applies authorization and validation, then drives the
//! [`Backend`]. Every operation takes the acting [`Session`] explicitly.
//! Records owned by another team read as not found.

use crate::error::{DeskError, DeskResult};
use crate::session::{route_guard, RouteDecision, Session};
use crate::views::{AssessmentView, CsvExport, ProjectView};
use futures::try_join;
use riskdesk_backend::{Backend, BackendError};
use riskdesk_model::{
    export_file_name, to_csv, AssessmentId, CsvOptions, DynamicRisk, EntryDraft, EntryId, Hazard,
    HazardId, Invite, NewAssessment, NewDynamicRisk, NewInvite, NewProject, Project, ProjectId,
    ProfileUpdate, RaEntry, Risk, RiskAssessment, RiskId, Role, Selection, Signatory, Signature,
    SignoffError, SignoffLedger, SignoffState, TeamMember, Transition, UserId, ValidationError,
};
use tracing::{debug, info, warn};

/// Service over a [`Backend`]
#[derive(Debug)]
pub struct RiskDesk<B> {
    backend: B,
    export: CsvOptions,
}

impl<B: Backend> RiskDesk<B> {
    /// Create new service with default export options
    #[inline]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            export: CsvOptions::default(),
        }
    }

    /// With export options
    #[inline]
    #[must_use]
    pub fn with_export_options(mut self, export: CsvOptions) -> Self {
        self.export = export;
        self
    }

    /// Underlying backend
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ----- session / profile -----

    /// Resolve `access_token` and load the user's profile
    ///
    /// # Errors
    /// Backend rejection for bad tokens, not found without a profile
    pub async fn open_session(&self, access_token: &str) -> DeskResult<Session> {
        let user = self
            .backend
            .resolve_user(access_token)
            .await
            .map_err(|e| failed("resolve user", e))?;
        let profile = self
            .backend
            .get_profile(user)
            .await
            .map_err(|e| failed("load profile", e))?;
        debug!(user = %user, team = %profile.team_id, "session opened");
        Ok(Session::from(&profile))
    }

    /// Profile-completion gate
    #[inline]
    #[must_use]
    pub fn route_guard(&self, session: &Session, path: &str) -> RouteDecision {
        route_guard(session, path)
    }

    /// Save the user's name and job title; returns the refreshed session
    ///
    /// # Errors
    /// Validation if a name is blank, rejection from the backend
    pub async fn complete_profile(
        &self,
        session: &Session,
        update: ProfileUpdate,
    ) -> DeskResult<Session> {
        let update = update.validate()?;
        let profile = self
            .backend
            .update_profile(session.user_id, &update)
            .await
            .map_err(|e| failed("update profile", e))?;
        info!(user = %session.user_id, "profile completed");
        Ok(Session::from(&profile))
    }

    // ----- projects -----

    /// The team's projects, most recently edited first
    ///
    /// # Errors
    /// Backend rejection
    pub async fn list_projects(&self, session: &Session) -> DeskResult<Vec<Project>> {
        let projects = self
            .backend
            .list_projects(session.team_id)
            .await
            .map_err(|e| failed("list projects", e))?;
        debug!(team = %session.team_id, count = projects.len(), "projects listed");
        Ok(projects)
    }

    /// Create a project for the session's team
    ///
    /// # Errors
    /// Forbidden for non-admins, validation for a blank name
    pub async fn create_project(&self, session: &Session, form: NewProject) -> DeskResult<Project> {
        session.require_admin("create projects")?;
        let form = form.validate()?;
        let project = self
            .backend
            .insert_project(session.team_id, &form)
            .await
            .map_err(|e| failed("create project", e))?;
        info!(project = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Project page: details, assessments and dynamic risks
    ///
    /// # Errors
    /// Not found for a missing or foreign project
    pub async fn project_view(&self, session: &Session, id: ProjectId) -> DeskResult<ProjectView> {
        let (project, assessments, dynamic_risks) = try_join!(
            self.backend.get_project(id),
            self.backend.list_assessments(id),
            self.backend.list_dynamic_risks(id),
        )
        .map_err(|e| failed("load project", e))?;
        ensure_team(session, project.team_id == session.team_id, "project")?;
        debug!(project = %id, assessments = assessments.len(), "project loaded");
        Ok(ProjectView {
            project,
            assessments,
            dynamic_risks,
            can_manage: session.is_admin(),
        })
    }

    async fn team_project(&self, session: &Session, id: ProjectId) -> DeskResult<Project> {
        let project = self
            .backend
            .get_project(id)
            .await
            .map_err(|e| failed("load project", e))?;
        ensure_team(session, project.team_id == session.team_id, "project")?;
        Ok(project)
    }

    // ----- assessments -----

    /// File a new assessment under a project
    ///
    /// # Errors
    /// Forbidden for non-admins, validation for a blank name, not found
    /// for a foreign project
    pub async fn create_assessment(
        &self,
        session: &Session,
        project: ProjectId,
        form: NewAssessment,
    ) -> DeskResult<RiskAssessment> {
        session.require_admin("create risk assessments")?;
        let form = form.validate()?;
        let project = self.team_project(session, project).await?;
        let assessment = self
            .backend
            .insert_assessment(&project.summary(), &form)
            .await
            .map_err(|e| failed("create assessment", e))?;
        info!(ra = %assessment.id, project = %project.id, "assessment created");
        Ok(assessment)
    }

    async fn team_assessment(&self, session: &Session, id: AssessmentId) -> DeskResult<RiskAssessment> {
        let assessment = self
            .backend
            .get_assessment(id)
            .await
            .map_err(|e| failed("load assessment", e))?;
        ensure_team(session, assessment.team_id() == session.team_id, "risk assessment")?;
        Ok(assessment)
    }

    /// Assessment page: entries, team and sign-off roster
    ///
    /// # Errors
    /// Not found for a missing or foreign assessment
    pub async fn assessment_view(
        &self,
        session: &Session,
        id: AssessmentId,
    ) -> DeskResult<AssessmentView> {
        let assessment = self.team_assessment(session, id).await?;
        let (entries, members, signatories, signatures) = try_join!(
            self.backend.list_entries(id),
            self.backend.list_team_members(assessment.team_id()),
            self.backend.list_signatories(id),
            self.backend.list_signatures(id),
        )
        .map_err(|e| failed("load assessment", e))?;
        let ledger = SignoffLedger::from_rows(signatories, signatures);
        let roster = ledger.roster(&members, session.user_id);
        debug!(ra = %id, entries = entries.len(), "assessment loaded");
        Ok(AssessmentView {
            assessment,
            entries,
            members,
            ledger,
            roster,
            can_manage: session.is_admin(),
        })
    }

    // ----- catalogue -----

    /// Hazards the team can pick from
    ///
    /// # Errors
    /// Backend rejection
    pub async fn list_hazards(&self, session: &Session) -> DeskResult<Vec<Hazard>> {
        self.backend
            .list_hazards(session.team_id)
            .await
            .map_err(|e| failed("list hazards", e))
    }

    /// Risks linked to a hazard
    ///
    /// # Errors
    /// Backend rejection
    pub async fn risks_for_hazard(
        &self,
        _session: &Session,
        hazard: HazardId,
    ) -> DeskResult<Vec<Risk>> {
        self.backend
            .list_risks_for_hazard(hazard)
            .await
            .map_err(|e| failed("list risks", e))
    }

    // ----- entries -----

    /// Create (`editing == None`) or update an entry from a draft
    ///
    /// New hazards and risks named in the draft are created first through
    /// the catalogue procedures. An edited entry must belong to `ra`.
    ///
    /// # Errors
    /// Validation before any backend call; not found for a foreign
    /// assessment or an entry of another assessment; rejection if any
    /// write fails
    pub async fn save_entry(
        &self,
        session: &Session,
        ra: AssessmentId,
        draft: EntryDraft,
        editing: Option<EntryId>,
    ) -> DeskResult<RaEntry> {
        draft.validate()?;
        self.team_assessment(session, ra).await?;
        if let Some(id) = editing {
            self.ensure_entry_of(ra, id).await?;
        }
        let hazard_id = self.resolve_hazard(session, &draft.hazard).await?;
        let risk_id = self.resolve_risk(session, &draft.risk, hazard_id).await?;
        let record = draft.into_record(ra, hazard_id, risk_id);

        let entry = match editing {
            Some(id) => self
                .backend
                .update_entry(id, &record)
                .await
                .map_err(|e| failed("update entry", e))?,
            None => self
                .backend
                .insert_entry(&record)
                .await
                .map_err(|e| failed("create entry", e))?,
        };
        info!(
            ra = %ra,
            entry = %entry.id,
            initial = %entry.initial_risk(),
            resultant = %entry.resultant_risk(),
            "entry saved"
        );
        Ok(entry)
    }

    async fn resolve_hazard(&self, session: &Session, choice: &Selection<HazardId>) -> DeskResult<HazardId> {
        match choice {
            Selection::Existing(id) => Ok(*id),
            Selection::CreateNew(name) => {
                let id = self
                    .backend
                    .create_hazard_if_not_exists(name.trim(), session.team_id)
                    .await
                    .map_err(|e| failed("create hazard", e))?;
                info!(hazard = %id, name = name.trim(), "hazard resolved");
                Ok(id)
            }
            Selection::Unselected => Err(ValidationError::missing("hazard").into()),
        }
    }

    async fn resolve_risk(
        &self,
        session: &Session,
        choice: &Selection<RiskId>,
        hazard: HazardId,
    ) -> DeskResult<RiskId> {
        match choice {
            Selection::Existing(id) => Ok(*id),
            Selection::CreateNew(name) => {
                let id = self
                    .backend
                    .create_risk_and_link(name.trim(), hazard, session.team_id)
                    .await
                    .map_err(|e| failed("create risk", e))?;
                info!(risk = %id, hazard = %hazard, name = name.trim(), "risk created");
                Ok(id)
            }
            Selection::Unselected => Err(ValidationError::missing("risk").into()),
        }
    }

    async fn ensure_entry_of(&self, ra: AssessmentId, id: EntryId) -> DeskResult<()> {
        let entries = self
            .backend
            .list_entries(ra)
            .await
            .map_err(|e| failed("load entries", e))?;
        if entries.iter().any(|entry| entry.id == id) {
            Ok(())
        } else {
            debug!(ra = %ra, entry = %id, "entry is not part of the assessment");
            Err(DeskError::not_found("entry"))
        }
    }

    /// Delete an entry of `ra`
    ///
    /// # Errors
    /// Not found for a foreign assessment or an entry of another
    /// assessment; backend rejection
    pub async fn delete_entry(
        &self,
        session: &Session,
        ra: AssessmentId,
        id: EntryId,
    ) -> DeskResult<()> {
        self.team_assessment(session, ra).await?;
        self.ensure_entry_of(ra, id).await?;
        self.backend
            .delete_entry(id)
            .await
            .map_err(|e| failed("delete entry", e))?;
        info!(ra = %ra, entry = %id, user = %session.user_id, "entry deleted");
        Ok(())
    }

    // ----- dynamic risks -----

    /// Log a dynamic risk on a project
    ///
    /// # Errors
    /// Validation for blank fields, not found for a foreign project
    pub async fn log_dynamic_risk(
        &self,
        session: &Session,
        project: ProjectId,
        form: NewDynamicRisk,
    ) -> DeskResult<DynamicRisk> {
        let form = form.validate()?;
        let project = self.team_project(session, project).await?;
        let risk = self
            .backend
            .insert_dynamic_risk(project.id, project.team_id, session.user_id, &form)
            .await
            .map_err(|e| failed("log dynamic risk", e))?;
        info!(
            project = %project.id,
            risk = %risk.id,
            safe = risk.is_safe_to_continue,
            "dynamic risk logged"
        );
        Ok(risk)
    }

    // ----- sign-off -----

    async fn ledger(&self, ra: AssessmentId) -> DeskResult<SignoffLedger> {
        let (signatories, signatures) = try_join!(
            self.backend.list_signatories(ra),
            self.backend.list_signatures(ra),
        )
        .map_err(|e| failed("load sign-off", e))?;
        Ok(SignoffLedger::from_rows(signatories, signatures))
    }

    /// Mark `user`, a member of the assessment's team, as a required
    /// signatory
    ///
    /// Marking someone already required is a no-op.
    ///
    /// # Errors
    /// `SignoffError::NotAdmin` for non-admins, not found when `user` is
    /// not on the team
    pub async fn require_signatory(
        &self,
        session: &Session,
        ra: AssessmentId,
        user: UserId,
    ) -> DeskResult<Transition> {
        let assessment = self.team_assessment(session, ra).await?;
        let (members, signatories, signatures) = try_join!(
            self.backend.list_team_members(assessment.team_id()),
            self.backend.list_signatories(ra),
            self.backend.list_signatures(ra),
        )
        .map_err(|e| failed("load sign-off", e))?;
        let ledger = SignoffLedger::from_rows(signatories, signatures);
        let change = ledger.check_require(session.role, user)?;
        ensure_team(session, members.iter().any(|m| m.id == user), "team member")?;
        if change == Transition::Unchanged {
            return Ok(Transition::Unchanged);
        }
        let signatory = Signatory { ra_id: ra, user_id: user };
        match self
            .backend
            .insert_signatory(assessment.team_id(), signatory)
            .await
        {
            Ok(()) => {
                info!(ra = %ra, user = %user, "signatory required");
                Ok(Transition::Applied)
            }
            Err(BackendError::Conflict { .. }) => {
                debug!(ra = %ra, user = %user, "signatory already required");
                Ok(Transition::Unchanged)
            }
            Err(e) => Err(failed("require signatory", e)),
        }
    }

    /// Remove `user` from the required signatories
    ///
    /// An existing signature is kept.
    ///
    /// # Errors
    /// `SignoffError::NotAdmin` for non-admins
    pub async fn remove_signatory(
        &self,
        session: &Session,
        ra: AssessmentId,
        user: UserId,
    ) -> DeskResult<Transition> {
        self.team_assessment(session, ra).await?;
        let ledger = self.ledger(ra).await?;
        if ledger.check_unrequire(session.role, user)? == Transition::Unchanged {
            return Ok(Transition::Unchanged);
        }
        self.backend
            .delete_signatory(Signatory { ra_id: ra, user_id: user })
            .await
            .map_err(|e| failed("remove signatory", e))?;
        if ledger.state_of(user) == SignoffState::Signed {
            info!(ra = %ra, user = %user, "signatory removed, signature kept");
        } else {
            info!(ra = %ra, user = %user, "signatory removed");
        }
        Ok(Transition::Applied)
    }

    /// Sign an assessment as `target`, who must be the session user
    ///
    /// # Errors
    /// - `SignoffError::OnBehalfOf` when signing for someone else
    /// - `SignoffError::NotRequired` when not a required signatory
    /// - `SignoffError::AlreadySigned` on a second attempt, including one
    ///   that loses a race against a concurrent signature
    pub async fn sign(
        &self,
        session: &Session,
        ra: AssessmentId,
        target: UserId,
    ) -> DeskResult<Signature> {
        let assessment = self.team_assessment(session, ra).await?;
        let ledger = self.ledger(ra).await?;
        ledger.check_sign(session.user_id, target)?;
        match self
            .backend
            .insert_signature(assessment.team_id(), ra, target)
            .await
        {
            Ok(signature) => {
                info!(ra = %ra, user = %target, at = %signature.signed_at, "assessment signed");
                Ok(signature)
            }
            Err(BackendError::Conflict { .. }) => {
                warn!(ra = %ra, user = %target, "duplicate signature rejected");
                Err(SignoffError::AlreadySigned { user: target }.into())
            }
            Err(e) => Err(failed("sign assessment", e)),
        }
    }

    /// Sign-off state of `user` on an assessment
    ///
    /// # Errors
    /// Not found for a foreign assessment
    pub async fn signoff_state(
        &self,
        session: &Session,
        ra: AssessmentId,
        user: UserId,
    ) -> DeskResult<SignoffState> {
        self.team_assessment(session, ra).await?;
        Ok(self.ledger(ra).await?.state_of(user))
    }

    // ----- export -----

    /// Render an assessment's entries as CSV; `None` when it has none
    ///
    /// # Errors
    /// Not found for a foreign assessment
    pub async fn export_csv(
        &self,
        session: &Session,
        ra: AssessmentId,
    ) -> DeskResult<Option<CsvExport>> {
        self.team_assessment(session, ra).await?;
        let entries = self
            .backend
            .list_entries(ra)
            .await
            .map_err(|e| failed("load entries", e))?;
        if entries.is_empty() {
            debug!(ra = %ra, "nothing to export");
            return Ok(None);
        }
        let content = to_csv(&entries, &self.export)?;
        info!(ra = %ra, rows = entries.len(), "assessment exported");
        Ok(Some(CsvExport {
            file_name: export_file_name(ra),
            content,
        }))
    }

    // ----- team -----

    /// Members of the session's team
    ///
    /// # Errors
    /// Backend rejection
    pub async fn team_members(&self, session: &Session) -> DeskResult<Vec<TeamMember>> {
        self.backend
            .list_team_members(session.team_id)
            .await
            .map_err(|e| failed("list team", e))
    }

    /// Invite someone to the team
    ///
    /// # Errors
    /// Forbidden for non-admins, validation for a bad email
    pub async fn invite_member(&self, session: &Session, form: NewInvite) -> DeskResult<Invite> {
        session.require_admin("invite members")?;
        let invite = form.into_invite(session.team_id)?;
        self.backend
            .insert_invite(&invite)
            .await
            .map_err(|e| failed("create invite", e))?;
        info!(team = %session.team_id, role = %invite.role, "invite created");
        Ok(invite)
    }

    /// Change a team member's role
    ///
    /// # Errors
    /// Forbidden for non-admins, not found for non-members
    pub async fn change_role(&self, session: &Session, user: UserId, role: Role) -> DeskResult<()> {
        session.require_admin("change roles")?;
        let members = self.team_members(session).await?;
        ensure_team(session, members.iter().any(|m| m.id == user), "team member")?;
        self.backend
            .update_role(user, role)
            .await
            .map_err(|e| failed("change role", e))?;
        info!(user = %user, role = %role, "role changed");
        Ok(())
    }
}

/// Log and wrap a backend failure
fn failed(operation: &'static str, err: BackendError) -> DeskError {
    warn!(operation, error = %err, "backend call failed");
    DeskError::Backend(err)
}

fn ensure_team(session: &Session, owned: bool, what: &str) -> DeskResult<()> {
    if owned {
        Ok(())
    } else {
        debug!(team = %session.team_id, what, "record belongs to another team");
        Err(DeskError::not_found(what))
    }
}
