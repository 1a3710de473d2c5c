//! Testing utilities for the riskdesk workspace
//!
//! Seeded in-memory backends, profiles and complete entry drafts.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use riskdesk_backend::{Backend, MemoryBackend};
use riskdesk_model::{
    EntryDraft, HazardId, NewAssessment, NewProject, Profile, Project, Rating, RiskAssessment,
    RiskId, Role, ScorePair, Selection, TeamId, UserId,
};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
pub const NEWCOMER_TOKEN: &str = "newcomer-token";
pub const OUTSIDER_TOKEN: &str = "outsider-token";

pub fn profile(team: TeamId, first: Option<&str>, last: Option<&str>, role: Role) -> Profile {
    Profile {
        id: UserId::new(),
        team_id: team,
        first_name: first.map(str::to_string),
        last_name: last.map(str::to_string),
        job_title: None,
        role,
    }
}

/// One team with an admin, a user, a newcomer without a name, and an
/// outsider from another team
#[derive(Debug, Clone)]
pub struct Fixture {
    pub team: TeamId,
    pub admin: Profile,
    pub user: Profile,
    pub newcomer: Profile,
    pub outsider: Profile,
    pub project: Project,
    pub assessment: RiskAssessment,
    /// Shared catalogue hazard with one linked risk
    pub hazard: HazardId,
    pub risk: RiskId,
}

/// Seed a backend with one project holding one empty assessment
pub async fn seeded() -> (MemoryBackend, Fixture) {
    let backend = MemoryBackend::new();
    let team = TeamId::new();

    let admin = profile(team, Some("Alex"), Some("Morgan"), Role::TeamAdmin);
    let user = profile(team, Some("Sam"), Some("Patel"), Role::User);
    let newcomer = profile(team, None, None, Role::User);
    let outsider = profile(TeamId::new(), Some("Jo"), Some("Reed"), Role::TeamAdmin);
    backend.add_user(ADMIN_TOKEN, admin.clone());
    backend.add_user(USER_TOKEN, user.clone());
    backend.add_user(NEWCOMER_TOKEN, newcomer.clone());
    backend.add_user(OUTSIDER_TOKEN, outsider.clone());

    let hazard = backend.add_hazard("Working at height", None);
    let risk = backend.add_risk("Fall from ladder", hazard, None);

    let project = backend
        .insert_project(
            team,
            &NewProject::new("Station refurbishment").with_reference("SR-01"),
        )
        .await
        .unwrap();
    let assessment = backend
        .insert_assessment(&project.summary(), &NewAssessment::new("Platform works"))
        .await
        .unwrap();

    let fixture = Fixture {
        team,
        admin,
        user,
        newcomer,
        outsider,
        project,
        assessment,
        hazard,
        risk,
    };
    (backend, fixture)
}

/// A draft that passes validation, picking existing catalogue items
pub fn complete_draft(hazard: HazardId, risk: RiskId) -> EntryDraft {
    EntryDraft::new()
        .with_task("Replace canopy lighting")
        .with_hazard(Selection::Existing(hazard))
        .with_risk(Selection::Existing(risk))
        .with_initial(ScorePair::new(Rating::FOUR, Rating::FOUR))
        .with_controls("Use a podium step; second person to foot")
        .with_resultant(ScorePair::new(Rating::TWO, Rating::TWO))
}

/// A draft naming a new hazard and a new risk
pub fn draft_with_new_catalogue(hazard: &str, risk: &str) -> EntryDraft {
    EntryDraft::new()
        .with_task("Cut back vegetation")
        .with_hazard(Selection::CreateNew(hazard.to_string()))
        .with_risk(Selection::CreateNew(risk.to_string()))
        .with_controls("Gloves and eye protection")
}
