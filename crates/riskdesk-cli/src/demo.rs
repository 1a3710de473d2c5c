//! Seeded in-memory workspace for `--demo`

use anyhow::Result;
use riskdesk_backend::{Backend, MemoryBackend};
use riskdesk_model::{
    AssessmentId, EntryDraft, NewAssessment, NewDynamicRisk, NewProject, Profile, Rating, Role,
    ScorePair, Selection, Signatory, TeamId, UserId,
};
use tracing::debug;

/// Token of the demo team admin
pub(crate) const DEMO_TOKEN: &str = "demo-admin";
/// Token of the demo operative
pub(crate) const OPERATIVE_TOKEN: &str = "demo-operative";

pub(crate) struct Demo {
    pub(crate) backend: MemoryBackend,
    pub(crate) assessment: AssessmentId,
}

fn person(team: TeamId, first: &str, last: &str, job: &str, role: Role) -> Profile {
    Profile {
        id: UserId::new(),
        team_id: team,
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        job_title: Some(job.to_string()),
        role,
    }
}

/// One project with a two-entry assessment; the operative has signed,
/// the admin has not.
pub(crate) async fn seed() -> Result<Demo> {
    let backend = MemoryBackend::new();
    let team = TeamId::new();

    let admin = person(team, "Dana", "Hughes", "Site manager", Role::TeamAdmin);
    let operative = person(team, "Sam", "Patel", "Roofer", Role::User);
    backend.add_user(DEMO_TOKEN, admin.clone());
    backend.add_user(OPERATIVE_TOKEN, operative.clone());

    let height = backend.add_hazard("Working at height", None);
    let fall = backend.add_risk("Fall from height", height, None);
    let handling = backend.add_hazard("Manual handling", None);
    let strain = backend.add_risk("Back strain", handling, None);

    let project = backend
        .insert_project(
            team,
            &NewProject::new("Riverside depot")
                .with_reference("RD-104")
                .with_address("Wharf Road")
                .with_what3words("filled.count.soap"),
        )
        .await?;
    let ra = backend
        .insert_assessment(
            &project.summary(),
            &NewAssessment::new("Roof repairs").with_description("Replace damaged sheeting"),
        )
        .await?;

    let entries = [
        (
            EntryDraft::new()
                .with_task("Replace roof sheets")
                .with_hazard(Selection::Existing(height))
                .with_initial(ScorePair::new(Rating::FOUR, Rating::FIVE))
                .with_controls("Edge protection, harness, work in pairs")
                .with_resultant(ScorePair::new(Rating::ONE, Rating::FIVE)),
            height,
            fall,
        ),
        (
            EntryDraft::new()
                .with_task("Lift sheets to roof")
                .with_hazard(Selection::Existing(handling))
                .with_controls("Use hoist, \"two-person\" lift for offcuts")
                .with_resultant(ScorePair::new(Rating::TWO, Rating::TWO)),
            handling,
            strain,
        ),
    ];
    for (draft, hazard, risk) in entries {
        backend
            .insert_entry(&draft.into_record(ra.id, hazard, risk))
            .await?;
    }

    backend
        .insert_dynamic_risk(
            project.id,
            team,
            operative.id,
            &NewDynamicRisk::new("High winds forecast", "Pause sheet lifting above 25 mph"),
        )
        .await?;

    for user in [admin.id, operative.id] {
        backend
            .insert_signatory(team, Signatory { ra_id: ra.id, user_id: user })
            .await?;
    }
    backend.insert_signature(team, ra.id, operative.id).await?;

    debug!(ra = %ra.id, project = %project.id, "demo data seeded");
    Ok(Demo {
        backend,
        assessment: ra.id,
    })
}
