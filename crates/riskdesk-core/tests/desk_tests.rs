//! Service-level scenarios over the in-memory backend.
//!
//! Guarantees exercised here:
//! - Sessions come from access tokens, and incomplete profiles are gated.
//! - Only team admins create projects and assessments or manage the team.
//! - Records of another team read as not found.
//! - Entry saves resolve new hazards and risks through the catalogue, and
//!   entries stay inside their own assessment.
//! - Only team members can be made signatories.
//! - Sign-off follows the required/signed rules, including removal after
//!   signing.
//! - CSV export is offered only for assessments with entries.

use pretty_assertions::assert_eq;
use riskdesk_core::{
    DeskError, ErrorKind, RiskDesk, RouteDecision, Session, COMPLETE_PROFILE_PATH,
};
use riskdesk_backend::{Backend, MemoryBackend};
use riskdesk_model::{
    CsvOptions, EntryDraft, LineEnding, NewAssessment, NewDynamicRisk, NewInvite, NewProject,
    ProfileUpdate, RiskId, RiskStatus, Role, Selection, SignoffError, SignoffState, Transition,
    UserId, CSV_HEADERS,
};
use riskdesk_test_utils::{
    complete_draft, draft_with_new_catalogue, seeded, Fixture, ADMIN_TOKEN, NEWCOMER_TOKEN,
    USER_TOKEN,
};

async fn setup() -> (RiskDesk<MemoryBackend>, Fixture) {
    let (backend, fixture) = seeded().await;
    (RiskDesk::new(backend), fixture)
}

/// Tokens resolve to a session carrying the user's team and role.
#[tokio::test]
async fn test_open_session_from_token() {
    let (desk, fx) = setup().await;

    let session = desk.open_session(ADMIN_TOKEN).await.unwrap();
    assert_eq!(session.user_id, fx.admin.id);
    assert_eq!(session.team_id, fx.team);
    assert!(session.is_admin());

    let session = desk.open_session(USER_TOKEN).await.unwrap();
    assert_eq!(session.role, Role::User);
    assert_eq!(session.first_name.as_deref(), Some("Sam"));

    let err = desk.open_session("stale-token").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejection);
}

/// A user without a first name is held on the completion page until the
/// form is saved.
#[tokio::test]
async fn test_profile_gate_and_completion() {
    let (desk, _fx) = setup().await;
    let session = desk.open_session(NEWCOMER_TOKEN).await.unwrap();
    assert_eq!(
        desk.route_guard(&session, "/dashboard"),
        RouteDecision::Redirect(COMPLETE_PROFILE_PATH)
    );

    let err = desk
        .complete_profile(&session, ProfileUpdate::new("", "Jones"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let session = desk
        .complete_profile(
            &session,
            ProfileUpdate::new("Rhys", "Jones").with_job_title("Site manager"),
        )
        .await
        .unwrap();
    assert_eq!(desk.route_guard(&session, "/dashboard"), RouteDecision::Allow);
    assert!(desk.open_session(NEWCOMER_TOKEN).await.unwrap().has_complete_profile());
}

/// Non-admins cannot create projects; admins can, and the project lists
/// first for the team.
#[tokio::test]
async fn test_project_creation_is_admin_only() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);
    let admin = Session::from(&fx.admin);

    let err = desk
        .create_project(&user, NewProject::new("Depot"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::Forbidden { .. }));

    let err = desk
        .create_project(&admin, NewProject::new("   "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let project = desk
        .create_project(&admin, NewProject::new("Depot").with_reference("D-7"))
        .await
        .unwrap();
    assert_eq!(project.team_id, fx.team);

    let projects = desk.list_projects(&user).await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, project.id);
}

/// Another team's project and assessment are invisible.
#[tokio::test]
async fn test_foreign_team_records_are_not_found() {
    let (desk, fx) = setup().await;
    let outsider = Session::from(&fx.outsider);

    let err = desk.project_view(&outsider, fx.project.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = desk
        .assessment_view(&outsider, fx.assessment.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = desk
        .create_assessment(&outsider, fx.project.id, NewAssessment::new("Sneaky"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// The project view carries assessments newest first and the site log.
#[tokio::test]
async fn test_project_view() {
    let (desk, fx) = setup().await;
    let admin = Session::from(&fx.admin);
    let user = Session::from(&fx.user);

    let second = desk
        .create_assessment(&admin, fx.project.id, NewAssessment::new("Night possession"))
        .await
        .unwrap();
    desk.log_dynamic_risk(
        &user,
        fx.project.id,
        NewDynamicRisk::new("Wet platform edge", "Coned off, signage placed")
            .with_status(RiskStatus::Temporary),
    )
    .await
    .unwrap();

    let view = desk.project_view(&user, fx.project.id).await.unwrap();
    assert!(!view.can_manage);
    assert_eq!(view.assessments.len(), 2);
    assert_eq!(view.assessments[0].id, second.id);
    assert_eq!(view.dynamic_risks.len(), 1);
    assert_eq!(view.dynamic_risks[0].logger_name(), "Sam Patel");
}

/// Saving a draft with new catalogue names creates them once and reuses
/// them on the next save.
#[tokio::test]
async fn test_save_entry_resolves_new_catalogue_items() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;

    let entry = desk
        .save_entry(&user, ra, draft_with_new_catalogue(" Sharp edges ", "Cuts"), None)
        .await
        .unwrap();
    assert_eq!(entry.hazard_name(), Some("Sharp edges"));
    assert_eq!(entry.risk_name(), Some("Cuts"));

    let again = desk
        .save_entry(&user, ra, draft_with_new_catalogue("sharp edges", "cuts"), None)
        .await
        .unwrap();
    assert_eq!(again.hazard_id, entry.hazard_id);
    assert_eq!(again.risk_id, entry.risk_id);

    let hazards = desk.list_hazards(&user).await.unwrap();
    assert!(hazards.iter().any(|h| h.id == entry.hazard_id));
    let risks = desk.risks_for_hazard(&user, entry.hazard_id).await.unwrap();
    assert_eq!(risks.len(), 1);
}

/// Invalid drafts never reach the backend.
#[tokio::test]
async fn test_invalid_draft_writes_nothing() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);

    let draft = complete_draft(fx.hazard, fx.risk).with_controls("  ");
    let err = desk
        .save_entry(&user, fx.assessment.id, draft, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let draft = EntryDraft::new()
        .with_task("Dig trench")
        .with_hazard(Selection::CreateNew("Buried services".into()))
        .with_controls("CAT scan before digging");
    let err = desk
        .save_entry(&user, fx.assessment.id, draft, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::Validation(ref v) if v.field() == "risk"));
    assert_eq!(desk.backend().entry_count(), 0);
    assert!(desk.list_hazards(&user).await.unwrap().iter().all(|h| h.name != "Buried services"));
}

/// Editing replaces the row in place; deleting removes it.
#[tokio::test]
async fn test_edit_and_delete_entry() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;

    let entry = desk
        .save_entry(&user, ra, complete_draft(fx.hazard, fx.risk), None)
        .await
        .unwrap();
    assert_eq!(entry.initial_risk().value(), 16);

    let edited = EntryDraft::from_entry(&entry).with_person_affected("Public");
    let updated = desk.save_entry(&user, ra, edited, Some(entry.id)).await.unwrap();
    assert_eq!(updated.id, entry.id);
    assert_eq!(updated.person_affected.as_deref(), Some("Public"));
    assert_eq!(desk.backend().entry_count(), 1);

    desk.delete_entry(&user, ra, entry.id).await.unwrap();
    assert_eq!(desk.backend().entry_count(), 0);
}

/// Entries can only be written or deleted through their own team's
/// assessment, and an edit cannot move an entry to another assessment.
#[tokio::test]
async fn test_entries_are_scoped_to_their_assessment() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);
    let admin = Session::from(&fx.admin);
    let outsider = Session::from(&fx.outsider);
    let ra = fx.assessment.id;

    let entry = desk
        .save_entry(&user, ra, complete_draft(fx.hazard, fx.risk), None)
        .await
        .unwrap();

    let err = desk
        .save_entry(&outsider, ra, complete_draft(fx.hazard, fx.risk), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let overwrite = complete_draft(fx.hazard, fx.risk).with_task("Overwritten");
    let err = desk
        .save_entry(&outsider, ra, overwrite.clone(), Some(entry.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = desk.delete_entry(&outsider, ra, entry.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let other = desk
        .create_assessment(&admin, fx.project.id, NewAssessment::new("Concourse works"))
        .await
        .unwrap();
    let err = desk
        .save_entry(&user, other.id, overwrite, Some(entry.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::NotFound { ref what } if what == "entry"));
    let err = desk.delete_entry(&user, other.id, entry.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let view = desk.assessment_view(&user, ra).await.unwrap();
    assert_eq!(view.entries, vec![entry]);
    assert!(desk.assessment_view(&user, other.id).await.unwrap().entries.is_empty());
}

/// A failed entry insert after a new hazard was created leaves no entry
/// behind.
#[tokio::test]
async fn test_failed_entry_insert_leaves_no_entry() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);

    let draft = complete_draft(fx.hazard, fx.risk)
        .with_hazard(Selection::CreateNew("Falling objects".into()))
        .with_risk(Selection::Existing(RiskId::new()));
    let err = desk
        .save_entry(&user, fx.assessment.id, draft, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejection);
    assert_eq!(desk.backend().entry_count(), 0);
    assert!(desk
        .assessment_view(&user, fx.assessment.id)
        .await
        .unwrap()
        .entries
        .is_empty());
}

/// Only members of the assessment's team can be made signatories.
#[tokio::test]
async fn test_signatories_must_be_team_members() {
    let (desk, fx) = setup().await;
    let admin = Session::from(&fx.admin);
    let ra = fx.assessment.id;

    for stranger in [UserId::new(), fx.outsider.id] {
        let err = desk.require_signatory(&admin, ra, stranger).await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound { ref what } if what == "team member"));
        assert_eq!(
            desk.signoff_state(&admin, ra, stranger).await.unwrap(),
            SignoffState::NotRequired
        );
    }

    let view = desk.assessment_view(&admin, ra).await.unwrap();
    assert!(view.ledger.outstanding().is_empty());
}

/// Full sign-off lifecycle: require, sign once, refuse a second signature,
/// and keep the signature when the requirement is removed.
#[tokio::test]
async fn test_signoff_lifecycle() {
    let (desk, fx) = setup().await;
    let admin = Session::from(&fx.admin);
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;

    let err = desk.sign(&user, ra, user.user_id).await.unwrap_err();
    assert!(matches!(err, DeskError::Signoff(SignoffError::NotRequired { .. })));

    let err = desk.require_signatory(&user, ra, user.user_id).await.unwrap_err();
    assert!(matches!(err, DeskError::Signoff(SignoffError::NotAdmin)));

    assert_eq!(
        desk.require_signatory(&admin, ra, user.user_id).await.unwrap(),
        Transition::Applied
    );
    assert_eq!(
        desk.require_signatory(&admin, ra, user.user_id).await.unwrap(),
        Transition::Unchanged
    );

    let err = desk.sign(&admin, ra, user.user_id).await.unwrap_err();
    assert!(matches!(err, DeskError::Signoff(SignoffError::OnBehalfOf { .. })));

    let signature = desk.sign(&user, ra, user.user_id).await.unwrap();
    assert_eq!(signature.user_id, user.user_id);
    assert_eq!(
        desk.signoff_state(&admin, ra, user.user_id).await.unwrap(),
        SignoffState::Signed
    );

    let err = desk.sign(&user, ra, user.user_id).await.unwrap_err();
    assert!(matches!(err, DeskError::Signoff(SignoffError::AlreadySigned { .. })));

    assert_eq!(
        desk.remove_signatory(&admin, ra, user.user_id).await.unwrap(),
        Transition::Applied
    );
    assert_eq!(
        desk.signoff_state(&admin, ra, user.user_id).await.unwrap(),
        SignoffState::Signed
    );
    let view = desk.assessment_view(&admin, ra).await.unwrap();
    assert_eq!(view.ledger.orphaned_signatures().len(), 1);
}

/// The roster lists every member and only lets the viewer sign for
/// themselves.
#[tokio::test]
async fn test_assessment_view_roster() {
    let (desk, fx) = setup().await;
    let admin = Session::from(&fx.admin);
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;

    desk.require_signatory(&admin, ra, user.user_id).await.unwrap();
    desk.require_signatory(&admin, ra, admin.user_id).await.unwrap();

    let view = desk.assessment_view(&user, ra).await.unwrap();
    assert!(!view.can_manage);
    assert!(!view.has_entries());
    assert_eq!(view.roster.len(), 3);

    let own = view.roster.iter().find(|r| r.user_id == user.user_id).unwrap();
    assert_eq!(own.state, SignoffState::Required);
    assert!(own.can_sign);
    let other = view.roster.iter().find(|r| r.user_id == admin.user_id).unwrap();
    assert!(!other.can_sign);
    let newcomer = view.roster.iter().find(|r| r.user_id == fx.newcomer.id).unwrap();
    assert_eq!(newcomer.state, SignoffState::NotRequired);
    assert_eq!(newcomer.display_name, "Unnamed User");

    assert_eq!(view.ledger.outstanding().len(), 2);
    assert!(!view.ledger.is_acknowledged());
}

/// Export is absent without entries and carries one row per entry after.
#[tokio::test]
async fn test_export_csv() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;

    assert!(desk.export_csv(&user, ra).await.unwrap().is_none());

    desk.save_entry(&user, ra, complete_draft(fx.hazard, fx.risk), None)
        .await
        .unwrap();
    let export = desk.export_csv(&user, ra).await.unwrap().unwrap();
    assert_eq!(export.file_name, format!("risk_assessment_{ra}.csv"));

    let lines: Vec<&str> = export.content.split('\n').collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], CSV_HEADERS.join(","));
    assert!(lines[1].starts_with("Replace canopy lighting,Working at height,Fall from ladder,"));
}

/// CRLF export options apply to every row break.
#[tokio::test]
async fn test_export_csv_with_crlf() {
    let (backend, fx) = seeded().await;
    let user = Session::from(&fx.user);
    let ra = fx.assessment.id;
    let desk = RiskDesk::new(backend)
        .with_export_options(CsvOptions::default().with_line_ending(LineEnding::CrLf));

    desk.save_entry(&user, ra, complete_draft(fx.hazard, fx.risk), None)
        .await
        .unwrap();
    let export = desk.export_csv(&user, ra).await.unwrap().unwrap();
    assert_eq!(export.content.matches("\r\n").count(), 1);
}

/// Invites and role changes are admin-only; role changes target members.
#[tokio::test]
async fn test_team_management() {
    let (desk, fx) = setup().await;
    let admin = Session::from(&fx.admin);
    let user = Session::from(&fx.user);

    let err = desk
        .invite_member(&user, NewInvite::new("new@site.example"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::Forbidden { .. }));

    let err = desk
        .invite_member(&admin, NewInvite::new("not-an-email"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let invite = desk
        .invite_member(&admin, NewInvite::new("new@site.example").with_role(Role::TeamAdmin))
        .await
        .unwrap();
    assert_eq!(invite.team_id, fx.team);
    assert_eq!(desk.backend().invites(), vec![invite]);

    desk.change_role(&admin, user.user_id, Role::TeamAdmin).await.unwrap();
    let profile = desk.backend().get_profile(user.user_id).await.unwrap();
    assert_eq!(profile.role, Role::TeamAdmin);

    let err = desk
        .change_role(&admin, fx.outsider.id, Role::User)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(desk.team_members(&user).await.unwrap().len(), 3);
}

/// Dynamic risks need both description and controls.
#[tokio::test]
async fn test_dynamic_risk_validation() {
    let (desk, fx) = setup().await;
    let user = Session::from(&fx.user);

    let err = desk
        .log_dynamic_risk(&user, fx.project.id, NewDynamicRisk::new("Loose cable", ""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let logged = desk
        .log_dynamic_risk(
            &user,
            fx.project.id,
            NewDynamicRisk::new("Loose cable", "Taped down")
                .with_personnel("3 operatives")
                .unsafe_to_continue(),
        )
        .await
        .unwrap();
    assert!(!logged.is_safe_to_continue);
}
