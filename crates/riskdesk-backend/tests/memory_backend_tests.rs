use riskdesk_backend::{Backend, BackendError, MemoryBackend};
use riskdesk_model::{
    NewAssessment, NewDynamicRisk, NewProject, Profile, ProfileUpdate, RiskAssessment,
    RiskStatus, Role, Signatory, TeamId, UserId,
};
use std::sync::Arc;

fn member(team: TeamId, first: Option<&str>) -> Profile {
    Profile {
        id: UserId::new(),
        team_id: team,
        first_name: first.map(str::to_string),
        last_name: None,
        job_title: None,
        role: Role::User,
    }
}

async fn seeded_assessment(backend: &MemoryBackend, team: TeamId) -> RiskAssessment {
    let project = backend
        .insert_project(team, &NewProject::new("Station refurbishment"))
        .await
        .unwrap();
    backend
        .insert_assessment(&project.summary(), &NewAssessment::new("Platform works"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_signing_stores_one_signature() {
    let backend = Arc::new(MemoryBackend::new());
    let team = TeamId::new();
    let ra = seeded_assessment(&backend, team).await;
    let user = UserId::new();
    let ra_id = ra.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.insert_signature(team, ra_id, user).await })
        })
        .collect();

    let mut ok = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(BackendError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(backend.list_signatures(ra.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_assessments_listed_newest_first() {
    let backend = MemoryBackend::new();
    let team = TeamId::new();
    let project = backend
        .insert_project(team, &NewProject::new("Bridge"))
        .await
        .unwrap();

    let first = backend
        .insert_assessment(&project.summary(), &NewAssessment::new("First"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = backend
        .insert_assessment(&project.summary(), &NewAssessment::new("Second"))
        .await
        .unwrap();

    let listed: Vec<_> = backend
        .list_assessments(project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(listed, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_dynamic_risk_carries_logger_name() {
    let backend = MemoryBackend::new();
    let team = TeamId::new();
    let logger = member(team, Some("Rae"));
    backend.add_user("rae", logger.clone());
    let project = backend
        .insert_project(team, &NewProject::new("Substation"))
        .await
        .unwrap();

    let form = NewDynamicRisk::new("Live cable exposed", "Area fenced off")
        .unsafe_to_continue()
        .with_status(RiskStatus::Permanent);
    let logged = backend
        .insert_dynamic_risk(project.id, team, logger.id, &form)
        .await
        .unwrap();
    assert_eq!(logged.logger_name(), "Rae");
    assert!(!logged.is_safe_to_continue);

    let listed = backend.list_dynamic_risks(project.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].risk_status, Some(RiskStatus::Permanent));
}

#[tokio::test]
async fn test_profile_and_role_updates() {
    let backend = MemoryBackend::new();
    let team = TeamId::new();
    let user = member(team, None);
    backend.add_user("tok", user.clone());

    let updated = backend
        .update_profile(user.id, &ProfileUpdate::new("Ola", "Berg"))
        .await
        .unwrap();
    assert!(updated.is_complete());

    backend.update_role(user.id, Role::TeamAdmin).await.unwrap();
    let members = backend.list_team_members(team).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, Role::TeamAdmin);
    assert_eq!(members[0].display_name(), "Ola Berg");

    assert!(backend
        .update_role(UserId::new(), Role::User)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_signatory_requires_existing_assessment() {
    let backend = MemoryBackend::new();
    let pair = Signatory {
        ra_id: riskdesk_model::AssessmentId::new(),
        user_id: UserId::new(),
    };
    let err = backend.insert_signatory(TeamId::new(), pair).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected { .. }));
}
