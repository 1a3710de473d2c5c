//! In-process backend
//!
//! Holds every table in memory and enforces the same constraints as the
//! hosted database: unique signatories and signatures, foreign keys on
//! entries, and hazard/risk catalogue links. Used by tests and demo mode.

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use riskdesk_model::{
    AssessmentId, AssessmentListItem, DynamicRisk, DynamicRiskId, EntryId, EntryRecord, Hazard,
    HazardId, Invite, NamedRef, NewAssessment, NewDynamicRisk, NewProject, PersonName, Profile,
    ProfileUpdate, Project, ProjectId, ProjectSummary, RaEntry, Risk, RiskAssessment, RiskId,
    Role, Signatory, Signature, TeamId, TeamMember, UserId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

/// Status reported for foreign-key failures
const FK_VIOLATION_STATUS: u16 = 409;

#[derive(Debug, Clone)]
struct CatalogItem<Id> {
    id: Id,
    name: String,
    /// `None` for the shared catalogue every team sees
    team_id: Option<TeamId>,
}

#[derive(Debug, Clone)]
struct StoredDynamicRisk {
    risk: DynamicRisk,
    logged_by: UserId,
}

/// [`Backend`] over in-memory tables
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tokens: DashMap<String, UserId>,
    profiles: DashMap<UserId, Profile>,
    projects: DashMap<ProjectId, Project>,
    assessments: DashMap<AssessmentId, RiskAssessment>,
    entries: RwLock<BTreeMap<EntryId, EntryRecord>>,
    hazards: RwLock<Vec<CatalogItem<HazardId>>>,
    risks: RwLock<Vec<CatalogItem<RiskId>>>,
    hazard_risks: RwLock<BTreeSet<(HazardId, RiskId)>>,
    dynamic_risks: RwLock<Vec<StoredDynamicRisk>>,
    signatories: RwLock<BTreeSet<(AssessmentId, UserId)>>,
    signatures: RwLock<BTreeMap<(AssessmentId, UserId), Signature>>,
    invites: RwLock<Vec<Invite>>,
    next_entry: AtomicI64,
    next_dynamic_risk: AtomicI64,
}

impl MemoryBackend {
    /// Empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user whose session is opened with `token`
    pub fn add_user(&self, token: impl Into<String>, profile: Profile) {
        self.tokens.insert(token.into(), profile.id);
        self.profiles.insert(profile.id, profile);
    }

    /// Add a catalogue hazard; `None` makes it visible to every team
    pub fn add_hazard(&self, name: impl Into<String>, team: Option<TeamId>) -> HazardId {
        let id = HazardId::new();
        self.hazards.write().push(CatalogItem {
            id,
            name: name.into(),
            team_id: team,
        });
        id
    }

    /// Add a catalogue risk linked to `hazard`
    pub fn add_risk(&self, name: impl Into<String>, hazard: HazardId, team: Option<TeamId>) -> RiskId {
        let id = RiskId::new();
        self.risks.write().push(CatalogItem {
            id,
            name: name.into(),
            team_id: team,
        });
        self.hazard_risks.write().insert((hazard, id));
        id
    }

    /// Invites stored so far
    #[must_use]
    pub fn invites(&self) -> Vec<Invite> {
        self.invites.read().clone()
    }

    /// Number of stored entries across all assessments
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    fn touch_project(&self, id: ProjectId) {
        if let Some(mut project) = self.projects.get_mut(&id) {
            project.last_edited_at = Utc::now();
        }
    }

    fn hydrate_entry(&self, id: EntryId, record: &EntryRecord) -> RaEntry {
        let hazard = self
            .hazards
            .read()
            .iter()
            .find(|h| h.id == record.hazard_id)
            .map(|h| NamedRef::new(h.name.clone()));
        let risk = self
            .risks
            .read()
            .iter()
            .find(|r| r.id == record.risk_id)
            .map(|r| NamedRef::new(r.name.clone()));
        RaEntry {
            id,
            ra_id: record.ra_id,
            task_description: Some(record.task_description.clone()),
            hazard_id: record.hazard_id,
            hazard,
            risk_id: record.risk_id,
            risk,
            person_affected: Some(record.person_affected.clone()),
            initial_likelihood: record.initial_likelihood,
            initial_impact: record.initial_impact,
            control_measures: Some(record.control_measures.clone()),
            resultant_likelihood: record.resultant_likelihood,
            resultant_impact: record.resultant_impact,
        }
    }

    fn check_entry_refs(&self, record: &EntryRecord) -> BackendResult<()> {
        if !self.assessments.contains_key(&record.ra_id) {
            return Err(fk_violation("ra_entries.ra_id"));
        }
        if !self.hazards.read().iter().any(|h| h.id == record.hazard_id) {
            return Err(fk_violation("ra_entries.hazard_id"));
        }
        if !self.risks.read().iter().any(|r| r.id == record.risk_id) {
            return Err(fk_violation("ra_entries.risk_id"));
        }
        Ok(())
    }

    fn logger_name(&self, user: UserId) -> Option<PersonName> {
        self.profiles.get(&user).map(|p| PersonName {
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
        })
    }
}

fn fk_violation(column: &str) -> BackendError {
    BackendError::rejected(
        FK_VIOLATION_STATUS,
        format!("foreign key violation on {column}"),
    )
}

fn visible_to(item_team: Option<TeamId>, team: TeamId) -> bool {
    item_team.map_or(true, |t| t == team)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn resolve_user(&self, access_token: &str) -> BackendResult<UserId> {
        self.tokens
            .get(access_token)
            .map(|u| *u.value())
            .ok_or_else(|| BackendError::unauthorized("invalid or expired token"))
    }

    async fn get_profile(&self, user: UserId) -> BackendResult<Profile> {
        self.profiles
            .get(&user)
            .map(|p| p.value().clone())
            .ok_or_else(|| BackendError::not_found("profiles"))
    }

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate) -> BackendResult<Profile> {
        let mut profile = self
            .profiles
            .get_mut(&user)
            .ok_or_else(|| BackendError::not_found("profiles"))?;
        profile.first_name = Some(update.first_name.clone());
        profile.last_name = Some(update.last_name.clone());
        profile.job_title = update.job_title.clone();
        Ok(profile.value().clone())
    }

    async fn list_team_members(&self, team: TeamId) -> BackendResult<Vec<TeamMember>> {
        let mut members: Vec<TeamMember> = self
            .profiles
            .iter()
            .filter(|p| p.team_id == team)
            .map(|p| TeamMember::from(p.value()))
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn update_role(&self, user: UserId, role: Role) -> BackendResult<()> {
        let mut profile = self
            .profiles
            .get_mut(&user)
            .ok_or_else(|| BackendError::not_found("profiles"))?;
        profile.role = role;
        Ok(())
    }

    async fn insert_invite(&self, invite: &Invite) -> BackendResult<()> {
        let mut invites = self.invites.write();
        if invites.iter().any(|i| i.token == invite.token) {
            return Err(BackendError::conflict("duplicate invite token"));
        }
        invites.push(invite.clone());
        Ok(())
    }

    async fn list_projects(&self, team: TeamId) -> BackendResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|p| p.team_id == team)
            .map(|p| p.value().clone())
            .collect();
        projects.sort_by(|a, b| b.last_edited_at.cmp(&a.last_edited_at));
        Ok(projects)
    }

    async fn get_project(&self, id: ProjectId) -> BackendResult<Project> {
        self.projects
            .get(&id)
            .map(|p| p.value().clone())
            .ok_or_else(|| BackendError::not_found("projects"))
    }

    async fn insert_project(&self, team: TeamId, project: &NewProject) -> BackendResult<Project> {
        let stored = Project {
            id: ProjectId::new(),
            name: project.name.clone(),
            reference: project.reference.clone(),
            team_id: team,
            location_address: project.location_address.clone(),
            location_what3words: project.location_what3words.clone(),
            last_edited_at: Utc::now(),
        };
        self.projects.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_assessments(&self, project: ProjectId) -> BackendResult<Vec<AssessmentListItem>> {
        let mut items: Vec<AssessmentListItem> = self
            .assessments
            .iter()
            .filter(|ra| ra.project.id == project)
            .map(|ra| AssessmentListItem::from(ra.value()))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn get_assessment(&self, id: AssessmentId) -> BackendResult<RiskAssessment> {
        self.assessments
            .get(&id)
            .map(|ra| ra.value().clone())
            .ok_or_else(|| BackendError::not_found("risk_assessments"))
    }

    async fn insert_assessment(
        &self,
        project: &ProjectSummary,
        assessment: &NewAssessment,
    ) -> BackendResult<RiskAssessment> {
        if !self.projects.contains_key(&project.id) {
            return Err(fk_violation("risk_assessments.project_id"));
        }
        let stored = RiskAssessment {
            id: AssessmentId::new(),
            name: assessment.name.clone(),
            description: assessment.description.clone(),
            created_at: Utc::now(),
            project: project.clone(),
        };
        self.assessments.insert(stored.id, stored.clone());
        self.touch_project(project.id);
        Ok(stored)
    }

    async fn list_entries(&self, ra: AssessmentId) -> BackendResult<Vec<RaEntry>> {
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .filter(|(_, record)| record.ra_id == ra)
            .map(|(id, record)| self.hydrate_entry(*id, record))
            .collect())
    }

    async fn insert_entry(&self, record: &EntryRecord) -> BackendResult<RaEntry> {
        self.check_entry_refs(record)?;
        let id = EntryId(self.next_entry.fetch_add(1, Ordering::Relaxed) + 1);
        self.entries.write().insert(id, record.clone());
        Ok(self.hydrate_entry(id, record))
    }

    async fn update_entry(&self, id: EntryId, record: &EntryRecord) -> BackendResult<RaEntry> {
        self.check_entry_refs(record)?;
        let mut entries = self.entries.write();
        let stored = entries
            .get_mut(&id)
            .ok_or_else(|| BackendError::not_found("ra_entries"))?;
        *stored = record.clone();
        drop(entries);
        Ok(self.hydrate_entry(id, record))
    }

    async fn delete_entry(&self, id: EntryId) -> BackendResult<()> {
        // Deleting an absent row matches nothing and succeeds
        self.entries.write().remove(&id);
        Ok(())
    }

    async fn list_hazards(&self, team: TeamId) -> BackendResult<Vec<Hazard>> {
        let mut hazards: Vec<Hazard> = self
            .hazards
            .read()
            .iter()
            .filter(|h| visible_to(h.team_id, team))
            .map(|h| Hazard {
                id: h.id,
                name: h.name.clone(),
            })
            .collect();
        hazards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hazards)
    }

    async fn list_risks_for_hazard(&self, hazard: HazardId) -> BackendResult<Vec<Risk>> {
        let links = self.hazard_risks.read();
        let mut risks: Vec<Risk> = self
            .risks
            .read()
            .iter()
            .filter(|r| links.contains(&(hazard, r.id)))
            .map(|r| Risk {
                id: r.id,
                name: r.name.clone(),
            })
            .collect();
        risks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(risks)
    }

    async fn create_hazard_if_not_exists(&self, name: &str, team: TeamId) -> BackendResult<HazardId> {
        let name = name.trim();
        let mut hazards = self.hazards.write();
        if let Some(existing) = hazards
            .iter()
            .find(|h| visible_to(h.team_id, team) && h.name.eq_ignore_ascii_case(name))
        {
            return Ok(existing.id);
        }
        let id = HazardId::new();
        hazards.push(CatalogItem {
            id,
            name: name.to_string(),
            team_id: Some(team),
        });
        Ok(id)
    }

    async fn create_risk_and_link(
        &self,
        name: &str,
        hazard: HazardId,
        team: TeamId,
    ) -> BackendResult<RiskId> {
        if !self.hazards.read().iter().any(|h| h.id == hazard) {
            return Err(fk_violation("hazard_risks.hazard_id"));
        }
        let name = name.trim();
        let id = {
            let mut risks = self.risks.write();
            match risks
                .iter()
                .find(|r| visible_to(r.team_id, team) && r.name.eq_ignore_ascii_case(name))
            {
                Some(existing) => existing.id,
                None => {
                    let id = RiskId::new();
                    risks.push(CatalogItem {
                        id,
                        name: name.to_string(),
                        team_id: Some(team),
                    });
                    id
                }
            }
        };
        self.hazard_risks.write().insert((hazard, id));
        Ok(id)
    }

    async fn list_dynamic_risks(&self, project: ProjectId) -> BackendResult<Vec<DynamicRisk>> {
        let mut risks: Vec<DynamicRisk> = self
            .dynamic_risks
            .read()
            .iter()
            .filter(|s| s.risk.project_id == project)
            .map(|s| DynamicRisk {
                logged_by: self.logger_name(s.logged_by),
                ..s.risk.clone()
            })
            .collect();
        risks.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(risks)
    }

    async fn insert_dynamic_risk(
        &self,
        project: ProjectId,
        _team: TeamId,
        logged_by: UserId,
        risk: &NewDynamicRisk,
    ) -> BackendResult<DynamicRisk> {
        if !self.projects.contains_key(&project) {
            return Err(fk_violation("dynamic_risks.project_id"));
        }
        let id = DynamicRiskId(self.next_dynamic_risk.fetch_add(1, Ordering::Relaxed) + 1);
        let stored = DynamicRisk {
            id,
            project_id: project,
            logged_at: Utc::now(),
            risk_description: risk.risk_description.clone(),
            control_measures_taken: risk.control_measures_taken.clone(),
            personnel_on_site: risk.personnel_on_site.clone(),
            is_safe_to_continue: risk.is_safe_to_continue,
            risk_status: Some(risk.risk_status),
            logged_by: None,
        };
        self.dynamic_risks.write().push(StoredDynamicRisk {
            risk: stored.clone(),
            logged_by,
        });
        self.touch_project(project);
        Ok(DynamicRisk {
            logged_by: self.logger_name(logged_by),
            ..stored
        })
    }

    async fn list_signatories(&self, ra: AssessmentId) -> BackendResult<Vec<Signatory>> {
        Ok(self
            .signatories
            .read()
            .iter()
            .filter(|(r, _)| *r == ra)
            .map(|(ra_id, user_id)| Signatory {
                ra_id: *ra_id,
                user_id: *user_id,
            })
            .collect())
    }

    async fn insert_signatory(&self, _team: TeamId, signatory: Signatory) -> BackendResult<()> {
        if !self.assessments.contains_key(&signatory.ra_id) {
            return Err(fk_violation("ra_signatories.ra_id"));
        }
        if self
            .signatories
            .write()
            .insert((signatory.ra_id, signatory.user_id))
        {
            Ok(())
        } else {
            Err(BackendError::conflict(
                "duplicate key value violates unique constraint \"ra_signatories_pkey\"",
            ))
        }
    }

    async fn delete_signatory(&self, signatory: Signatory) -> BackendResult<()> {
        self.signatories
            .write()
            .remove(&(signatory.ra_id, signatory.user_id));
        Ok(())
    }

    async fn list_signatures(&self, ra: AssessmentId) -> BackendResult<Vec<Signature>> {
        Ok(self
            .signatures
            .read()
            .values()
            .filter(|s| s.ra_id == ra)
            .copied()
            .collect())
    }

    async fn insert_signature(
        &self,
        _team: TeamId,
        ra: AssessmentId,
        user: UserId,
    ) -> BackendResult<Signature> {
        if !self.assessments.contains_key(&ra) {
            return Err(fk_violation("ra_signatures.ra_id"));
        }
        let mut signatures = self.signatures.write();
        if signatures.contains_key(&(ra, user)) {
            return Err(BackendError::conflict(
                "duplicate key value violates unique constraint \"ra_signatures_pkey\"",
            ));
        }
        let signature = Signature {
            ra_id: ra,
            user_id: user,
            signed_at: Utc::now(),
        };
        signatures.insert((ra, user), signature);
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskdesk_model::Rating;

    fn profile(team: TeamId) -> Profile {
        Profile {
            id: UserId::new(),
            team_id: team,
            first_name: Some("Kim".into()),
            last_name: Some("Lee".into()),
            job_title: None,
            role: Role::TeamAdmin,
        }
    }

    async fn assessment(backend: &MemoryBackend, team: TeamId) -> RiskAssessment {
        let project = backend
            .insert_project(team, &NewProject::new("Depot"))
            .await
            .unwrap();
        backend
            .insert_assessment(&project.summary(), &NewAssessment::new("Yard works"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn tokens_resolve_to_users() {
        let backend = MemoryBackend::new();
        let user = profile(TeamId::new());
        backend.add_user("tok", user.clone());
        assert_eq!(backend.resolve_user("tok").await.unwrap(), user.id);
        assert!(matches!(
            backend.resolve_user("nope").await,
            Err(BackendError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_signature_is_a_conflict() {
        let backend = MemoryBackend::new();
        let team = TeamId::new();
        let ra = assessment(&backend, team).await;
        let user = UserId::new();

        backend.insert_signature(team, ra.id, user).await.unwrap();
        let err = backend.insert_signature(team, ra.id, user).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(backend.list_signatures(ra.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_signatory_is_a_conflict() {
        let backend = MemoryBackend::new();
        let team = TeamId::new();
        let ra = assessment(&backend, team).await;
        let pair = Signatory {
            ra_id: ra.id,
            user_id: UserId::new(),
        };
        backend.insert_signatory(team, pair).await.unwrap();
        assert!(backend.insert_signatory(team, pair).await.unwrap_err().is_conflict());

        backend.delete_signatory(pair).await.unwrap();
        assert!(backend.list_signatories(ra.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn catalogue_procedures_reuse_names() {
        let backend = MemoryBackend::new();
        let team = TeamId::new();
        let shared = backend.add_hazard("Noise", None);

        let again = backend.create_hazard_if_not_exists("noise", team).await.unwrap();
        assert_eq!(again, shared);

        let fresh = backend.create_hazard_if_not_exists("Dust", team).await.unwrap();
        let risk = backend.create_risk_and_link("Silicosis", fresh, team).await.unwrap();
        let risks = backend.list_risks_for_hazard(fresh).await.unwrap();
        assert_eq!(risks, vec![Risk { id: risk, name: "Silicosis".into() }]);

        let names: Vec<String> = backend
            .list_hazards(team)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Dust", "Noise"]);
        assert_eq!(backend.list_hazards(TeamId::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn entries_embed_names_and_check_references() {
        let backend = MemoryBackend::new();
        let team = TeamId::new();
        let ra = assessment(&backend, team).await;
        let hazard = backend.add_hazard("Working at height", None);
        let risk = backend.add_risk("Fall", hazard, None);

        let record = EntryRecord {
            ra_id: ra.id,
            task_description: "Roof repair".into(),
            hazard_id: hazard,
            risk_id: risk,
            person_affected: "Operative".into(),
            initial_likelihood: Rating::FOUR,
            initial_impact: Rating::FIVE,
            control_measures: "Harness".into(),
            resultant_likelihood: Rating::ONE,
            resultant_impact: Rating::FIVE,
        };
        let entry = backend.insert_entry(&record).await.unwrap();
        assert_eq!(entry.hazard_name(), Some("Working at height"));
        assert_eq!(entry.id, EntryId(1));

        let orphan = EntryRecord {
            risk_id: RiskId::new(),
            ..record
        };
        assert!(matches!(
            backend.insert_entry(&orphan).await,
            Err(BackendError::Rejected { .. })
        ));
        assert_eq!(backend.entry_count(), 1);
    }
}
