//! Risk assessment entries and the draft used to create or edit them

use crate::error::{require_text, ValidationError};
use crate::ids::{AssessmentId, EntryId, HazardId, RiskId};
use crate::score::{Rating, RiskScore, ScorePair};
use serde::{Deserialize, Serialize};

/// Default "who is affected" for new entries
pub const DEFAULT_PERSON_AFFECTED: &str = "Operative";

/// Catalogue record reference carrying only its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

impl NamedRef {
    /// Create new reference
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Hazard catalogue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: HazardId,
    pub name: String,
}

/// Risk catalogue item; risks are linked to one or more hazards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub name: String,
}

/// One hazard/risk row of an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaEntry {
    pub id: EntryId,
    pub ra_id: AssessmentId,
    pub task_description: Option<String>,
    pub hazard_id: HazardId,
    pub hazard: Option<NamedRef>,
    pub risk_id: RiskId,
    pub risk: Option<NamedRef>,
    pub person_affected: Option<String>,
    pub initial_likelihood: Rating,
    pub initial_impact: Rating,
    pub control_measures: Option<String>,
    pub resultant_likelihood: Rating,
    pub resultant_impact: Rating,
}

impl RaEntry {
    /// Pair before controls
    #[inline]
    #[must_use]
    pub fn initial(&self) -> ScorePair {
        ScorePair::new(self.initial_likelihood, self.initial_impact)
    }

    /// Pair after controls
    #[inline]
    #[must_use]
    pub fn resultant(&self) -> ScorePair {
        ScorePair::new(self.resultant_likelihood, self.resultant_impact)
    }

    /// Initial likelihood × impact
    #[inline]
    #[must_use]
    pub fn initial_risk(&self) -> RiskScore {
        self.initial().score()
    }

    /// Resultant likelihood × impact
    #[inline]
    #[must_use]
    pub fn resultant_risk(&self) -> RiskScore {
        self.resultant().score()
    }

    /// Hazard name, if the backend embedded it
    #[inline]
    #[must_use]
    pub fn hazard_name(&self) -> Option<&str> {
        self.hazard.as_ref().map(|h| h.name.as_str())
    }

    /// Risk name, if the backend embedded it
    #[inline]
    #[must_use]
    pub fn risk_name(&self) -> Option<&str> {
        self.risk.as_ref().map(|r| r.name.as_str())
    }
}

/// Pick from the catalogue, or name a new item to create
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection<Id> {
    /// Nothing chosen yet
    #[default]
    Unselected,
    /// Existing catalogue item
    Existing(Id),
    /// Create a new catalogue item with this name
    CreateNew(String),
}

impl<Id: Copy> Selection<Id> {
    /// The existing id, if one was picked
    #[inline]
    #[must_use]
    pub fn existing(&self) -> Option<Id> {
        match self {
            Selection::Existing(id) => Some(*id),
            _ => None,
        }
    }

    fn check(&self, field: &'static str, new_field: &'static str) -> Result<(), ValidationError> {
        match self {
            Selection::Unselected => Err(ValidationError::missing(field)),
            Selection::Existing(_) => Ok(()),
            Selection::CreateNew(name) => require_text(name, new_field),
        }
    }
}

/// Entry form state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub task_description: String,
    pub hazard: Selection<HazardId>,
    pub risk: Selection<RiskId>,
    pub person_affected: String,
    pub initial: ScorePair,
    pub control_measures: String,
    pub resultant: ScorePair,
}

impl Default for EntryDraft {
    fn default() -> Self {
        Self {
            task_description: String::new(),
            hazard: Selection::Unselected,
            risk: Selection::Unselected,
            person_affected: DEFAULT_PERSON_AFFECTED.to_string(),
            initial: ScorePair::new(Rating::THREE, Rating::THREE),
            control_measures: String::new(),
            resultant: ScorePair::new(Rating::ONE, Rating::ONE),
        }
    }
}

impl EntryDraft {
    /// Empty form with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill the form from an existing entry for editing
    #[must_use]
    pub fn from_entry(entry: &RaEntry) -> Self {
        Self {
            task_description: entry.task_description.clone().unwrap_or_default(),
            hazard: Selection::Existing(entry.hazard_id),
            risk: Selection::Existing(entry.risk_id),
            person_affected: entry
                .person_affected
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSON_AFFECTED.to_string()),
            initial: entry.initial(),
            control_measures: entry.control_measures.clone().unwrap_or_default(),
            resultant: entry.resultant(),
        }
    }

    /// With task description
    #[inline]
    #[must_use]
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task_description = task.into();
        self
    }

    /// With hazard selection
    #[inline]
    #[must_use]
    pub fn with_hazard(mut self, hazard: Selection<HazardId>) -> Self {
        // Changing the hazard invalidates the chosen risk
        if self.hazard != hazard {
            self.risk = Selection::Unselected;
        }
        self.hazard = hazard;
        self
    }

    /// With risk selection
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: Selection<RiskId>) -> Self {
        self.risk = risk;
        self
    }

    /// With person affected
    #[inline]
    #[must_use]
    pub fn with_person_affected(mut self, person: impl Into<String>) -> Self {
        self.person_affected = person.into();
        self
    }

    /// With initial pair
    #[inline]
    #[must_use]
    pub fn with_initial(mut self, initial: ScorePair) -> Self {
        self.initial = initial;
        self
    }

    /// With control measures
    #[inline]
    #[must_use]
    pub fn with_controls(mut self, controls: impl Into<String>) -> Self {
        self.control_measures = controls.into();
        self
    }

    /// With resultant pair
    #[inline]
    #[must_use]
    pub fn with_resultant(mut self, resultant: ScorePair) -> Self {
        self.resultant = resultant;
        self
    }

    /// Live score of the initial pair
    #[inline]
    #[must_use]
    pub fn initial_risk(&self) -> RiskScore {
        self.initial.score()
    }

    /// Live score of the resultant pair
    #[inline]
    #[must_use]
    pub fn resultant_risk(&self) -> RiskScore {
        self.resultant.score()
    }

    /// Check every required field, reporting the first one missing
    ///
    /// # Errors
    /// `ValidationError::MissingField` naming the field
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.task_description, "task description")?;
        self.hazard.check("hazard", "new hazard name")?;
        self.risk.check("risk", "new risk name")?;
        require_text(&self.person_affected, "person affected")?;
        require_text(&self.control_measures, "control measures")?;
        Ok(())
    }

    /// Build the row to write once hazard and risk ids are resolved
    #[must_use]
    pub fn into_record(self, ra_id: AssessmentId, hazard_id: HazardId, risk_id: RiskId) -> EntryRecord {
        EntryRecord {
            ra_id,
            task_description: self.task_description,
            hazard_id,
            risk_id,
            person_affected: self.person_affected,
            initial_likelihood: self.initial.likelihood,
            initial_impact: self.initial.impact,
            control_measures: self.control_measures,
            resultant_likelihood: self.resultant.likelihood,
            resultant_impact: self.resultant.impact,
        }
    }
}

/// Column values written for an insert or update of `ra_entries`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub ra_id: AssessmentId,
    pub task_description: String,
    pub hazard_id: HazardId,
    pub risk_id: RiskId,
    pub person_affected: String,
    pub initial_likelihood: Rating,
    pub initial_impact: Rating,
    pub control_measures: String,
    pub resultant_likelihood: Rating,
    pub resultant_impact: Rating,
}
