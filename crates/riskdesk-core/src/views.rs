//! Aggregates returned by page-level reads

use riskdesk_model::{
    AssessmentListItem, DynamicRisk, Project, RaEntry, RiskAssessment, RosterRow, SignoffLedger,
    TeamMember,
};
use serde::{Deserialize, Serialize};

/// A project with its assessments and site log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub project: Project,
    /// Newest first
    pub assessments: Vec<AssessmentListItem>,
    /// Most recently logged first
    pub dynamic_risks: Vec<DynamicRisk>,
    pub can_manage: bool,
}

/// An assessment with its entries and sign-off standing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentView {
    pub assessment: RiskAssessment,
    pub entries: Vec<RaEntry>,
    pub members: Vec<TeamMember>,
    pub ledger: SignoffLedger,
    /// One row per team member, as seen by the viewer
    pub roster: Vec<RosterRow>,
    pub can_manage: bool,
}

impl AssessmentView {
    /// Entries exist to export
    #[inline]
    #[must_use]
    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Rendered CSV ready to offer as a download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}
