//! riskdesk domain model
//!
//! Pure types and rules shared by the backend client and the service layer.
//!
//! # Core Concepts
//!
//! - [`Rating`] / [`RiskScore`]: likelihood × impact scoring in `1..=25`
//! - [`RiskLevel`]: display band of a score
//! - [`RaEntry`] / [`EntryDraft`]: assessment rows and the form that builds them
//! - [`SignoffLedger`]: who must sign an assessment and who has
//! - [`to_csv`]: spreadsheet export of an assessment's entries
//!
//! # Example
//!
//! ```rust
//! use riskdesk_model::{classify, score, Rating, RiskLevel};
//!
//! let s = score(Rating::new(3).unwrap(), Rating::new(5).unwrap());
//! assert_eq!(s.value(), 15);
//! assert_eq!(classify(s), RiskLevel::Critical);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod dynamic_risk;
mod entry;
mod error;
mod export;
mod ids;
mod project;
mod score;
mod signoff;
mod team;

pub use dynamic_risk::{DynamicRisk, NewDynamicRisk, RiskStatus, UNKNOWN_USER};
pub use entry::{
    EntryDraft, EntryRecord, Hazard, NamedRef, RaEntry, Risk, Selection, DEFAULT_PERSON_AFFECTED,
};
pub use error::ValidationError;
pub use export::{export_file_name, to_csv, CsvOptions, ExportError, LineEnding, CSV_HEADERS};
pub use ids::{
    AssessmentId, DynamicRiskId, EntryId, HazardId, ProjectId, RiskId, TeamId, UserId,
};
pub use project::{
    AssessmentListItem, NewAssessment, NewProject, Project, ProjectSummary, RiskAssessment,
};
pub use score::{
    classify, score, Rating, RiskLevel, RiskScore, ScorePair, CRITICAL_THRESHOLD,
    HIGH_THRESHOLD, MAX_RATING, MAX_SCORE, MEDIUM_THRESHOLD, MIN_RATING,
};
pub use signoff::{
    allowed_transitions, validate_transition, RosterRow, Signatory, Signature, SignoffError,
    SignoffLedger, SignoffState, Transition,
};
pub use team::{
    display_name, Invite, NewInvite, PersonName, Profile, ProfileUpdate, Role, TeamMember,
    UNNAMED_USER,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
