//! riskdesk service layer
//!
//! Everything the screens of the risk-assessment manager need, minus the
//! screens: session handling, the profile gate, team-admin checks, form
//! validation, page-level views, sign-off and CSV export.
//!
//! # Example
//!
//! ```rust,no_run
//! use riskdesk_backend::RestBackend;
//! use riskdesk_core::{DeskConfig, RiskDesk};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeskConfig::load("riskdesk.toml")?;
//! let desk = RiskDesk::new(RestBackend::new(&config.backend)?)
//!     .with_export_options(config.export);
//! let session = desk.open_session("access-token").await?;
//! for project in desk.list_projects(&session).await? {
//!     println!("{}", project.name);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod desk;
mod error;
mod session;
mod views;

pub use config::{DeskConfig, LogConfig, ENV_ANON_KEY, ENV_LOG, ENV_URL};
pub use desk::RiskDesk;
pub use error::{DeskError, DeskResult, ErrorKind};
pub use session::{route_guard, RouteDecision, Session, COMPLETE_PROFILE_PATH, DASHBOARD_PATH};
pub use views::{AssessmentView, CsvExport, ProjectView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
