//! Signed-in user context passed to every operation

use crate::error::{DeskError, DeskResult};
use riskdesk_model::{Profile, Role, TeamId, UserId};
use serde::{Deserialize, Serialize};

/// Dashboard root
pub const DASHBOARD_PATH: &str = "/dashboard";
/// Page where new users fill in their name
pub const COMPLETE_PROFILE_PATH: &str = "/dashboard/complete-profile";

/// Who is acting, and for which team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub role: Role,
    pub first_name: Option<String>,
}

impl Session {
    /// Create new session
    #[inline]
    pub fn new(user_id: UserId, team_id: TeamId, role: Role) -> Self {
        Self {
            user_id,
            team_id,
            role,
            first_name: None,
        }
    }

    /// With first name
    #[inline]
    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Check if the user administers the team
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// A profile is complete once it has a first name
    #[inline]
    #[must_use]
    pub fn has_complete_profile(&self) -> bool {
        self.first_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// `Forbidden` unless the user is a team admin
    ///
    /// # Errors
    /// `DeskError::Forbidden` naming `action`
    pub fn require_admin(&self, action: &'static str) -> DeskResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DeskError::Forbidden { action })
        }
    }
}

impl From<&Profile> for Session {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.id,
            team_id: profile.team_id,
            role: profile.role,
            first_name: profile.first_name.clone(),
        }
    }
}

/// Outcome of the profile-completion gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

/// Profile-completion gate for dashboard paths.
#[must_use]
pub fn route_guard(session: &Session, path: &str) -> RouteDecision {
    if !path.starts_with(DASHBOARD_PATH) {
        return RouteDecision::Allow;
    }
    let complete = session.has_complete_profile();
    if !complete && path != COMPLETE_PROFILE_PATH {
        RouteDecision::Redirect(COMPLETE_PROFILE_PATH)
    } else if complete && path == COMPLETE_PROFILE_PATH {
        RouteDecision::Redirect(DASHBOARD_PATH)
    } else {
        RouteDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(first_name: Option<&str>) -> Session {
        let session = Session::new(UserId::new(), TeamId::new(), Role::User);
        match first_name {
            Some(name) => session.with_first_name(name),
            None => session,
        }
    }

    #[test]
    fn incomplete_profile_is_sent_to_completion() {
        let s = session(None);
        assert_eq!(
            route_guard(&s, "/dashboard/project/42"),
            RouteDecision::Redirect(COMPLETE_PROFILE_PATH)
        );
        assert_eq!(route_guard(&s, COMPLETE_PROFILE_PATH), RouteDecision::Allow);
        assert_eq!(route_guard(&s, "/login"), RouteDecision::Allow);
        assert_eq!(
            route_guard(&session(Some("  ")), DASHBOARD_PATH),
            RouteDecision::Redirect(COMPLETE_PROFILE_PATH)
        );
    }

    #[test]
    fn complete_profile_skips_completion_page() {
        let s = session(Some("Ana"));
        assert_eq!(
            route_guard(&s, COMPLETE_PROFILE_PATH),
            RouteDecision::Redirect(DASHBOARD_PATH)
        );
        assert_eq!(route_guard(&s, "/dashboard/team"), RouteDecision::Allow);
    }

    #[test]
    fn admin_check() {
        let s = session(Some("Ana"));
        assert!(matches!(
            s.require_admin("create projects"),
            Err(DeskError::Forbidden { .. })
        ));
        let admin = Session { role: Role::TeamAdmin, ..s };
        assert!(admin.require_admin("create projects").is_ok());
    }
}
