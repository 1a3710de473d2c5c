//! Team members, profiles and invites

use crate::error::{non_blank, require_text, ValidationError};
use crate::ids::{TeamId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fallback shown for members who have not filled in a name
pub const UNNAMED_USER: &str = "Unnamed User";

/// Role of a team member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member
    #[default]
    User,
    /// May manage projects, assessments, signatories and the team
    TeamAdmin,
}

impl Role {
    /// Check if this role administers the team
    #[inline]
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::TeamAdmin)
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::TeamAdmin => "team_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "team_admin" => Ok(Role::TeamAdmin),
            other => Err(ValidationError::malformed(
                "role",
                format!("unknown role '{other}'"),
            )),
        }
    }
}

/// Join first and last name, falling back when both are blank.
#[must_use]
pub fn display_name(first: Option<&str>, last: Option<&str>, fallback: &str) -> String {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// First/last name pair as embedded in other rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PersonName {
    /// Display name with the given fallback
    #[must_use]
    pub fn display(&self, fallback: &str) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            fallback,
        )
    }
}

/// A user's profile row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub team_id: TeamId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    /// Profiles without a first name must be completed before use
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.first_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Display name
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            UNNAMED_USER,
        )
    }
}

/// A member of the current team as listed on rosters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl TeamMember {
    /// Display name
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            UNNAMED_USER,
        )
    }
}

impl From<&Profile> for TeamMember {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            role: profile.role,
        }
    }
}

/// Profile completion form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
}

impl ProfileUpdate {
    /// Create new update
    #[inline]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            job_title: None,
        }
    }

    /// With job title
    #[inline]
    #[must_use]
    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = Some(job_title.into());
        self
    }

    /// Validate and normalize
    ///
    /// # Errors
    /// If first or last name is blank
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        require_text(&self.first_name, "first name")?;
        require_text(&self.last_name, "last name")?;
        self.job_title = non_blank(self.job_title);
        Ok(self)
    }
}

/// Invitation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvite {
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewInvite {
    /// Invite a regular user
    #[inline]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::User,
        }
    }

    /// With role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Validate the email and stamp it into an [`Invite`] for `team_id`
    ///
    /// # Errors
    /// If the email is blank or has no `@`
    pub fn into_invite(self, team_id: TeamId) -> Result<Invite, ValidationError> {
        require_text(&self.email, "email")?;
        let email = self.email.trim().to_string();
        if !email.contains('@') {
            return Err(ValidationError::malformed("email", "missing '@'"));
        }
        Ok(Invite {
            email,
            role: self.role,
            token: Uuid::new_v4(),
            team_id,
        })
    }
}

/// A stored invitation; the recipient joins the team on sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub email: String,
    pub role: Role,
    pub token: Uuid,
    pub team_id: TeamId,
}
