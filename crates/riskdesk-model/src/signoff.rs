//! Signatory / signature rules
//!
//! Each (assessment, user) pair is in one of three states:
//!
//! ```text
//! NotRequired --admin marks--> Required --user signs--> Signed
//!      ^                          |
//!      +------admin unmarks-------+
//! ```
//!
//! `Signed` is terminal. An admin may still remove the requirement from a
//! user who has signed; the signature stays as a historical record (see
//! [`SignoffLedger::orphaned_signatures`]) and the pair keeps reading as
//! `Signed`.

use crate::ids::{AssessmentId, UserId};
use crate::team::{Role, TeamMember};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// "This user must sign this assessment"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signatory {
    pub ra_id: AssessmentId,
    pub user_id: UserId,
}

/// Proof that a signatory acknowledged the assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub ra_id: AssessmentId,
    pub user_id: UserId,
    pub signed_at: DateTime<Utc>,
}

/// Sign-off state of one (assessment, user) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignoffState {
    NotRequired,
    Required,
    Signed,
}

/// Outcome of a requirement change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State or stored rows changed
    Applied,
    /// Nothing to do
    Unchanged,
}

/// Sign-off rule violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignoffError {
    /// Only team admins may change who must sign
    #[error("only a team admin may change signatories")]
    NotAdmin,

    /// Target is not in the required set
    #[error("user {user} is not a required signatory")]
    NotRequired { user: UserId },

    /// Target already signed
    #[error("user {user} has already signed")]
    AlreadySigned { user: UserId },

    /// Actor tried to sign for somebody else
    #[error("user {actor} cannot sign on behalf of {target}")]
    OnBehalfOf { actor: UserId, target: UserId },

    /// Transition not in the table
    #[error("illegal sign-off transition: {from:?} -> {to:?}")]
    IllegalTransition { from: SignoffState, to: SignoffState },
}

/// States reachable from `from` in one step.
pub fn allowed_transitions(from: SignoffState) -> Vec<SignoffState> {
    use SignoffState::*;
    match from {
        NotRequired => vec![Required],
        Required => vec![NotRequired, Signed],
        Signed => vec![],
    }
}

/// Validates a state transition.
pub fn validate_transition(from: SignoffState, to: SignoffState) -> Result<(), SignoffError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SignoffError::IllegalTransition { from, to })
    }
}

/// One roster line: a team member and their sign-off standing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub user_id: UserId,
    pub display_name: String,
    pub state: SignoffState,
    pub signed_at: Option<DateTime<Utc>>,
    /// The viewing user may sign this row now
    pub can_sign: bool,
}

/// Who must sign an assessment and who has
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignoffLedger {
    required: BTreeSet<UserId>,
    signatures: BTreeMap<UserId, DateTime<Utc>>,
}

impl SignoffLedger {
    /// Empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the stored rows
    pub fn from_rows(
        signatories: impl IntoIterator<Item = Signatory>,
        signatures: impl IntoIterator<Item = Signature>,
    ) -> Self {
        Self {
            required: signatories.into_iter().map(|s| s.user_id).collect(),
            signatures: signatures
                .into_iter()
                .map(|s| (s.user_id, s.signed_at))
                .collect(),
        }
    }

    /// Current state of `user`
    #[must_use]
    pub fn state_of(&self, user: UserId) -> SignoffState {
        if self.signatures.contains_key(&user) {
            SignoffState::Signed
        } else if self.required.contains(&user) {
            SignoffState::Required
        } else {
            SignoffState::NotRequired
        }
    }

    /// When `user` signed, if they have
    #[inline]
    #[must_use]
    pub fn signed_at(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.signatures.get(&user).copied()
    }

    /// Check if `user` is in the required set
    #[inline]
    #[must_use]
    pub fn is_required(&self, user: UserId) -> bool {
        self.required.contains(&user)
    }

    /// Required signatories, ordered by id
    pub fn required(&self) -> impl Iterator<Item = UserId> + '_ {
        self.required.iter().copied()
    }

    /// Required signatories who have not signed yet
    #[must_use]
    pub fn outstanding(&self) -> Vec<UserId> {
        self.required
            .iter()
            .filter(|u| !self.signatures.contains_key(u))
            .copied()
            .collect()
    }

    /// Every required signatory has signed (vacuously true with none)
    #[inline]
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.outstanding().is_empty()
    }

    /// Signatures whose requirement has since been removed
    #[must_use]
    pub fn orphaned_signatures(&self) -> Vec<(UserId, DateTime<Utc>)> {
        self.signatures
            .iter()
            .filter(|(u, _)| !self.required.contains(u))
            .map(|(u, at)| (*u, *at))
            .collect()
    }

    /// Check that `actor_role` may mark `target` as required
    ///
    /// Marking someone already required is a no-op.
    ///
    /// # Errors
    /// `NotAdmin` for non-admins
    pub fn check_require(&self, actor_role: Role, target: UserId) -> Result<Transition, SignoffError> {
        if !actor_role.is_admin() {
            return Err(SignoffError::NotAdmin);
        }
        if self.required.contains(&target) {
            return Ok(Transition::Unchanged);
        }
        Ok(Transition::Applied)
    }

    /// Check that `actor_role` may remove `target`'s requirement
    ///
    /// Allowed whatever the signature state; a no-op when not required.
    ///
    /// # Errors
    /// `NotAdmin` for non-admins
    pub fn check_unrequire(&self, actor_role: Role, target: UserId) -> Result<Transition, SignoffError> {
        if !actor_role.is_admin() {
            return Err(SignoffError::NotAdmin);
        }
        if self.required.contains(&target) {
            Ok(Transition::Applied)
        } else {
            Ok(Transition::Unchanged)
        }
    }

    /// Check that `actor` may sign for `target`
    ///
    /// # Errors
    /// - `OnBehalfOf` if `actor != target`
    /// - `AlreadySigned` if a signature exists
    /// - `NotRequired` if `target` is not a required signatory
    pub fn check_sign(&self, actor: UserId, target: UserId) -> Result<(), SignoffError> {
        if actor != target {
            return Err(SignoffError::OnBehalfOf { actor, target });
        }
        match self.state_of(target) {
            SignoffState::Signed => Err(SignoffError::AlreadySigned { user: target }),
            SignoffState::NotRequired => Err(SignoffError::NotRequired { user: target }),
            SignoffState::Required => {
                validate_transition(SignoffState::Required, SignoffState::Signed)
            }
        }
    }

    /// Convenience form of [`Self::check_sign`]
    #[inline]
    #[must_use]
    pub fn can_sign(&self, actor: UserId, target: UserId) -> bool {
        self.check_sign(actor, target).is_ok()
    }

    /// Record a stored requirement
    pub fn record_required(&mut self, user: UserId) {
        self.required.insert(user);
    }

    /// Record a removed requirement
    pub fn record_unrequired(&mut self, user: UserId) {
        self.required.remove(&user);
    }

    /// Record a stored signature
    ///
    /// # Errors
    /// `AlreadySigned` if the ledger already holds one for this user
    pub fn record_signature(&mut self, signature: &Signature) -> Result<(), SignoffError> {
        if self.signatures.contains_key(&signature.user_id) {
            return Err(SignoffError::AlreadySigned {
                user: signature.user_id,
            });
        }
        self.signatures.insert(signature.user_id, signature.signed_at);
        Ok(())
    }

    /// Per-member rows as seen by `viewer`
    #[must_use]
    pub fn roster(&self, members: &[TeamMember], viewer: UserId) -> Vec<RosterRow> {
        members
            .iter()
            .map(|member| RosterRow {
                user_id: member.id,
                display_name: member.display_name(),
                state: self.state_of(member.id),
                signed_at: self.signed_at(member.id),
                can_sign: self.can_sign(viewer, member.id),
            })
            .collect()
    }
}
