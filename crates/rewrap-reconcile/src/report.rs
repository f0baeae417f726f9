//! Pass report: what one reconciliation pass did, grant by grant.

use std::fmt;

use serde::Serialize;

use rewrap_core::{KeyOwner, PendingGrant, TeamDescriptor, TeamUid};
use rewrap_directory::RemoteOutcome;
use rewrap_keys::KeyError;

use crate::batch::BatchResult;
use crate::error::{ReconcileError, Result};

/// Result of a submitted grant, as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Submission {
    Success,
    Failure(String),
}

impl From<RemoteOutcome> for Submission {
    fn from(outcome: RemoteOutcome) -> Self {
        match outcome {
            RemoteOutcome::Accepted => Submission::Success,
            RemoteOutcome::Rejected(reason) => Submission::Failure(reason),
        }
    }
}

/// A grant that was submitted, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub grant: PendingGrant,
    pub result: Submission,
}

/// Why a grant was not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The recipient has not published a public key.
    MissingPublicKey,
    /// The recipient's public key cannot be used.
    InvalidPublicKey(String),
    /// The protecting key exists but did not decrypt.
    UndecryptableKey(String),
    /// There is no protecting key to re-wrap.
    MissingKey(KeyOwner),
    /// The recipient is not an active directory user.
    InactiveUser,
    /// The recipient already holds the grant.
    AlreadyGranted,
}

impl SkipReason {
    /// Classify a failure to resolve a protecting key.
    pub fn from_resolution(err: &KeyError) -> Self {
        match err {
            KeyError::NoRecord(owner) => SkipReason::MissingKey(*owner),
            other => SkipReason::UndecryptableKey(other.to_string()),
        }
    }

    /// Classify a failure to wrap a key for a recipient.
    pub fn from_wrap(err: &KeyError) -> Self {
        SkipReason::InvalidPublicKey(err.to_string())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPublicKey => write!(f, "recipient has no public key"),
            SkipReason::InvalidPublicKey(e) => write!(f, "invalid recipient public key: {e}"),
            SkipReason::UndecryptableKey(e) => write!(f, "protecting key did not decrypt: {e}"),
            SkipReason::MissingKey(owner) => write!(f, "no protecting key for {owner}"),
            SkipReason::InactiveUser => write!(f, "recipient is not active"),
            SkipReason::AlreadyGranted => write!(f, "recipient already has access"),
        }
    }
}

/// A grant that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGrant {
    pub grant: PendingGrant,
    pub reason: SkipReason,
}

/// Result of a submitted team creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamCreationOutcome {
    pub team_uid: TeamUid,
    pub name: String,
    pub result: Submission,
}

/// Classification of a pass-ending error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FatalKind {
    Transport,
    ProtocolAnomaly,
    Configuration,
}

/// The error that ended a pass early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FatalError {
    pub kind: FatalKind,
    pub message: String,
}

impl From<&ReconcileError> for FatalError {
    fn from(err: &ReconcileError) -> Self {
        let kind = match err {
            ReconcileError::Directory(_) => FatalKind::Transport,
            ReconcileError::ProtocolAnomaly { .. } => FatalKind::ProtocolAnomaly,
            ReconcileError::Configuration(_) => FatalKind::Configuration,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Everything one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Submitted grants, in submission order.
    pub grant_outcomes: Vec<GrantOutcome>,

    /// Grants that were not submitted, with the reason.
    pub skipped: Vec<SkippedGrant>,

    /// Grants that were ready but never sent because submission halted.
    pub abandoned: Vec<PendingGrant>,

    /// Submitted team creations.
    pub teams_created: Vec<TeamCreationOutcome>,

    /// Team creations that were ready but never sent because submission halted.
    pub abandoned_teams: Vec<TeamDescriptor>,

    /// The error that ended the pass, if any.
    pub fatal_error: Option<FatalError>,
}

impl PassReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped grant.
    pub fn skip(&mut self, grant: PendingGrant, reason: SkipReason) {
        tracing::warn!(user_id = %grant.user_id(), %grant, %reason, "grant skipped");
        self.skipped.push(SkippedGrant { grant, reason });
    }

    /// Attribute a batch's outcomes to the grants that were submitted.
    ///
    /// `grants` must be in submission order. Grants past the attributed
    /// outcomes are recorded as abandoned and the halt, if any, is returned.
    pub fn record_submissions(&mut self, grants: Vec<PendingGrant>, batch: BatchResult) -> Result<()> {
        let mut grants = grants.into_iter();
        for (outcome, grant) in batch.outcomes.into_iter().zip(grants.by_ref()) {
            match &outcome {
                RemoteOutcome::Accepted => tracing::debug!(%grant, "grant accepted"),
                RemoteOutcome::Rejected(reason) => {
                    tracing::warn!(user_id = %grant.user_id(), %grant, %reason, "grant rejected")
                }
            }
            self.grant_outcomes.push(GrantOutcome {
                grant,
                result: outcome.into(),
            });
        }
        self.abandoned.extend(grants);

        match batch.halt {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record the error that ended the pass.
    pub fn set_fatal(&mut self, err: &ReconcileError) {
        self.fatal_error = Some(FatalError::from(err));
    }

    /// Number of grants the directory accepted.
    pub fn succeeded(&self) -> usize {
        self.grant_outcomes
            .iter()
            .filter(|o| o.result == Submission::Success)
            .count()
    }

    /// Number of grants the directory rejected.
    pub fn failed(&self) -> usize {
        self.grant_outcomes.len() - self.succeeded()
    }

    /// Whether the pass had nothing to do.
    pub fn is_empty(&self) -> bool {
        self.grant_outcomes.is_empty()
            && self.skipped.is_empty()
            && self.abandoned.is_empty()
            && self.teams_created.is_empty()
            && self.abandoned_teams.is_empty()
            && self.fatal_error.is_none()
    }
}
