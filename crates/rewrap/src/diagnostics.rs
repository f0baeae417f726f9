//! Where finished passes go.
//!
//! A pass report is drained into a [`DiagnosticsSink`] exactly once, after
//! the pass has stopped touching the directory and before the guard is
//! released.

use std::sync::{Mutex, PoisonError};

use rewrap_core::Scope;
use rewrap_reconcile::{PassReport, Submission};

use crate::triggers::Trigger;

/// Receives the report of every finished pass.
pub trait DiagnosticsSink: Send + Sync {
    fn drain(&self, trigger: Trigger, scope: Scope, report: &PassReport);
}

/// Logs every outcome through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn drain(&self, trigger: Trigger, scope: Scope, report: &PassReport) {
        for outcome in &report.grant_outcomes {
            let grant = &outcome.grant;
            match &outcome.result {
                Submission::Success => {
                    tracing::info!(user_id = %grant.user_id(), %grant, "approved")
                }
                Submission::Failure(reason) => {
                    tracing::warn!(user_id = %grant.user_id(), %grant, %reason, "failed")
                }
            }
        }
        for skipped in &report.skipped {
            tracing::warn!(
                user_id = %skipped.grant.user_id(),
                grant = %skipped.grant,
                reason = %skipped.reason,
                "error"
            );
        }
        for team in &report.teams_created {
            match &team.result {
                Submission::Success => tracing::info!(team_uid = %team.team_uid, name = %team.name, "team created"),
                Submission::Failure(reason) => {
                    tracing::warn!(team_uid = %team.team_uid, name = %team.name, %reason, "team creation failed")
                }
            }
        }
        for team in &report.abandoned_teams {
            tracing::warn!(team_uid = %team.team_uid, name = %team.name, "team creation abandoned");
        }
        if let Some(fatal) = &report.fatal_error {
            tracing::error!(kind = ?fatal.kind, message = %fatal.message, "pass ended early");
        }

        tracing::info!(
            %trigger,
            %scope,
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            abandoned = report.abandoned.len(),
            abandoned_teams = report.abandoned_teams.len(),
            "pass finished"
        );
    }
}

/// A drained pass, as kept by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedPass {
    pub trigger: Trigger,
    pub scope: Scope,
    pub report: PassReport,
}

/// Keeps every drained report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    passes: Mutex<Vec<DrainedPass>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pass drained so far, oldest first.
    pub fn passes(&self) -> Vec<DrainedPass> {
        self.passes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.passes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for MemorySink {
    fn drain(&self, trigger: Trigger, scope: Scope, report: &PassReport) {
        self.passes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DrainedPass {
                trigger,
                scope,
                report: report.clone(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewrap_core::{PendingGrant, UserId};
    use rewrap_reconcile::SkipReason;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        let mut report = PassReport::new();
        report.skip(
            PendingGrant::RoleAdmin {
                role_id: rewrap_core::RoleId(1),
                user_id: UserId(2),
            },
            SkipReason::InactiveUser,
        );
        sink.drain(Trigger::Manual, Scope::Teams, &PassReport::new());
        sink.drain(Trigger::Timer, Scope::Devices, &report);

        let passes = sink.passes();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].trigger, Trigger::Manual);
        assert_eq!(passes[1].report, report);
    }

    #[test]
    fn test_tracing_sink_accepts_any_report() {
        let mut report = PassReport::new();
        report.skip(
            PendingGrant::RoleAdmin {
                role_id: rewrap_core::RoleId(1),
                user_id: UserId(2),
            },
            SkipReason::MissingPublicKey,
        );
        TracingSink.drain(Trigger::Notification, Scope::Both, &report);
    }
}
