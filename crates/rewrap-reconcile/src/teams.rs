//! Team reconciliation: creating queued teams, then adding queued members.
//!
//! The two stages run in that order within a pass. Keys of teams created
//! in the first stage are seeded into the resolver, so queued members of a
//! brand-new team are added in the same pass.

use std::collections::{HashMap, HashSet};

use rewrap_core::{
    DirectoryUser, KeyOwner, KeyType, PendingGrant, RecipientPublicKey, TeamDescriptor, TeamUid,
    UserId,
};
use rewrap_directory::{Directory, TeamCreation, TeamMembershipGrant};
use rewrap_keys::{
    wrap_for_recipient, KeyEnvelope, KeyResolver, SessionKeyContext, SymmetricKey,
    X25519StaticSecret,
};

use crate::batch::BatchSubmitter;
use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::report::{PassReport, SkipReason, Submission, TeamCreationOutcome};

/// Creates teams and adds members to them.
pub struct TeamReconciler<'a, D: ?Sized> {
    directory: &'a D,
    creations: BatchSubmitter,
    memberships: BatchSubmitter,
    key_fetch_limit: usize,
}

impl<'a, D: Directory + ?Sized> TeamReconciler<'a, D> {
    pub fn new(directory: &'a D, config: &ReconcileConfig) -> Self {
        Self {
            directory,
            creations: BatchSubmitter::new(config.page_limits.team_creations),
            memberships: BatchSubmitter::new(config.page_limits.team_memberships),
            key_fetch_limit: config.key_fetch_limit.max(1),
        }
    }

    /// Create queued teams, then add queued members.
    pub async fn reconcile(
        &self,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> Result<()> {
        self.create_teams(resolver, report).await?;
        self.add_memberships(resolver, report).await
    }

    /// Generate key material for every queued team and submit the creations.
    ///
    /// Each accepted team's key is seeded into `resolver`.
    pub async fn create_teams(
        &self,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> Result<()> {
        let queued = self.directory.fetch_queued_teams().await?;
        if queued.is_empty() {
            tracing::debug!("no teams queued for creation");
            return Ok(());
        }

        let session = resolver.session();
        let mut creations = Vec::with_capacity(queued.len());
        let mut team_keys = Vec::with_capacity(queued.len());
        for team in queued {
            let team_key = SymmetricKey::generate();
            match team_creation(session, &team, &team_key) {
                Ok(creation) => {
                    creations.push(creation);
                    team_keys.push(team_key);
                }
                Err(e) => {
                    tracing::warn!(team_uid = %team.team_uid, error = %e, "could not build team key material");
                    report.teams_created.push(TeamCreationOutcome {
                        team_uid: team.team_uid,
                        name: team.name,
                        result: Submission::Failure(e.to_string()),
                    });
                }
            }
        }

        if creations.is_empty() {
            return Ok(());
        }

        let teams: Vec<TeamDescriptor> = creations.iter().map(|c| c.team.clone()).collect();
        tracing::info!(count = creations.len(), "submitting team creations");
        let batch = self
            .creations
            .submit(creations, |page| self.directory.submit_team_creations(page))
            .await;

        let mut teams = teams.into_iter();
        for ((outcome, team), key) in batch.outcomes.into_iter().zip(teams.by_ref()).zip(team_keys) {
            if outcome.is_accepted() {
                tracing::info!(team_uid = %team.team_uid, "team created");
                resolver.seed(KeyOwner::Team(team.team_uid), key);
            } else {
                tracing::warn!(team_uid = %team.team_uid, ?outcome, "team creation rejected");
            }
            report.teams_created.push(TeamCreationOutcome {
                team_uid: team.team_uid,
                name: team.name,
                result: outcome.into(),
            });
        }
        report.abandoned_teams.extend(teams);

        match batch.halt {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wrap team keys for queued members and submit the memberships.
    pub async fn add_memberships(
        &self,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> Result<()> {
        let queued = self.directory.fetch_queued_team_memberships().await?;
        if queued.iter().all(|q| q.users.is_empty()) {
            tracing::debug!("no queued team memberships");
            return Ok(());
        }

        let users: HashMap<UserId, DirectoryUser> = self
            .directory
            .fetch_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let members: HashSet<(TeamUid, UserId)> = self
            .directory
            .fetch_team_members()
            .await?
            .into_iter()
            .map(|m| (m.team_uid, m.user_id))
            .collect();

        // Expand to distinct (team, user) pairs and drop the ones that
        // cannot or need not be granted.
        let mut seen = HashSet::new();
        let mut candidates: Vec<(TeamUid, &DirectoryUser)> = Vec::new();
        for membership in &queued {
            for &user_id in &membership.users {
                let pair = (membership.team_uid, user_id);
                if !seen.insert(pair) {
                    continue;
                }
                let grant = PendingGrant::TeamMembership {
                    team_uid: membership.team_uid,
                    user_id,
                };
                let user = match users.get(&user_id) {
                    Some(user) if user.is_active() => user,
                    _ => {
                        report.skip(grant, SkipReason::InactiveUser);
                        continue;
                    }
                };
                if members.contains(&pair) {
                    report.skip(grant, SkipReason::AlreadyGranted);
                    continue;
                }
                candidates.push((membership.team_uid, user));
            }
        }

        if candidates.is_empty() {
            return Ok(());
        }

        let team_keys = self.resolve_team_keys(resolver, &candidates).await?;
        let public_keys = self.fetch_public_keys(&candidates).await?;

        let mut grants = Vec::new();
        let mut commands = Vec::new();
        for (team_uid, user) in candidates {
            let grant = PendingGrant::TeamMembership {
                team_uid,
                user_id: user.id,
            };

            let team_key = match team_keys.get(&team_uid) {
                Some(Ok(key)) => key,
                Some(Err(reason)) => {
                    report.skip(grant, reason.clone());
                    continue;
                }
                None => {
                    report.skip(grant, SkipReason::MissingKey(KeyOwner::Team(team_uid)));
                    continue;
                }
            };
            let Some(public_key) = public_keys.get(&user.username) else {
                report.skip(grant, SkipReason::MissingPublicKey);
                continue;
            };

            match wrap_for_recipient(team_key, public_key) {
                Ok(encrypted_team_key) => {
                    commands.push(TeamMembershipGrant {
                        team_uid,
                        user_id: user.id,
                        username: user.username.clone(),
                        encrypted_team_key,
                        key_type: KeyType::EncryptedByPublicKey,
                    });
                    grants.push(grant);
                }
                Err(e) => report.skip(grant, SkipReason::from_wrap(&e)),
            }
        }

        if commands.is_empty() {
            return Ok(());
        }

        tracing::info!(count = commands.len(), "submitting team memberships");
        let batch = self
            .memberships
            .submit(commands, |page| self.directory.submit_team_memberships(page))
            .await;
        report.record_submissions(grants, batch)
    }

    /// Resolve the key of every team in `candidates`, fetching protecting
    /// keys for uncached teams in chunks of the key fetch limit.
    async fn resolve_team_keys(
        &self,
        resolver: &mut KeyResolver<'_>,
        candidates: &[(TeamUid, &DirectoryUser)],
    ) -> Result<HashMap<TeamUid, std::result::Result<SymmetricKey, SkipReason>>> {
        let mut resolved = HashMap::new();
        let mut uncached = Vec::new();
        for &(team_uid, _) in candidates {
            if resolved.contains_key(&team_uid) || uncached.contains(&team_uid) {
                continue;
            }
            match resolver.cached(&KeyOwner::Team(team_uid)) {
                Some(key) => {
                    resolved.insert(team_uid, Ok(key.clone()));
                }
                None => uncached.push(team_uid),
            }
        }

        for chunk in uncached.chunks(self.key_fetch_limit) {
            let records = self.directory.fetch_team_keys(chunk).await?;
            for &team_uid in chunk {
                let key = resolver
                    .resolve_first(KeyOwner::Team(team_uid), &records)
                    .map_err(|e| {
                        let reason = SkipReason::from_resolution(&e);
                        tracing::warn!(%team_uid, %reason, "team key unavailable");
                        reason
                    });
                resolved.insert(team_uid, key);
            }
        }

        Ok(resolved)
    }

    async fn fetch_public_keys(
        &self,
        candidates: &[(TeamUid, &DirectoryUser)],
    ) -> Result<HashMap<String, RecipientPublicKey>> {
        let mut seen = HashSet::new();
        let usernames: Vec<String> = candidates
            .iter()
            .map(|(_, user)| user.username.clone())
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Ok(self
            .directory
            .fetch_user_public_keys(&usernames)
            .await?
            .into_iter()
            .filter_map(|k| k.public_key.map(|pk| (k.username, pk)))
            .collect())
    }
}

/// Build the creation command for `team` around a freshly generated key.
fn team_creation(
    session: &SessionKeyContext,
    team: &TeamDescriptor,
    team_key: &SymmetricKey,
) -> rewrap_keys::Result<TeamCreation> {
    let team_pair = X25519StaticSecret::generate();
    Ok(TeamCreation {
        team: team.clone(),
        team_key_by_data_key: session.data_key().wrap_key(team_key)?,
        team_key_by_tree_key: KeyEnvelope::seal_key(team_key, session.tree_key())?.to_bytes(),
        team_public_key: *team_pair.public_key().as_bytes(),
        encrypted_team_private_key: KeyEnvelope::seal(&team_pair.to_bytes(), team_key)?
            .to_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageLimits;
    use rewrap_core::UserStatus;
    use rewrap_directory::DirectoryCall;
    use rewrap_testkit::TenantFixture;

    async fn run(
        tenant: &TenantFixture,
        config: &ReconcileConfig,
    ) -> (PassReport, Result<()>) {
        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        let result = TeamReconciler::new(tenant.directory.as_ref(), config)
            .reconcile(&mut resolver, &mut report)
            .await;
        (report, result)
    }

    #[tokio::test]
    async fn test_created_team_key_resolves_both_ways() {
        let tenant = TenantFixture::new();
        let team = tenant.queue_team("Engineering");

        let (report, result) = run(&tenant, &ReconcileConfig::default()).await;
        result.unwrap();

        assert_eq!(report.teams_created.len(), 1);
        assert_eq!(report.teams_created[0].result, Submission::Success);

        let created = &tenant.directory.created_teams()[0];
        assert_eq!(created.team, team);

        let session = tenant.session();
        let records = created.protecting_keys();
        let mut by_data = KeyResolver::new(&session);
        let mut by_tree = KeyResolver::new(&session);
        let a = by_data.resolve(&records[0]).unwrap();
        let b = by_tree.resolve(&records[1]).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let private = KeyEnvelope::from_bytes(&created.encrypted_team_private_key)
            .unwrap()
            .open(&a)
            .unwrap();
        let secret = X25519StaticSecret::try_from_slice(&private).unwrap();
        assert_eq!(secret.public_key().as_bytes(), &created.team_public_key);
    }

    #[tokio::test]
    async fn test_new_team_members_added_in_same_pass() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let team = tenant.queue_team("Support");
        tenant.queue_membership(team.team_uid, alice.id);

        let (report, result) = run(&tenant, &ReconcileConfig::default()).await;
        result.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert!(tenant.directory.is_member(team.team_uid, alice.id));
        // The seeded key served the membership; nothing was fetched for it.
        assert!(tenant.directory.calls_of(DirectoryCall::FetchTeamKeys).is_empty());

        let grant = &tenant.directory.membership_grants()[0];
        let created = &tenant.directory.created_teams()[0];
        let session = tenant.session();
        let team_key = KeyResolver::new(&session)
            .resolve(&created.protecting_keys()[1])
            .unwrap();
        assert_eq!(alice.open(&grant.encrypted_team_key).as_bytes(), team_key.as_bytes());
    }

    #[tokio::test]
    async fn test_membership_for_missing_team_skipped() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let ghost = TeamUid::from_bytes([0xab; 16]);
        tenant.queue_membership(ghost, alice.id);

        let (report, result) = run(&tenant, &ReconcileConfig::default()).await;
        result.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::MissingKey(KeyOwner::Team(ghost))
        );
        assert!(report.grant_outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_skip_reasons_per_member() {
        let tenant = TenantFixture::new();
        let (team_uid, team_key) = tenant.add_team(KeyType::EncryptedByTreeKey);
        let active = tenant.add_user(1);
        let locked = tenant.add_user_with(2, UserStatus::Locked, true);
        let keyless = tenant.add_user_with(3, UserStatus::Active, false);
        let rsa = tenant.add_rsa_user(4);
        let member = tenant.add_user(5);
        tenant.directory.add_member(team_uid, member.id);

        for user in [active.id, locked.id, keyless.id, rsa.id, member.id, UserId(99)] {
            tenant.queue_membership(team_uid, user);
        }

        let (report, result) = run(&tenant, &ReconcileConfig::default()).await;
        result.unwrap();

        let reason_of = |id: UserId| {
            report
                .skipped
                .iter()
                .find(|s| s.grant.user_id() == id)
                .map(|s| s.reason.clone())
        };
        assert_eq!(reason_of(locked.id), Some(SkipReason::InactiveUser));
        assert_eq!(reason_of(UserId(99)), Some(SkipReason::InactiveUser));
        assert_eq!(reason_of(keyless.id), Some(SkipReason::MissingPublicKey));
        assert_eq!(reason_of(rsa.id), None);
        assert_eq!(reason_of(member.id), Some(SkipReason::AlreadyGranted));

        assert_eq!(report.grant_outcomes.len(), 2);
        let grants = tenant.directory.membership_grants();
        let grant_for = |id: UserId| grants.iter().find(|g| g.user_id == id).unwrap();
        assert_eq!(
            active.open(&grant_for(active.id).encrypted_team_key).as_bytes(),
            team_key.as_bytes()
        );
        assert_eq!(
            rsa.open(&grant_for(rsa.id).encrypted_team_key).as_bytes(),
            team_key.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_team_keys_resolved_by_their_own_discriminant() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let teams: Vec<_> = [
            KeyType::EncryptedByDataKey,
            KeyType::EncryptedByPublicKey,
            KeyType::EncryptedByTreeKey,
        ]
        .into_iter()
        .map(|kt| tenant.add_team(kt))
        .collect();
        for (uid, _) in &teams {
            tenant.queue_membership(*uid, alice.id);
        }

        let config = ReconcileConfig::default().with_key_fetch_limit(2);
        let (report, result) = run(&tenant, &config).await;
        result.unwrap();

        assert_eq!(report.succeeded(), 3);
        assert_eq!(
            tenant.directory.calls_of(DirectoryCall::FetchTeamKeys),
            vec![2, 1]
        );
        for grant in tenant.directory.membership_grants() {
            let (_, key) = teams.iter().find(|(uid, _)| *uid == grant.team_uid).unwrap();
            assert_eq!(alice.open(&grant.encrypted_team_key).as_bytes(), key.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_duplicate_queue_entries_collapse() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let (team_uid, _) = tenant.add_team(KeyType::EncryptedByDataKey);
        tenant.queue_membership(team_uid, alice.id);
        tenant.queue_membership(team_uid, alice.id);

        let config = ReconcileConfig::default().with_page_limits(PageLimits::uniform(1));
        let (report, result) = run(&tenant, &config).await;
        result.unwrap();

        assert_eq!(report.grant_outcomes.len(), 1);
        assert_eq!(
            tenant.directory.calls_of(DirectoryCall::SubmitTeamMemberships),
            vec![1]
        );
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_membership_unresolved() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let team = tenant.queue_team("Finance");
        tenant.queue_membership(team.team_uid, alice.id);
        tenant
            .directory
            .fail_call(DirectoryCall::SubmitTeamCreations, 1);

        let (report, result) = run(&tenant, &ReconcileConfig::default()).await;

        assert!(result.is_err());
        assert!(report.teams_created.is_empty());
        assert!(report.grant_outcomes.is_empty());
        assert!(tenant
            .directory
            .calls_of(DirectoryCall::FetchQueuedTeamMemberships)
            .is_empty());
    }

    #[tokio::test]
    async fn test_halted_creation_reports_unsent_teams() {
        let tenant = TenantFixture::new();
        let finance = tenant.queue_team("Finance");
        let legal = tenant.queue_team("Legal");
        let ops = tenant.queue_team("Ops");
        tenant
            .directory
            .fail_call(DirectoryCall::SubmitTeamCreations, 2);

        let config = ReconcileConfig::default().with_page_limits(PageLimits {
            team_creations: 1,
            ..PageLimits::default()
        });
        let (report, result) = run(&tenant, &config).await;

        assert!(result.is_err());
        assert_eq!(report.teams_created.len(), 1);
        assert_eq!(report.teams_created[0].team_uid, finance.team_uid);
        assert_eq!(report.teams_created[0].result, Submission::Success);
        assert_eq!(report.abandoned_teams, vec![legal, ops]);
        assert!(!report.is_empty());
        assert_eq!(
            tenant.directory.calls_of(DirectoryCall::SubmitTeamCreations),
            vec![1, 1]
        );
    }
}
