//! In-memory implementation of the Directory trait.
//!
//! Keeps a whole tenant in memory and applies accepted submissions to it, so
//! a second pass sees the effects of the first. Calls are logged and faults
//! can be injected per call, which is what the reconciler tests lean on.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use rewrap_core::{
    DeviceApprovalRequest, DirectoryUser, EncryptedKeyRecord, KeyOwner, PendingRoleAdmin,
    QueuedMembership, RecipientPublicKey, RoleId, TeamDescriptor, TeamMember, TeamUid, UserId,
    UserPublicKey,
};

use crate::commands::{
    DeviceApproval, RemoteOutcome, RoleAdminGrant, TeamCreation, TeamMembershipGrant,
};
use crate::error::{DirectoryError, Result};
use crate::traits::Directory;

/// The remote operations, for call logs and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectoryCall {
    FetchPendingDeviceApprovals,
    FetchWrappedDataKeys,
    SubmitDeviceApprovals,
    FetchUsers,
    FetchUserPublicKeys,
    FetchQueuedTeams,
    FetchQueuedTeamMemberships,
    FetchTeamMembers,
    FetchTeamKeys,
    SubmitTeamCreations,
    SubmitTeamMemberships,
    FetchPendingRoleAdmins,
    FetchRoleKeys,
    SubmitRoleAdminGrants,
}

/// One logged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub call: DirectoryCall,

    /// Number of ids or commands sent with the call.
    pub items: usize,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail,
    TimeOut,
    Truncate(usize),
}

/// In-memory directory.
///
/// All data is lost when the directory is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: RwLock<MemoryDirectoryInner>,
}

#[derive(Default)]
struct MemoryDirectoryInner {
    users: BTreeMap<UserId, DirectoryUser>,

    /// Published public keys by username.
    public_keys: HashMap<String, RecipientPublicKey>,

    data_keys: BTreeMap<UserId, EncryptedKeyRecord>,
    device_requests: Vec<DeviceApprovalRequest>,
    approvals: Vec<DeviceApproval>,

    queued_teams: Vec<TeamDescriptor>,
    teams: BTreeMap<TeamUid, StoredTeam>,
    queued_members: BTreeMap<TeamUid, Vec<UserId>>,
    members: BTreeSet<(TeamUid, UserId)>,
    membership_grants: Vec<TeamMembershipGrant>,

    role_keys: BTreeMap<RoleId, Vec<EncryptedKeyRecord>>,
    pending_role_admins: Vec<PendingRoleAdmin>,
    role_admin_grants: Vec<RoleAdminGrant>,

    /// Users whose submissions are rejected, with the reason given.
    rejected_users: HashMap<UserId, String>,

    calls: Vec<CallRecord>,
    faults: HashMap<(DirectoryCall, usize), Fault>,
    latency: Option<Duration>,
}

struct StoredTeam {
    creation: Option<TeamCreation>,
    keys: Vec<EncryptedKeyRecord>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryDirectoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryDirectoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a user, optionally with a published public key.
    pub fn add_user(&self, user: DirectoryUser, public_key: Option<RecipientPublicKey>) {
        let mut inner = self.write();
        if let Some(key) = public_key {
            inner.public_keys.insert(user.username.clone(), key);
        }
        inner.users.insert(user.id, user);
    }

    /// Store a user's wrapped data key. The record's owner names the user.
    pub fn set_data_key(&self, record: EncryptedKeyRecord) {
        match record.owner {
            KeyOwner::User(user_id) => {
                self.write().data_keys.insert(user_id, record);
            }
            owner => tracing::warn!(%owner, "ignoring data key not owned by a user"),
        }
    }

    /// Queue a device for approval.
    pub fn add_device_request(&self, request: DeviceApprovalRequest) {
        self.write().device_requests.push(request);
    }

    /// Queue a team for creation.
    pub fn queue_team(&self, team: TeamDescriptor) {
        self.write().queued_teams.push(team);
    }

    /// Add an existing team with its protecting-key records.
    pub fn add_team(&self, team_uid: TeamUid, keys: Vec<EncryptedKeyRecord>) {
        self.write().teams.insert(
            team_uid,
            StoredTeam {
                creation: None,
                keys,
            },
        );
    }

    /// Queue a user to join a team. The team does not need to exist yet.
    ///
    /// Queueing the same pair twice yields a duplicate entry, as a real
    /// directory may return.
    pub fn queue_membership(&self, team_uid: TeamUid, user_id: UserId) {
        self.write()
            .queued_members
            .entry(team_uid)
            .or_default()
            .push(user_id);
    }

    /// Record an existing membership.
    pub fn add_member(&self, team_uid: TeamUid, user_id: UserId) {
        self.write().members.insert((team_uid, user_id));
    }

    /// Add a protecting-key record for a role.
    pub fn add_role_key(&self, role_id: RoleId, record: EncryptedKeyRecord) {
        self.write().role_keys.entry(role_id).or_default().push(record);
    }

    /// Queue a role administrator for key grants.
    pub fn queue_role_admin(&self, pending: PendingRoleAdmin) {
        self.write().pending_role_admins.push(pending);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fault injection
    // ─────────────────────────────────────────────────────────────────────────

    /// Make the `nth` (1-based) call of a kind fail with a transport error.
    pub fn fail_call(&self, call: DirectoryCall, nth: usize) {
        self.write().faults.insert((call, nth), Fault::Fail);
    }

    /// Make the `nth` (1-based) call of a kind time out.
    pub fn time_out_call(&self, call: DirectoryCall, nth: usize) {
        self.write().faults.insert((call, nth), Fault::TimeOut);
    }

    /// Make the `nth` (1-based) call of a kind answer with at most `keep` results.
    ///
    /// The call itself still takes full effect.
    pub fn truncate_call(&self, call: DirectoryCall, nth: usize, keep: usize) {
        self.write().faults.insert((call, nth), Fault::Truncate(keep));
    }

    /// Reject every submission on behalf of `user_id`.
    pub fn reject_user(&self, user_id: UserId, reason: impl Into<String>) {
        self.write().rejected_users.insert(user_id, reason.into());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.write().latency = Some(latency);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.read().calls.clone()
    }

    /// Item counts of every call of one kind, in order.
    pub fn calls_of(&self, call: DirectoryCall) -> Vec<usize> {
        self.read()
            .calls
            .iter()
            .filter(|c| c.call == call)
            .map(|c| c.items)
            .collect()
    }

    /// Accepted device approvals.
    pub fn approvals(&self) -> Vec<DeviceApproval> {
        self.read().approvals.clone()
    }

    /// Devices still waiting for approval.
    pub fn pending_device_count(&self) -> usize {
        self.read().device_requests.len()
    }

    /// Accepted team creations.
    pub fn created_teams(&self) -> Vec<TeamCreation> {
        self.read()
            .teams
            .values()
            .filter_map(|t| t.creation.clone())
            .collect()
    }

    /// Accepted membership grants.
    pub fn membership_grants(&self) -> Vec<TeamMembershipGrant> {
        self.read().membership_grants.clone()
    }

    /// Whether `user_id` is a member of `team_uid`.
    pub fn is_member(&self, team_uid: TeamUid, user_id: UserId) -> bool {
        self.read().members.contains(&(team_uid, user_id))
    }

    /// Accepted role admin grants.
    pub fn role_admin_grants(&self) -> Vec<RoleAdminGrant> {
        self.read().role_admin_grants.clone()
    }

    /// Log a call and apply any fault injected for it.
    ///
    /// Returns the number of results to keep when the response is truncated.
    async fn begin(&self, call: DirectoryCall, items: usize) -> Result<Option<usize>> {
        let latency = self.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.write();
        inner.calls.push(CallRecord { call, items });
        let nth = inner.calls.iter().filter(|c| c.call == call).count();

        match inner.faults.remove(&(call, nth)) {
            Some(Fault::Fail) => {
                tracing::debug!(?call, nth, "injected transport failure");
                Err(DirectoryError::Transport(anyhow!(
                    "injected failure on {call:?} call {nth}"
                )))
            }
            Some(Fault::TimeOut) => Err(DirectoryError::Timeout(
                latency.unwrap_or(Duration::from_secs(30)),
            )),
            Some(Fault::Truncate(keep)) => Ok(Some(keep)),
            None => Ok(None),
        }
    }
}

fn truncated(mut outcomes: Vec<RemoteOutcome>, keep: Option<usize>) -> Vec<RemoteOutcome> {
    if let Some(keep) = keep {
        outcomes.truncate(keep);
    }
    outcomes
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn fetch_pending_device_approvals(&self) -> Result<Vec<DeviceApprovalRequest>> {
        self.begin(DirectoryCall::FetchPendingDeviceApprovals, 0).await?;
        Ok(self.read().device_requests.clone())
    }

    async fn fetch_wrapped_data_keys(&self, users: &[UserId]) -> Result<Vec<EncryptedKeyRecord>> {
        self.begin(DirectoryCall::FetchWrappedDataKeys, users.len()).await?;
        let inner = self.read();
        Ok(users
            .iter()
            .filter_map(|id| inner.data_keys.get(id).cloned())
            .collect())
    }

    async fn submit_device_approvals(
        &self,
        approvals: Vec<DeviceApproval>,
    ) -> Result<Vec<RemoteOutcome>> {
        let keep = self
            .begin(DirectoryCall::SubmitDeviceApprovals, approvals.len())
            .await?;
        let mut inner = self.write();

        let mut outcomes = Vec::with_capacity(approvals.len());
        for approval in approvals {
            if let Some(reason) = inner.rejected_users.get(&approval.user_id) {
                outcomes.push(RemoteOutcome::Rejected(reason.clone()));
                continue;
            }
            let position = inner.device_requests.iter().position(|r| {
                r.user_id == approval.user_id && r.device_token == approval.device_token
            });
            match position {
                Some(i) => {
                    inner.device_requests.remove(i);
                    inner.approvals.push(approval);
                    outcomes.push(RemoteOutcome::Accepted);
                }
                None => outcomes.push(RemoteOutcome::Rejected(
                    "device is not awaiting approval".into(),
                )),
            }
        }
        Ok(truncated(outcomes, keep))
    }

    async fn fetch_users(&self) -> Result<Vec<DirectoryUser>> {
        self.begin(DirectoryCall::FetchUsers, 0).await?;
        Ok(self.read().users.values().cloned().collect())
    }

    async fn fetch_user_public_keys(&self, usernames: &[String]) -> Result<Vec<UserPublicKey>> {
        self.begin(DirectoryCall::FetchUserPublicKeys, usernames.len())
            .await?;
        let inner = self.read();
        Ok(usernames
            .iter()
            .filter(|name| inner.users.values().any(|u| &u.username == *name))
            .map(|name| UserPublicKey {
                username: name.clone(),
                public_key: inner.public_keys.get(name).cloned(),
            })
            .collect())
    }

    async fn fetch_queued_teams(&self) -> Result<Vec<TeamDescriptor>> {
        self.begin(DirectoryCall::FetchQueuedTeams, 0).await?;
        Ok(self.read().queued_teams.clone())
    }

    async fn fetch_queued_team_memberships(&self) -> Result<Vec<QueuedMembership>> {
        self.begin(DirectoryCall::FetchQueuedTeamMemberships, 0)
            .await?;
        Ok(self
            .read()
            .queued_members
            .iter()
            .filter(|(_, users)| !users.is_empty())
            .map(|(team_uid, users)| QueuedMembership {
                team_uid: *team_uid,
                users: users.clone(),
            })
            .collect())
    }

    async fn fetch_team_members(&self) -> Result<Vec<TeamMember>> {
        self.begin(DirectoryCall::FetchTeamMembers, 0).await?;
        Ok(self
            .read()
            .members
            .iter()
            .map(|&(team_uid, user_id)| TeamMember { team_uid, user_id })
            .collect())
    }

    async fn fetch_team_keys(&self, teams: &[TeamUid]) -> Result<Vec<EncryptedKeyRecord>> {
        self.begin(DirectoryCall::FetchTeamKeys, teams.len()).await?;
        let inner = self.read();
        Ok(teams
            .iter()
            .filter_map(|uid| inner.teams.get(uid))
            .flat_map(|team| team.keys.iter().cloned())
            .collect())
    }

    async fn submit_team_creations(
        &self,
        creations: Vec<TeamCreation>,
    ) -> Result<Vec<RemoteOutcome>> {
        let keep = self
            .begin(DirectoryCall::SubmitTeamCreations, creations.len())
            .await?;
        let mut inner = self.write();

        let mut outcomes = Vec::with_capacity(creations.len());
        for creation in creations {
            let team_uid = creation.team.team_uid;
            if inner.teams.contains_key(&team_uid) {
                outcomes.push(RemoteOutcome::Rejected("team already exists".into()));
                continue;
            }
            inner.queued_teams.retain(|t| t.team_uid != team_uid);
            inner.teams.insert(
                team_uid,
                StoredTeam {
                    keys: creation.protecting_keys().to_vec(),
                    creation: Some(creation),
                },
            );
            outcomes.push(RemoteOutcome::Accepted);
        }
        Ok(truncated(outcomes, keep))
    }

    async fn submit_team_memberships(
        &self,
        grants: Vec<TeamMembershipGrant>,
    ) -> Result<Vec<RemoteOutcome>> {
        let keep = self
            .begin(DirectoryCall::SubmitTeamMemberships, grants.len())
            .await?;
        let mut inner = self.write();

        let mut outcomes = Vec::with_capacity(grants.len());
        for grant in grants {
            if let Some(reason) = inner.rejected_users.get(&grant.user_id) {
                outcomes.push(RemoteOutcome::Rejected(reason.clone()));
                continue;
            }
            if !inner.teams.contains_key(&grant.team_uid) {
                outcomes.push(RemoteOutcome::Rejected("team not found".into()));
                continue;
            }
            if let Some(queued) = inner.queued_members.get_mut(&grant.team_uid) {
                queued.retain(|u| *u != grant.user_id);
            }
            inner.members.insert((grant.team_uid, grant.user_id));
            inner.membership_grants.push(grant);
            outcomes.push(RemoteOutcome::Accepted);
        }
        Ok(truncated(outcomes, keep))
    }

    async fn fetch_pending_role_admins(&self) -> Result<Vec<PendingRoleAdmin>> {
        self.begin(DirectoryCall::FetchPendingRoleAdmins, 0).await?;
        Ok(self.read().pending_role_admins.clone())
    }

    async fn fetch_role_keys(&self, roles: &[RoleId]) -> Result<Vec<EncryptedKeyRecord>> {
        self.begin(DirectoryCall::FetchRoleKeys, roles.len()).await?;
        let inner = self.read();
        Ok(roles
            .iter()
            .filter_map(|id| inner.role_keys.get(id))
            .flat_map(|records| records.iter().cloned())
            .collect())
    }

    async fn submit_role_admin_grants(
        &self,
        grants: Vec<RoleAdminGrant>,
    ) -> Result<Vec<RemoteOutcome>> {
        let keep = self
            .begin(DirectoryCall::SubmitRoleAdminGrants, grants.len())
            .await?;
        let mut inner = self.write();

        let mut outcomes = Vec::with_capacity(grants.len());
        for grant in grants {
            if let Some(reason) = inner.rejected_users.get(&grant.user_id) {
                outcomes.push(RemoteOutcome::Rejected(reason.clone()));
                continue;
            }
            inner
                .pending_role_admins
                .retain(|p| !(p.role_id == grant.role_id && p.user_id == grant.user_id));
            inner.role_admin_grants.push(grant);
            outcomes.push(RemoteOutcome::Accepted);
        }
        Ok(truncated(outcomes, keep))
    }
}

impl std::fmt::Debug for MemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("MemoryDirectory")
            .field("users", &inner.users.len())
            .field("teams", &inner.teams.len())
            .field("pending_devices", &inner.device_requests.len())
            .field("calls", &inner.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewrap_core::{DeviceToken, KeyType, NodeId, UserStatus};

    fn user(id: i64) -> DirectoryUser {
        DirectoryUser {
            id: UserId(id),
            username: format!("user{id}@example.com"),
            status: UserStatus::Active,
        }
    }

    fn device(user_id: i64, token: u8) -> DeviceApprovalRequest {
        DeviceApprovalRequest {
            user_id: UserId(user_id),
            device_token: DeviceToken(vec![token; 8]),
            device_public_key: vec![token; 32],
        }
    }

    fn approval(user_id: i64, token: u8) -> DeviceApproval {
        DeviceApproval {
            user_id: UserId(user_id),
            device_token: DeviceToken(vec![token; 8]),
            encrypted_data_key: vec![0xee; 48],
        }
    }

    fn creation(uid: u8) -> TeamCreation {
        TeamCreation {
            team: TeamDescriptor {
                team_uid: TeamUid::from_bytes([uid; 16]),
                name: format!("team {uid}"),
                node_id: NodeId(1),
            },
            team_key_by_data_key: vec![1; 40],
            team_key_by_tree_key: vec![3; 60],
            team_public_key: [uid; 32],
            encrypted_team_private_key: vec![4; 60],
        }
    }

    #[tokio::test]
    async fn test_approval_consumes_request() {
        let dir = MemoryDirectory::new();
        dir.add_device_request(device(1, 0xa1));
        dir.add_device_request(device(1, 0xa2));

        let outcomes = dir
            .submit_device_approvals(vec![approval(1, 0xa1)])
            .await
            .unwrap();

        assert_eq!(outcomes, vec![RemoteOutcome::Accepted]);
        assert_eq!(dir.pending_device_count(), 1);
        assert_eq!(dir.approvals().len(), 1);

        // The same approval again no longer matches a request.
        let again = dir
            .submit_device_approvals(vec![approval(1, 0xa1)])
            .await
            .unwrap();
        assert!(!again[0].is_accepted());
    }

    #[tokio::test]
    async fn test_data_keys_only_for_known_users() {
        let dir = MemoryDirectory::new();
        let record = EncryptedKeyRecord::new(
            KeyOwner::User(UserId(1)),
            vec![7; 40],
            KeyType::EncryptedByPublicKey,
        );
        dir.set_data_key(record.clone());
        dir.set_data_key(EncryptedKeyRecord::new(
            KeyOwner::Tenant,
            vec![8; 40],
            KeyType::EncryptedByDataKey,
        ));

        let keys = dir
            .fetch_wrapped_data_keys(&[UserId(1), UserId(2)])
            .await
            .unwrap();
        assert_eq!(keys, vec![record]);
    }

    #[tokio::test]
    async fn test_created_team_exposes_both_wrappings() {
        let dir = MemoryDirectory::new();
        let team = creation(5);
        dir.queue_team(team.team.clone());

        let outcomes = dir.submit_team_creations(vec![team.clone()]).await.unwrap();
        assert_eq!(outcomes, vec![RemoteOutcome::Accepted]);
        assert!(dir.fetch_queued_teams().await.unwrap().is_empty());

        let keys = dir.fetch_team_keys(&[team.team.team_uid]).await.unwrap();
        let types: Vec<u32> = keys.iter().map(|k| k.key_type).collect();
        assert_eq!(types, vec![1, 3]);

        let duplicate = dir.submit_team_creations(vec![team]).await.unwrap();
        assert_eq!(
            duplicate,
            vec![RemoteOutcome::Rejected("team already exists".into())]
        );
    }

    #[tokio::test]
    async fn test_membership_requires_existing_team() {
        let dir = MemoryDirectory::new();
        let uid = TeamUid::from_bytes([8; 16]);
        dir.add_user(user(3), None);
        dir.queue_membership(uid, UserId(3));

        let grant = TeamMembershipGrant {
            team_uid: uid,
            user_id: UserId(3),
            username: "user3@example.com".into(),
            encrypted_team_key: vec![9; 80],
            key_type: KeyType::EncryptedByPublicKey,
        };

        let missing = dir
            .submit_team_memberships(vec![grant.clone()])
            .await
            .unwrap();
        assert!(!missing[0].is_accepted());

        dir.add_team(uid, Vec::new());
        let ok = dir.submit_team_memberships(vec![grant]).await.unwrap();
        assert!(ok[0].is_accepted());
        assert!(dir.is_member(uid, UserId(3)));
        assert!(dir.fetch_queued_team_memberships().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_public_keys_for_known_usernames() {
        let dir = MemoryDirectory::new();
        dir.add_user(user(1), Some(RecipientPublicKey::Ec([1; 32])));
        dir.add_user(user(2), None);

        let keys = dir
            .fetch_user_public_keys(&[
                "user1@example.com".into(),
                "user2@example.com".into(),
                "nobody@example.com".into(),
            ])
            .await
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].public_key, Some(RecipientPublicKey::Ec([1; 32])));
        assert_eq!(keys[1].public_key, None);
    }

    #[tokio::test]
    async fn test_injected_faults_hit_the_nth_call() {
        let dir = MemoryDirectory::new();
        dir.fail_call(DirectoryCall::FetchUsers, 2);
        dir.time_out_call(DirectoryCall::FetchQueuedTeams, 1);

        assert!(dir.fetch_users().await.is_ok());
        assert!(matches!(
            dir.fetch_users().await,
            Err(DirectoryError::Transport(_))
        ));
        assert!(dir.fetch_users().await.is_ok());
        assert!(matches!(
            dir.fetch_queued_teams().await,
            Err(DirectoryError::Timeout(_))
        ));

        assert_eq!(dir.calls_of(DirectoryCall::FetchUsers), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_truncated_response_still_applies() {
        let dir = MemoryDirectory::new();
        dir.add_device_request(device(1, 1));
        dir.add_device_request(device(1, 2));
        dir.truncate_call(DirectoryCall::SubmitDeviceApprovals, 1, 1);

        let outcomes = dir
            .submit_device_approvals(vec![approval(1, 1), approval(1, 2)])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(dir.pending_device_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_user() {
        let dir = MemoryDirectory::new();
        dir.add_device_request(device(4, 1));
        dir.reject_user(UserId(4), "device limit reached");

        let outcomes = dir
            .submit_device_approvals(vec![approval(4, 1)])
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![RemoteOutcome::Rejected("device limit reached".into())]
        );
        assert_eq!(dir.pending_device_count(), 1);
    }

    #[tokio::test]
    async fn test_role_grant_clears_pending() {
        let dir = MemoryDirectory::new();
        dir.queue_role_admin(PendingRoleAdmin {
            role_id: RoleId(2),
            user_id: UserId(6),
        });

        let outcomes = dir
            .submit_role_admin_grants(vec![RoleAdminGrant {
                role_id: RoleId(2),
                user_id: UserId(6),
                encrypted_tree_key: vec![1; 80],
                encrypted_role_key: None,
            }])
            .await
            .unwrap();

        assert!(outcomes[0].is_accepted());
        assert!(dir.fetch_pending_role_admins().await.unwrap().is_empty());
        assert_eq!(dir.role_admin_grants().len(), 1);
    }
}
