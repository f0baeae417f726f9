//! Directory trait: the remote operations a reconciliation pass consumes.
//!
//! The transport, the session it runs in, and the page limits the remote
//! side enforces all live behind this trait. Callers are responsible for
//! paging submissions; an implementation answers one call with one response.

use async_trait::async_trait;
use rewrap_core::{
    DeviceApprovalRequest, DirectoryUser, EncryptedKeyRecord, PendingRoleAdmin, QueuedMembership,
    RoleId, TeamDescriptor, TeamMember, TeamUid, UserId, UserPublicKey,
};

use crate::commands::{
    DeviceApproval, RemoteOutcome, RoleAdminGrant, TeamCreation, TeamMembershipGrant,
};
use crate::error::Result;

/// The enterprise directory, as seen by an authenticated administrator.
///
/// # Submissions
///
/// Every `submit_*` call returns one [`RemoteOutcome`] per command, in the
/// order the commands were sent. A response with fewer entries than
/// commands is a protocol anomaly for the caller to handle; the trait does
/// not pad it.
#[async_trait]
pub trait Directory: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Devices
    // ─────────────────────────────────────────────────────────────────────────

    /// Devices currently waiting for an administrator's approval.
    async fn fetch_pending_device_approvals(&self) -> Result<Vec<DeviceApprovalRequest>>;

    /// Data keys of the given users, wrapped for the tenant.
    ///
    /// Users without a stored data key are absent from the result.
    async fn fetch_wrapped_data_keys(&self, users: &[UserId]) -> Result<Vec<EncryptedKeyRecord>>;

    /// Approve one page of devices.
    async fn submit_device_approvals(
        &self,
        approvals: Vec<DeviceApproval>,
    ) -> Result<Vec<RemoteOutcome>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// All users of the tenant.
    async fn fetch_users(&self) -> Result<Vec<DirectoryUser>>;

    /// Public keys for the given usernames. Unknown usernames are absent.
    async fn fetch_user_public_keys(&self, usernames: &[String]) -> Result<Vec<UserPublicKey>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Teams
    // ─────────────────────────────────────────────────────────────────────────

    /// Teams queued for creation.
    async fn fetch_queued_teams(&self) -> Result<Vec<TeamDescriptor>>;

    /// Users queued to join teams.
    async fn fetch_queued_team_memberships(&self) -> Result<Vec<QueuedMembership>>;

    /// Current team memberships.
    async fn fetch_team_members(&self) -> Result<Vec<TeamMember>>;

    /// Protecting-key records of the given teams. A team may have several.
    async fn fetch_team_keys(&self, teams: &[TeamUid]) -> Result<Vec<EncryptedKeyRecord>>;

    /// Create one page of teams.
    async fn submit_team_creations(
        &self,
        creations: Vec<TeamCreation>,
    ) -> Result<Vec<RemoteOutcome>>;

    /// Add one page of users to teams.
    async fn submit_team_memberships(
        &self,
        grants: Vec<TeamMembershipGrant>,
    ) -> Result<Vec<RemoteOutcome>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    /// Role administrators who still lack the role keys.
    async fn fetch_pending_role_admins(&self) -> Result<Vec<PendingRoleAdmin>>;

    /// Protecting-key records of the given roles.
    async fn fetch_role_keys(&self, roles: &[RoleId]) -> Result<Vec<EncryptedKeyRecord>>;

    /// Hand role keys to one page of administrators.
    async fn submit_role_admin_grants(
        &self,
        grants: Vec<RoleAdminGrant>,
    ) -> Result<Vec<RemoteOutcome>>;
}

#[async_trait]
impl<D: Directory + ?Sized> Directory for std::sync::Arc<D> {
    async fn fetch_pending_device_approvals(&self) -> Result<Vec<DeviceApprovalRequest>> {
        (**self).fetch_pending_device_approvals().await
    }

    async fn fetch_wrapped_data_keys(&self, users: &[UserId]) -> Result<Vec<EncryptedKeyRecord>> {
        (**self).fetch_wrapped_data_keys(users).await
    }

    async fn submit_device_approvals(
        &self,
        approvals: Vec<DeviceApproval>,
    ) -> Result<Vec<RemoteOutcome>> {
        (**self).submit_device_approvals(approvals).await
    }

    async fn fetch_users(&self) -> Result<Vec<DirectoryUser>> {
        (**self).fetch_users().await
    }

    async fn fetch_user_public_keys(&self, usernames: &[String]) -> Result<Vec<UserPublicKey>> {
        (**self).fetch_user_public_keys(usernames).await
    }

    async fn fetch_queued_teams(&self) -> Result<Vec<TeamDescriptor>> {
        (**self).fetch_queued_teams().await
    }

    async fn fetch_queued_team_memberships(&self) -> Result<Vec<QueuedMembership>> {
        (**self).fetch_queued_team_memberships().await
    }

    async fn fetch_team_members(&self) -> Result<Vec<TeamMember>> {
        (**self).fetch_team_members().await
    }

    async fn fetch_team_keys(&self, teams: &[TeamUid]) -> Result<Vec<EncryptedKeyRecord>> {
        (**self).fetch_team_keys(teams).await
    }

    async fn submit_team_creations(
        &self,
        creations: Vec<TeamCreation>,
    ) -> Result<Vec<RemoteOutcome>> {
        (**self).submit_team_creations(creations).await
    }

    async fn submit_team_memberships(
        &self,
        grants: Vec<TeamMembershipGrant>,
    ) -> Result<Vec<RemoteOutcome>> {
        (**self).submit_team_memberships(grants).await
    }

    async fn fetch_pending_role_admins(&self) -> Result<Vec<PendingRoleAdmin>> {
        (**self).fetch_pending_role_admins().await
    }

    async fn fetch_role_keys(&self, roles: &[RoleId]) -> Result<Vec<EncryptedKeyRecord>> {
        (**self).fetch_role_keys(roles).await
    }

    async fn submit_role_admin_grants(
        &self,
        grants: Vec<RoleAdminGrant>,
    ) -> Result<Vec<RemoteOutcome>> {
        (**self).submit_role_admin_grants(grants).await
    }
}
