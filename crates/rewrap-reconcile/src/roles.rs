//! Role admin-key reconciliation.
//!
//! An administrator added to a role receives the tenant tree key and, when
//! the role has one, the role key. The role key is resolved from the role's
//! protecting-key records, preferring the tree-key form.

use std::collections::{HashMap, HashSet};

use rewrap_core::{
    DirectoryUser, EncryptedKeyRecord, KeyOwner, KeyType, PendingGrant, PendingRoleAdmin,
    RecipientPublicKey, RoleId, UserId,
};
use rewrap_directory::{Directory, RoleAdminGrant};
use rewrap_keys::{wrap_for_recipient, KeyResolver, SymmetricKey};

use crate::batch::BatchSubmitter;
use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::report::{PassReport, SkipReason};

/// What a role can hand to a new administrator.
enum RoleKey {
    /// The role has no protecting-key records: tree key only.
    Absent,
    Resolved(SymmetricKey),
    Unavailable(SkipReason),
}

/// Grants role keys to pending role administrators.
pub struct RoleReconciler<'a, D: ?Sized> {
    directory: &'a D,
    submitter: BatchSubmitter,
    key_fetch_limit: usize,
}

impl<'a, D: Directory + ?Sized> RoleReconciler<'a, D> {
    pub fn new(directory: &'a D, config: &ReconcileConfig) -> Self {
        Self {
            directory,
            submitter: BatchSubmitter::new(config.page_limits.role_admin_grants),
            key_fetch_limit: config.key_fetch_limit.max(1),
        }
    }

    /// Run the role stage of a pass.
    pub async fn reconcile(
        &self,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> Result<()> {
        let pending = self.directory.fetch_pending_role_admins().await?;
        if pending.is_empty() {
            tracing::debug!("no pending role administrators");
            return Ok(());
        }

        let mut seen = HashSet::new();
        let pending: Vec<PendingRoleAdmin> =
            pending.into_iter().filter(|p| seen.insert(*p)).collect();

        let users: HashMap<UserId, DirectoryUser> = self
            .directory
            .fetch_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut candidates: Vec<(RoleId, &DirectoryUser)> = Vec::new();
        for p in &pending {
            match users.get(&p.user_id) {
                Some(user) if user.is_active() => candidates.push((p.role_id, user)),
                _ => report.skip(grant_of(p), SkipReason::InactiveUser),
            }
        }
        if candidates.is_empty() {
            return Ok(());
        }

        let role_keys = self.resolve_role_keys(resolver, &candidates).await?;

        let mut names = HashSet::new();
        let usernames: Vec<String> = candidates
            .iter()
            .map(|(_, u)| u.username.clone())
            .filter(|n| names.insert(n.clone()))
            .collect();
        let public_keys: HashMap<String, RecipientPublicKey> = self
            .directory
            .fetch_user_public_keys(&usernames)
            .await?
            .into_iter()
            .filter_map(|k| k.public_key.map(|pk| (k.username, pk)))
            .collect();

        let tree_key = resolver.session().tree_key();
        let mut grants = Vec::new();
        let mut commands = Vec::new();
        for (role_id, user) in candidates {
            let grant = PendingGrant::RoleAdmin {
                role_id,
                user_id: user.id,
            };

            let role_key = match role_keys.get(&role_id) {
                Some(RoleKey::Resolved(key)) => Some(key),
                Some(RoleKey::Absent) | None => None,
                Some(RoleKey::Unavailable(reason)) => {
                    report.skip(grant, reason.clone());
                    continue;
                }
            };
            let Some(public_key) = public_keys.get(&user.username) else {
                report.skip(grant, SkipReason::MissingPublicKey);
                continue;
            };

            let wrapped = wrap_for_recipient(tree_key, public_key).and_then(|tree| {
                role_key
                    .map(|key| wrap_for_recipient(key, public_key))
                    .transpose()
                    .map(|role| (tree, role))
            });
            match wrapped {
                Ok((encrypted_tree_key, encrypted_role_key)) => {
                    commands.push(RoleAdminGrant {
                        role_id,
                        user_id: user.id,
                        encrypted_tree_key,
                        encrypted_role_key,
                    });
                    grants.push(grant);
                }
                Err(e) => report.skip(grant, SkipReason::from_wrap(&e)),
            }
        }

        if commands.is_empty() {
            return Ok(());
        }

        tracing::info!(count = commands.len(), "submitting role admin grants");
        let batch = self
            .submitter
            .submit(commands, |page| self.directory.submit_role_admin_grants(page))
            .await;
        report.record_submissions(grants, batch)
    }

    async fn resolve_role_keys(
        &self,
        resolver: &mut KeyResolver<'_>,
        candidates: &[(RoleId, &DirectoryUser)],
    ) -> Result<HashMap<RoleId, RoleKey>> {
        let mut roles: Vec<RoleId> = Vec::new();
        for &(role_id, _) in candidates {
            if !roles.contains(&role_id) {
                roles.push(role_id);
            }
        }

        let mut resolved = HashMap::with_capacity(roles.len());
        for chunk in roles.chunks(self.key_fetch_limit) {
            let records = self.directory.fetch_role_keys(chunk).await?;
            for &role_id in chunk {
                let owner = KeyOwner::Role(role_id);
                let mut own: Vec<&EncryptedKeyRecord> =
                    records.iter().filter(|r| r.owner == owner).collect();

                let key = if own.is_empty() && resolver.cached(&owner).is_none() {
                    RoleKey::Absent
                } else {
                    // Stable sort keeps directory order within each group.
                    own.sort_by_key(|r| r.key_type != KeyType::EncryptedByTreeKey.as_u32());
                    match resolver.resolve_first(owner, own) {
                        Ok(key) => RoleKey::Resolved(key),
                        Err(e) => {
                            let reason = SkipReason::from_resolution(&e);
                            tracing::warn!(%role_id, %reason, "role key unavailable");
                            RoleKey::Unavailable(reason)
                        }
                    }
                };
                resolved.insert(role_id, key);
            }
        }
        Ok(resolved)
    }
}

fn grant_of(pending: &PendingRoleAdmin) -> PendingGrant {
    PendingGrant::RoleAdmin {
        role_id: pending.role_id,
        user_id: pending.user_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewrap_core::UserStatus;
    use rewrap_directory::DirectoryCall;
    use rewrap_testkit::TenantFixture;

    async fn run(tenant: &TenantFixture) -> (PassReport, Result<()>) {
        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        let result = RoleReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await;
        (report, result)
    }

    #[tokio::test]
    async fn test_admin_receives_tree_and_role_keys() {
        let tenant = TenantFixture::new();
        let admin = tenant.add_user(1);
        let (role_id, role_key) = tenant.add_role(10, Some(KeyType::EncryptedByTreeKey));
        tenant.queue_role_admin(role_id, admin.id);

        let (report, result) = run(&tenant).await;
        result.unwrap();
        assert_eq!(report.succeeded(), 1);

        let grant = &tenant.directory.role_admin_grants()[0];
        assert_eq!(
            admin.open(&grant.encrypted_tree_key).as_bytes(),
            tenant.keys().tree_key().as_bytes()
        );
        let role_key = role_key.unwrap();
        let opened = admin.open(grant.encrypted_role_key.as_ref().unwrap());
        assert_eq!(opened.as_bytes(), role_key.as_bytes());
    }

    #[tokio::test]
    async fn test_rsa_admin_receives_tree_and_role_keys() {
        let tenant = TenantFixture::new();
        let admin = tenant.add_rsa_user(2);
        let (role_id, role_key) = tenant.add_role(13, Some(KeyType::EncryptedByTreeKey));
        tenant.queue_role_admin(role_id, admin.id);

        let (report, result) = run(&tenant).await;
        result.unwrap();
        assert_eq!(report.succeeded(), 1);
        assert!(report.skipped.is_empty());

        let grant = &tenant.directory.role_admin_grants()[0];
        assert_eq!(grant.user_id, admin.id);
        assert_eq!(
            admin.open(&grant.encrypted_tree_key).as_bytes(),
            tenant.keys().tree_key().as_bytes()
        );
        let opened = admin.open(grant.encrypted_role_key.as_ref().unwrap());
        assert_eq!(opened.as_bytes(), role_key.unwrap().as_bytes());
    }

    #[tokio::test]
    async fn test_role_without_key_grants_tree_key_only() {
        let tenant = TenantFixture::new();
        let admin = tenant.add_user(1);
        let (role_id, _) = tenant.add_role(11, None);
        tenant.queue_role_admin(role_id, admin.id);

        let (report, result) = run(&tenant).await;
        result.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert!(tenant.directory.role_admin_grants()[0]
            .encrypted_role_key
            .is_none());
    }

    #[tokio::test]
    async fn test_tree_key_record_preferred_then_fallback() {
        let tenant = TenantFixture::new();
        let admin = tenant.add_user(1);
        let (role_id, role_key) = tenant.add_role(12, Some(KeyType::EncryptedByDataKey));
        let role_key = role_key.unwrap();

        // A broken tree-key record listed after the legacy one is still tried
        // first, and the legacy record is the fallback.
        tenant.directory.add_role_key(
            role_id,
            EncryptedKeyRecord::new(
                KeyOwner::Role(role_id),
                vec![0xa0, 0x01],
                KeyType::EncryptedByTreeKey,
            ),
        );
        tenant.queue_role_admin(role_id, admin.id);

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        RoleReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        assert_eq!(resolver.decryptions(), 2);
        let grant = &tenant.directory.role_admin_grants()[0];
        let opened = admin.open(grant.encrypted_role_key.as_ref().unwrap());
        assert_eq!(opened.as_bytes(), role_key.as_bytes());
    }

    #[tokio::test]
    async fn test_undecryptable_role_is_skipped() {
        let tenant = TenantFixture::new();
        let admin = tenant.add_user(1);
        let role_id = RoleId(13);
        tenant.directory.add_role_key(
            role_id,
            EncryptedKeyRecord::new(KeyOwner::Role(role_id), vec![1; 40], KeyType::EncryptedByDataKey),
        );
        tenant.queue_role_admin(role_id, admin.id);

        let (report, result) = run(&tenant).await;
        result.unwrap();

        assert!(report.grant_outcomes.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::UndecryptableKey(_)
        ));
        assert!(tenant
            .directory
            .calls_of(DirectoryCall::SubmitRoleAdminGrants)
            .is_empty());
    }

    #[tokio::test]
    async fn test_inactive_and_keyless_admins_skipped() {
        let tenant = TenantFixture::new();
        let invited = tenant.add_user_with(1, UserStatus::Invited, true);
        let keyless = tenant.add_user_with(2, UserStatus::Active, false);
        let (role_id, _) = tenant.add_role(14, Some(KeyType::EncryptedByTreeKey));
        tenant.queue_role_admin(role_id, invited.id);
        tenant.queue_role_admin(role_id, keyless.id);
        tenant.queue_role_admin(role_id, keyless.id);

        let (report, result) = run(&tenant).await;
        result.unwrap();

        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::InactiveUser, SkipReason::MissingPublicKey]
        );
    }
}
