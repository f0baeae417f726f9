//! Device approval reconciliation.
//!
//! A device waiting for approval receives its user's data key, sealed to
//! the device's own public key. The data keys are wrapped for the tenant,
//! so the tenant private key must be unlocked for this pass to run at all.

use std::collections::{HashMap, HashSet};

use rewrap_core::{KeyOwner, PendingGrant, UserId};
use rewrap_directory::{DeviceApproval, Directory};
use rewrap_keys::{wrap_for_device, KeyResolver, SymmetricKey};

use crate::batch::BatchSubmitter;
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::report::{PassReport, SkipReason};

/// Approves devices by re-wrapping their users' data keys.
pub struct DeviceReconciler<'a, D: ?Sized> {
    directory: &'a D,
    submitter: BatchSubmitter,
}

impl<'a, D: Directory + ?Sized> DeviceReconciler<'a, D> {
    pub fn new(directory: &'a D, config: &ReconcileConfig) -> Self {
        Self {
            directory,
            submitter: BatchSubmitter::new(config.page_limits.device_approvals),
        }
    }

    /// Run the device stage of a pass.
    ///
    /// Per-device problems are recorded in `report` as skips. An error means
    /// the pass must stop. That happens when a fetch fails, when submission
    /// halts, or when devices are waiting and the tenant has no private key.
    pub async fn reconcile(
        &self,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> Result<()> {
        let requests = self.directory.fetch_pending_device_approvals().await?;
        if requests.is_empty() {
            tracing::debug!("no devices awaiting approval");
            return Ok(());
        }

        if resolver.session().private_key().is_none() {
            return Err(ReconcileError::Configuration(
                "tenant has no private key to open user data keys".into(),
            ));
        }

        let mut seen = HashSet::new();
        let users: Vec<UserId> = requests
            .iter()
            .map(|r| r.user_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let records = self.directory.fetch_wrapped_data_keys(&users).await?;

        let mut data_keys: HashMap<UserId, std::result::Result<SymmetricKey, SkipReason>> =
            HashMap::with_capacity(users.len());
        for user_id in users {
            let resolved = resolver
                .resolve_first(KeyOwner::User(user_id), &records)
                .map_err(|e| {
                    let reason = SkipReason::from_resolution(&e);
                    tracing::warn!(%user_id, %reason, "user data key unavailable");
                    reason
                });
            data_keys.insert(user_id, resolved);
        }

        let mut grants = Vec::new();
        let mut approvals = Vec::new();
        for request in requests {
            let grant = PendingGrant::Device {
                user_id: request.user_id,
                device: request.device_token.clone(),
            };

            let data_key = match data_keys.get(&request.user_id) {
                Some(Ok(key)) => key,
                Some(Err(reason)) => {
                    report.skip(grant, reason.clone());
                    continue;
                }
                None => {
                    report.skip(grant, SkipReason::MissingKey(KeyOwner::User(request.user_id)));
                    continue;
                }
            };

            if request.device_public_key.is_empty() {
                report.skip(grant, SkipReason::MissingPublicKey);
                continue;
            }

            match wrap_for_device(data_key, &request.device_public_key) {
                Ok(encrypted_data_key) => {
                    approvals.push(DeviceApproval {
                        user_id: request.user_id,
                        device_token: request.device_token,
                        encrypted_data_key,
                    });
                    grants.push(grant);
                }
                Err(e) => report.skip(grant, SkipReason::from_wrap(&e)),
            }
        }

        if approvals.is_empty() {
            tracing::debug!("no device approvals to submit");
            return Ok(());
        }

        tracing::info!(count = approvals.len(), "submitting device approvals");
        let batch = self
            .submitter
            .submit(approvals, |page| self.directory.submit_device_approvals(page))
            .await;
        report.record_submissions(grants, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageLimits;
    use crate::report::Submission;
    use rewrap_core::{DeviceApprovalRequest, DeviceToken};
    use rewrap_directory::{DirectoryCall, MemoryDirectory};
    use rewrap_testkit::TenantFixture;

    #[tokio::test]
    async fn test_corrupt_user_is_skipped_others_approved() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        let bob = tenant.add_user(2);
        let laptop = tenant.add_device(alice.id);
        let phone = tenant.add_device(alice.id);
        tenant.add_device(bob.id);
        tenant.corrupt_data_key(bob.id);

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        DeviceReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        assert_eq!(report.grant_outcomes.len(), 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].grant.user_id(), bob.id);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::UndecryptableKey(_)
        ));

        // Each device gets its own ciphertext, openable only by that device.
        let approvals = tenant.directory.approvals();
        assert_ne!(approvals[0].encrypted_data_key, approvals[1].encrypted_data_key);
        for (device, approval) in [&laptop, &phone].into_iter().zip(&approvals) {
            assert_eq!(approval.device_token, device.token);
            let opened = device.open(&approval.encrypted_data_key);
            assert_eq!(opened.as_bytes(), alice.data_key.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_data_keys_fetched_once_per_distinct_user() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        for _ in 0..3 {
            tenant.add_device(alice.id);
        }

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        DeviceReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        assert_eq!(
            tenant.directory.calls_of(DirectoryCall::FetchWrappedDataKeys),
            vec![1]
        );
        assert_eq!(resolver.decryptions(), 1);
        assert_eq!(report.succeeded(), 3);
    }

    #[tokio::test]
    async fn test_no_private_key_is_configuration_error() {
        let tenant = TenantFixture::without_private_key();
        let alice = tenant.add_user(1);
        tenant.add_device(alice.id);

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        let result = DeviceReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await;

        assert!(matches!(result, Err(ReconcileError::Configuration(_))));
        assert!(report.is_empty());
        assert_eq!(tenant.directory.calls().len(), 1);
        assert_eq!(
            tenant
                .directory
                .calls_of(DirectoryCall::FetchPendingDeviceApprovals),
            vec![0]
        );
    }

    #[tokio::test]
    async fn test_no_private_key_and_no_devices_is_quiet() {
        let tenant = TenantFixture::without_private_key();
        tenant.add_user(1);

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        DeviceReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_missing_data_key_and_bad_device_key() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        tenant.directory.add_device_request(DeviceApprovalRequest {
            user_id: alice.id,
            device_token: DeviceToken(vec![1; 8]),
            device_public_key: vec![0; 12],
        });
        tenant.directory.add_device_request(DeviceApprovalRequest {
            user_id: UserId(77),
            device_token: DeviceToken(vec![2; 8]),
            device_public_key: vec![0; 32],
        });

        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        DeviceReconciler::new(tenant.directory.as_ref(), &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert!(matches!(reasons[0], SkipReason::InvalidPublicKey(_)));
        assert_eq!(reasons[1], SkipReason::MissingKey(KeyOwner::User(UserId(77))));
        assert!(report.grant_outcomes.is_empty());
        assert!(tenant
            .directory
            .calls_of(DirectoryCall::SubmitDeviceApprovals)
            .is_empty());
    }

    #[tokio::test]
    async fn test_page_failure_keeps_earlier_outcomes() {
        let tenant = TenantFixture::new();
        let alice = tenant.add_user(1);
        for _ in 0..5 {
            tenant.add_device(alice.id);
        }
        tenant
            .directory
            .fail_call(DirectoryCall::SubmitDeviceApprovals, 2);

        let config = ReconcileConfig::default().with_page_limits(PageLimits::uniform(2));
        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();
        let result = DeviceReconciler::new(tenant.directory.as_ref(), &config)
            .reconcile(&mut resolver, &mut report)
            .await;

        assert!(matches!(result, Err(ReconcileError::Directory(_))));
        assert_eq!(report.grant_outcomes.len(), 2);
        assert!(report
            .grant_outcomes
            .iter()
            .all(|o| o.result == Submission::Success));
        assert_eq!(report.abandoned.len(), 3);
        assert_eq!(
            tenant.directory.calls_of(DirectoryCall::SubmitDeviceApprovals),
            vec![2, 2]
        );
    }

    #[tokio::test]
    async fn test_empty_queue_is_noop() {
        let directory = MemoryDirectory::new();
        let tenant = TenantFixture::new();
        let session = tenant.session();
        let mut resolver = KeyResolver::new(&session);
        let mut report = PassReport::new();

        DeviceReconciler::new(&directory, &ReconcileConfig::default())
            .reconcile(&mut resolver, &mut report)
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(directory.calls().len(), 1);
    }
}
