//! Reconciliation configuration.

/// Page size limits, one per remote submission kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub device_approvals: usize,
    pub team_creations: usize,
    pub team_memberships: usize,
    pub role_admin_grants: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            device_approvals: 100,
            team_creations: 50,
            team_memberships: 100,
            role_admin_grants: 50,
        }
    }
}

impl PageLimits {
    /// The same limit for every submission kind.
    pub fn uniform(size: usize) -> Self {
        Self {
            device_approvals: size,
            team_creations: size,
            team_memberships: size,
            role_admin_grants: size,
        }
    }
}

/// Configuration shared by the reconcilers of one pass.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Page size limits for submissions.
    pub page_limits: PageLimits,

    /// Maximum distinct teams or roles per protecting-key fetch.
    pub key_fetch_limit: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            page_limits: PageLimits::default(),
            key_fetch_limit: 100,
        }
    }
}

impl ReconcileConfig {
    /// Set the page limits.
    pub fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }

    /// Set the protecting-key fetch limit.
    pub fn with_key_fetch_limit(mut self, limit: usize) -> Self {
        self.key_fetch_limit = limit.max(1);
        self
    }
}
