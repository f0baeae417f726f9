//! Coordinator configuration.

use std::time::Duration;

use rewrap_reconcile::{PageLimits, ReconcileConfig};

/// Configuration for the run coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a trigger waits for the guard before giving up.
    pub guard_timeout: Duration,

    /// Interval of the device approval timer.
    pub timer_interval: Duration,

    /// Interval of the team and role timer.
    pub team_timer_interval: Duration,

    /// How long the notification listener waits for a burst to settle.
    pub coalesce_window: Duration,

    /// Page limits and key fetch limits for the reconcilers.
    pub reconcile: ReconcileConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            guard_timeout: Duration::from_secs(10),
            timer_interval: Duration::from_secs(60),
            team_timer_interval: Duration::from_secs(600),
            coalesce_window: Duration::from_secs(1),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_guard_timeout(mut self, timeout: Duration) -> Self {
        self.guard_timeout = timeout;
        self
    }

    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    pub fn with_team_timer_interval(mut self, interval: Duration) -> Self {
        self.team_timer_interval = interval;
        self
    }

    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.reconcile.page_limits = limits;
        self
    }

    pub fn with_key_fetch_limit(mut self, limit: usize) -> Self {
        self.reconcile = self.reconcile.with_key_fetch_limit(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.guard_timeout, Duration::from_secs(10));
        assert_eq!(config.timer_interval, Duration::from_secs(60));
        assert_eq!(config.reconcile.page_limits.team_creations, 50);
        assert_eq!(config.reconcile.key_fetch_limit, 100);
    }

    #[test]
    fn test_builders() {
        let config = CoordinatorConfig::default()
            .with_guard_timeout(Duration::from_millis(5))
            .with_page_limits(PageLimits::uniform(7))
            .with_key_fetch_limit(0);
        assert_eq!(config.guard_timeout, Duration::from_millis(5));
        assert_eq!(config.reconcile.page_limits.device_approvals, 7);
        assert_eq!(config.reconcile.key_fetch_limit, 1);
    }
}
