//! The run coordinator.
//!
//! Timers, notifications, and manual requests all funnel into
//! [`Coordinator::run_pass`]. One guard keeps passes from overlapping: a
//! trigger that cannot take it within the configured timeout fails without
//! touching the directory.
//!
//! ```text
//! Idle ──► AcquiringGuard ──► Running ──► ReleasingGuard ──► Idle
//!                │
//!                └── timeout ──► GuardTimeout error for that trigger
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use rewrap_core::Scope;
use rewrap_directory::Directory;
use rewrap_keys::{KeyResolver, SessionKeyContext, SymmetricKey, TenantKeyMaterial, X25519StaticSecret};
use rewrap_reconcile::{
    DeviceReconciler, PassReport, ReconcileError, RoleReconciler, TeamReconciler,
};

use crate::config::CoordinatorConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::{CoordinatorError, Result};
use crate::triggers::{NotificationEvent, Trigger};

/// Observable state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No pass is running or waiting.
    Idle,
    /// A trigger is waiting for the guard and no pass holds it.
    AcquiringGuard,
    /// A pass holds the guard and is working.
    Running,
    /// A pass is draining diagnostics before giving up the guard.
    ReleasingGuard,
}

#[derive(Debug, Default)]
struct StateCell {
    holder: Option<RunState>,
    waiting: usize,
}

impl StateCell {
    fn observe(&self) -> RunState {
        match self.holder {
            Some(phase) => phase,
            None if self.waiting > 0 => RunState::AcquiringGuard,
            None => RunState::Idle,
        }
    }
}

fn lock(cell: &Mutex<StateCell>) -> MutexGuard<'_, StateCell> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts a trigger as waiting for the guard until dropped.
struct Waiting<'a>(&'a Mutex<StateCell>);

impl<'a> Waiting<'a> {
    fn enter(cell: &'a Mutex<StateCell>) -> Self {
        lock(cell).waiting += 1;
        Self(cell)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        lock(self.0).waiting -= 1;
    }
}

/// Marks the guard as held until dropped. Must be dropped before the guard.
struct Holding<'a>(&'a Mutex<StateCell>);

impl<'a> Holding<'a> {
    fn enter(cell: &'a Mutex<StateCell>) -> Self {
        lock(cell).holder = Some(RunState::Running);
        Self(cell)
    }

    fn set(&self, phase: RunState) {
        lock(self.0).holder = Some(phase);
    }
}

impl Drop for Holding<'_> {
    fn drop(&mut self) {
        lock(self.0).holder = None;
    }
}

/// Runs reconciliation passes against one tenant's directory.
pub struct Coordinator<D: ?Sized> {
    directory: Arc<D>,
    session: SessionKeyContext,
    config: CoordinatorConfig,
    guard: tokio::sync::Mutex<()>,
    state: Mutex<StateCell>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl<D: Directory + ?Sized> Coordinator<D> {
    /// Create a coordinator for an unlocked session. Reports go to a
    /// [`TracingSink`] until [`with_sink`](Self::with_sink) replaces it.
    pub fn new(directory: Arc<D>, session: SessionKeyContext, config: CoordinatorConfig) -> Self {
        Self {
            directory,
            session,
            config,
            guard: tokio::sync::Mutex::new(()),
            state: Mutex::new(StateCell::default()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Unlock the tenant key material and create a coordinator for it.
    ///
    /// Material that does not unlock is a configuration error: no pass could
    /// do anything useful with it.
    pub fn unlock(
        directory: Arc<D>,
        material: &TenantKeyMaterial,
        data_key: SymmetricKey,
        user_private_key: Option<&X25519StaticSecret>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let session = SessionKeyContext::unlock(material, data_key, user_private_key).map_err(|e| {
            tracing::error!(error = %e, "tenant key material did not unlock");
            CoordinatorError::Configuration(format!("tenant key material did not unlock: {e}"))
        })?;
        Ok(Self::new(directory, session, config))
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub fn state(&self) -> RunState {
        lock(&self.state).observe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Passes
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one reconciliation pass.
    ///
    /// Devices are reconciled first when `scope` includes them, then teams
    /// and roles. A transport failure or protocol anomaly ends the pass early
    /// and is recorded in the returned report's `fatal_error`. Only a guard
    /// timeout or a configuration error is returned as `Err`. Either way the
    /// report of a pass that ran is drained into the sink exactly once.
    pub async fn run_pass(&self, scope: Scope, trigger: Trigger) -> Result<PassReport> {
        let waiting = Waiting::enter(&self.state);
        let timeout = self.config.guard_timeout;
        let guard = match tokio::time::timeout(timeout, self.guard.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(%scope, %trigger, ?timeout, "another pass holds the guard");
                return Err(CoordinatorError::GuardTimeout(timeout));
            }
        };
        let holding = Holding::enter(&self.state);
        drop(waiting);

        tracing::info!(%scope, %trigger, "pass started");

        let mut report = PassReport::new();
        let result = {
            let mut resolver = KeyResolver::new(&self.session);
            let result = self.execute(scope, &mut resolver, &mut report).await;
            tracing::debug!(decryptions = resolver.decryptions(), "pass resolved keys");
            result
        };

        holding.set(RunState::ReleasingGuard);
        let result = match result {
            Ok(()) => Ok(()),
            Err(err) => {
                report.set_fatal(&err);
                match err {
                    ReconcileError::Configuration(message) => {
                        tracing::error!(%scope, %message, "pass cannot run");
                        Err(CoordinatorError::Configuration(message))
                    }
                    other => {
                        tracing::warn!(%scope, error = %other, "pass ended early");
                        Ok(())
                    }
                }
            }
        };
        self.sink.drain(trigger, scope, &report);

        drop(holding);
        drop(guard);
        result.map(|()| report)
    }

    async fn execute(
        &self,
        scope: Scope,
        resolver: &mut KeyResolver<'_>,
        report: &mut PassReport,
    ) -> rewrap_reconcile::Result<()> {
        let directory = self.directory.as_ref();
        let config = &self.config.reconcile;

        if scope.includes_devices() {
            DeviceReconciler::new(directory, config)
                .reconcile(resolver, report)
                .await?;
        }
        if scope.includes_teams() {
            TeamReconciler::new(directory, config)
                .reconcile(resolver, report)
                .await?;
            RoleReconciler::new(directory, config)
                .reconcile(resolver, report)
                .await?;
        }
        Ok(())
    }

    /// Handle one push notification. Only device approval requests start a
    /// pass; anything else returns `Ok(None)`.
    pub async fn on_notification(&self, event: &NotificationEvent) -> Result<Option<PassReport>> {
        if !event.is_device_approval_request() {
            tracing::debug!(event = %event.event, "ignoring notification");
            return Ok(None);
        }
        self.run_pass(Scope::Devices, Trigger::Notification)
            .await
            .map(Some)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Background triggers
// ─────────────────────────────────────────────────────────────────────────────

impl<D: Directory + ?Sized + 'static> Coordinator<D> {
    /// Run a pass of `scope` every `period` until `shutdown` turns true or
    /// its sender goes away. The first pass runs immediately.
    ///
    /// Shutdown is only observed between passes; a running pass finishes.
    pub fn spawn_timer(
        self: &Arc<Self>,
        scope: Scope,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let period = period.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_requested(&mut shutdown) => break,
                }
                if let Err(e) = coordinator.run_pass(scope, Trigger::Timer).await {
                    tracing::warn!(%scope, error = %e, "timer pass did not run");
                }
            }
            tracing::debug!(%scope, "timer stopped");
        })
    }

    /// Spawn the device timer and the team timer with the configured
    /// intervals.
    pub fn spawn_timers(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> [JoinHandle<()>; 2] {
        [
            self.spawn_timer(Scope::Devices, self.config.timer_interval, shutdown.clone()),
            self.spawn_timer(Scope::Teams, self.config.team_timer_interval, shutdown),
        ]
    }

    /// Run device passes for device approval notifications.
    ///
    /// After a relevant notification the listener waits for the coalescing
    /// window and folds every notification queued by then into one pass.
    /// Shutdown during the window stops the listener without a pass.
    /// Notifications that arrive while a pass runs become one follow-up pass.
    pub fn spawn_notification_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<NotificationEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let window = self.config.coalesce_window;

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                    _ = shutdown_requested(&mut shutdown) => break,
                };
                if !event.is_device_approval_request() {
                    tracing::debug!(event = %event.event, "ignoring notification");
                    continue;
                }

                if !window.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(window) => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                }
                let mut coalesced = 0usize;
                while let Ok(event) = events.try_recv() {
                    if event.is_device_approval_request() {
                        coalesced += 1;
                    }
                }
                tracing::debug!(coalesced, "device approval requested");

                if let Err(e) = coordinator
                    .run_pass(Scope::Devices, Trigger::Notification)
                    .await
                {
                    tracing::warn!(error = %e, "notification pass did not run");
                }
            }
            tracing::debug!("notification listener stopped");
        })
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
