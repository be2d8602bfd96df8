//! Long-lived background task that sweeps overdue payments, promotes
//! expiring leases, and auto-renews eligible ones on an interval. One
//! task, `tokio::time::interval` ticks, per-sub-task error isolation so
//! one failure never aborts the pass or the loop.
//!
//! Termination has two independent signals: an explicit stop request
//! (`WorkerHandle::stop`, backed by a `watch` channel) and cancellation of
//! the context the worker was started with (a `CancellationToken`). Either
//! one alone is enough to end the loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::repository::{LeaseRepository, PaymentRepository, TenantRepository, UnitRepository};
use crate::services::{LeaseService, PaymentService};

#[derive(Debug, Clone, Copy, Default)]
pub struct PassSummary {
    pub swept_overdue: u64,
    pub promoted_expiring_soon: u64,
    pub auto_renewed: u64,
}

pub struct MaintenanceWorker<R> {
    lease_service: LeaseService<R>,
    payment_service: PaymentService<R>,
    interval: Duration,
    stop_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl<R> MaintenanceWorker<R>
where
    R: LeaseRepository + UnitRepository + TenantRepository + PaymentRepository + Clone + Send + Sync + 'static,
{
    /// `interval_hours` is validated by `AppConfig` to be >= 1 before it
    /// ever reaches here. `cancel` is the context the worker was started
    /// with; it is distinct from `stop_rx` and is checked independently.
    pub fn new(repo: R, interval_hours: u64, stop_rx: watch::Receiver<bool>, cancel: CancellationToken) -> Self {
        Self {
            lease_service: LeaseService::new(repo.clone()),
            payment_service: PaymentService::new(repo),
            interval: Duration::from_secs(interval_hours.max(1) * 3600),
            stop_rx,
            cancel,
        }
    }

    /// Runs one pass immediately, then on every tick of `interval`, until
    /// stopped or its context is cancelled.
    pub async fn run(mut self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "maintenance worker started");
        self.run_pass().await;

        let mut ticker = interval(self.interval);
        ticker.tick().await; // consume the immediate first tick; the pass above already ran it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        tracing::info!("maintenance worker stop signal received, exiting after current pass");
                        break;
                    }
                }
                _ = self.cancel.cancelled() => {
                    tracing::info!("maintenance worker context cancelled, exiting");
                    break;
                }
            }
        }
    }

    /// One pass: `SweepOverdue`, `PromoteExpiringSoon`, `AutoRenew`, in
    /// order. Each sub-task's failure is logged and swallowed; it does not
    /// roll back earlier sub-tasks.
    async fn run_pass(&self) -> PassSummary {
        let today = chrono::Utc::now().date_naive();
        let mut summary = PassSummary::default();

        match self.payment_service.sweep_overdue(today, self.cancel.clone()).await {
            Ok(count) => summary.swept_overdue = count,
            Err(err) => tracing::error!(error = %err, "sweep_overdue failed"),
        }

        match self.lease_service.promote_expiring_soon(today, self.cancel.clone()).await {
            Ok(count) => summary.promoted_expiring_soon = count,
            Err(err) => tracing::error!(error = %err, "promote_expiring_soon failed"),
        }

        match self.lease_service.auto_renew(self.cancel.clone()).await {
            Ok(count) => summary.auto_renewed = count,
            Err(err) => tracing::error!(error = %err, "auto_renew failed"),
        }

        tracing::info!(
            swept_overdue = summary.swept_overdue,
            promoted_expiring_soon = summary.promoted_expiring_soon,
            auto_renewed = summary.auto_renewed,
            "maintenance pass complete"
        );
        summary
    }
}

/// Handle used by the caller to request an explicit stop. Dropping it
/// without calling `stop()` also causes the worker to exit on its next
/// tick, since the `watch` channel closes.
pub struct WorkerHandle {
    stop_tx: watch::Sender<bool>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

pub fn channel() -> (WorkerHandle, watch::Receiver<bool>) {
    let (stop_tx, stop_rx) = watch::channel(false);
    (WorkerHandle { stop_tx }, stop_rx)
}
