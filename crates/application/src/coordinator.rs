use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::{DomainError, Result, StateSnapshot, Topology};

use crate::system::DobissSystem;

/// Outcome of the most recent refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStatus {
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Schedules imports and polls against one [`DobissSystem`].
///
/// Retry policy lives here: a failed cycle is recorded and the next tick
/// simply tries again.
pub struct Coordinator {
    system: Arc<DobissSystem>,
    poll_timeout: Duration,
    interval: watch::Sender<Duration>,
    status: watch::Sender<UpdateStatus>,
    imported: AtomicBool,
    refresh_requested: Notify,
    import_requested: Notify,
}

impl Coordinator {
    pub fn new(
        system: Arc<DobissSystem>,
        update_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        let (interval, _) = watch::channel(update_interval);
        let (status, _) = watch::channel(UpdateStatus::default());
        Self {
            system,
            poll_timeout,
            interval,
            status,
            imported: AtomicBool::new(false),
            refresh_requested: Notify::new(),
            import_requested: Notify::new(),
        }
    }

    pub fn system(&self) -> &Arc<DobissSystem> {
        &self.system
    }

    pub fn update_interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// Change the polling cadence; applies from the next tick
    pub fn set_update_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "update interval must be positive".to_string(),
            ));
        }
        self.interval.send_if_modified(|current| {
            if *current == interval {
                return false;
            }
            *current = interval;
            true
        });
        Ok(())
    }

    pub fn status(&self) -> UpdateStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.status.subscribe()
    }

    /// Re-discover the installation
    pub async fn import_installation(&self) -> Result<Arc<Topology>> {
        let topology = self.system.import_full_installation().await?;
        self.imported.store(true, Ordering::Release);
        Ok(topology)
    }

    /// Run one update cycle: import on first use, then poll under the timeout.
    pub async fn refresh(&self) -> Result<Arc<StateSnapshot>> {
        let result = self.refresh_once().await;
        self.status.send_modify(|status| match &result {
            Ok(snapshot) => {
                status.last_update_success = true;
                status.last_error = None;
                status.last_success_at = snapshot.taken_at();
            }
            Err(e) => {
                status.last_update_success = false;
                status.last_error = Some(e.to_string());
            }
        });
        result
    }

    async fn refresh_once(&self) -> Result<Arc<StateSnapshot>> {
        if !self.imported.load(Ordering::Acquire) {
            self.import_installation().await?;
        }
        tokio::time::timeout(self.poll_timeout, self.system.request_all_status())
            .await
            .unwrap_or(Err(DomainError::Timeout(self.poll_timeout)))
    }

    /// Ask the running loop for a refresh without waiting for it
    pub fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }

    /// Ask the running loop for a re-import followed by a refresh
    pub fn request_import(&self) {
        self.import_requested.notify_one();
    }

    async fn cycle(&self) {
        match self.refresh().await {
            Ok(snapshot) => debug!(modules = snapshot.levels().len(), "Update succeeded"),
            Err(e) => warn!(endpoint = %self.system.endpoint(), error = %e, "Update failed"),
        }
    }

    /// Drive updates until `cancel` fires. Failed cycles never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval_rx = self.interval.subscribe();
        let mut period = *interval_rx.borrow_and_update();
        let mut timer = ticker(period);

        info!(endpoint = %self.system.endpoint(), interval = ?period, "Coordinator started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = timer.tick() => {
                    self.cycle().await;
                }
                _ = self.refresh_requested.notified() => {
                    self.cycle().await;
                    timer.reset();
                }
                _ = self.import_requested.notified() => {
                    match self.import_installation().await {
                        Ok(_) => self.cycle().await,
                        Err(e) => warn!(error = %e, "Re-import failed, keeping previous installation"),
                    }
                    timer.reset();
                }
                Ok(()) = interval_rx.changed() => {
                    period = *interval_rx.borrow_and_update();
                    timer = ticker(period);
                    info!(interval = ?period, "Update interval changed");
                }
            }
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}
