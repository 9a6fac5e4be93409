// Idle monitor - Staleness watchdog that closes abandoned sessions
use crate::application::session_ledger::SessionLedger;
use crate::application::telemetry_cache::TelemetryCache;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct IdleMonitor {
    cache: Arc<TelemetryCache>,
    ledger: SessionLedger,
    wake_threshold: Duration,
    check_interval: std::time::Duration,
}

impl IdleMonitor {
    pub fn new(
        cache: Arc<TelemetryCache>,
        ledger: SessionLedger,
        wake_threshold_secs: u64,
        check_interval_secs: u64,
    ) -> Self {
        Self {
            cache,
            ledger,
            wake_threshold: Duration::seconds(wake_threshold_secs as i64),
            check_interval: std::time::Duration::from_secs(check_interval_secs),
        }
    }

    /// One staleness check at `now`. A reading younger than the wake
    /// threshold keeps the appliance active; anything older flips it idle,
    /// and only that flip closes the open session. Repeat ticks while
    /// already idle do nothing.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let went_idle = {
            let mut inner = self.cache.lock();
            let fresh = inner
                .latest
                .timestamp
                .map(|t| now - t <= self.wake_threshold)
                .unwrap_or(false);

            if fresh {
                if inner.latest.is_idle {
                    tracing::info!("Telemetry resumed, grill active again");
                }
                inner.latest.is_idle = false;
                false
            } else if inner.latest.is_idle {
                false
            } else {
                inner.latest.is_idle = true;
                true
            }
        };

        if went_idle {
            tracing::info!(
                "No telemetry for over {}s, marking grill idle",
                self.wake_threshold.num_seconds()
            );
            match self.ledger.close(now).await {
                Ok(Some(id)) => tracing::info!("Closed session {}", id),
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not close session on idle: {}", e),
            }
        }
    }

    /// Run staleness checks on a fixed schedule until shutdown.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(Utc::now()).await,
                _ = cancel.cancelled() => {
                    tracing::info!("Idle monitor shutting down");
                    break;
                }
            }
        }
    }
}
