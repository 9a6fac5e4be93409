// State tracker - Use case for applying readings to the live view
use crate::application::cook_repository::CookRepository;
use crate::application::session_ledger::SessionLedger;
use crate::application::telemetry_cache::TelemetryCache;
use crate::domain::error::TelemetryError;
use crate::domain::reading::Reading;
use crate::domain::session::SessionMeta;
use std::sync::Arc;

#[derive(Clone)]
pub struct StateTracker {
    cache: Arc<TelemetryCache>,
    ledger: SessionLedger,
    repository: Arc<dyn CookRepository>,
}

impl StateTracker {
    pub fn new(
        cache: Arc<TelemetryCache>,
        ledger: SessionLedger,
        repository: Arc<dyn CookRepository>,
    ) -> Self {
        Self {
            cache,
            ledger,
            repository,
        }
    }

    /// Apply one accepted reading: mirror it into the snapshot, append it to
    /// the rolling history, and open a session when its connection marker
    /// starts a new epoch. Persistence failures are logged and isolated; the
    /// in-memory update always stands.
    pub async fn apply(&self, reading: Reading) {
        let new_epoch = {
            let mut inner = self.cache.lock();
            let new_epoch = inner.latest.mirror(&reading);
            inner.append_history(reading.clone(), self.cache.capacity());
            new_epoch
        };

        if new_epoch {
            let meta = SessionMeta::from_reading(&reading);
            match self.ledger.open(reading.timestamp, &meta).await {
                Ok(id) => {
                    tracing::info!("Grill connected, opened session {}", id);
                }
                Err(TelemetryError::SessionConflict { id }) => {
                    tracing::error!(
                        "New connection while session {} is still open, not opening another",
                        id
                    );
                }
                Err(e) => {
                    tracing::warn!("Could not open session for new connection: {}", e);
                }
            }
        }

        if let Err(e) = self.repository.append_cook_log(&reading).await {
            tracing::warn!("Could not append cook log entry: {}", e);
        }

        self.cache.publish(reading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cook_repository::testing::MemoryRepository;
    use crate::domain::reading::RawSample;
    use chrono::{DateTime, TimeZone, Utc};

    struct Fixture {
        repository: Arc<MemoryRepository>,
        cache: Arc<TelemetryCache>,
        tracker: StateTracker,
    }

    fn fixture_with_capacity(capacity: usize) -> Fixture {
        let repository = Arc::new(MemoryRepository::default());
        let cache = Arc::new(TelemetryCache::new(capacity));
        let ledger = SessionLedger::new(repository.clone());
        let tracker = StateTracker::new(cache.clone(), ledger, repository.clone());
        Fixture {
            repository,
            cache,
            tracker,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_capacity(10_000)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reading(secs: i64, grill: f64, marker: Option<&str>) -> Reading {
        RawSample {
            grill_temp: Some(grill),
            probe_temp: Some(100.04),
            grill_setpoint: Some(250.0),
            connected: Some(true),
            last_connected: marker.map(str::to_string),
            ..RawSample::default()
        }
        .normalize(at(secs))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_updates_snapshot_and_history() {
        let f = fixture();
        f.tracker.apply(reading(0, 203.46, None)).await;

        let snapshot = f.cache.snapshot();
        assert_eq!(snapshot.timestamp, Some(at(0)));
        assert_eq!(snapshot.grill_temp, 203.5);

        // History keeps the raw value, only the snapshot is rounded.
        let history = f.cache.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].grill_temp, 203.46);
        assert_eq!(f.repository.cook_log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_marker_opens_one_session() {
        let f = fixture();
        f.tracker.apply(reading(0, 200.0, Some("m1"))).await;
        f.tracker.apply(reading(2, 201.0, Some("m1"))).await;
        f.tracker.apply(reading(4, 202.0, Some("m1"))).await;

        let sessions = f.repository.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start, at(0));
        assert!(sessions[0].is_open());
    }

    #[tokio::test]
    async fn test_new_marker_opens_second_session_after_close() {
        let f = fixture();
        f.tracker.apply(reading(0, 200.0, Some("m1"))).await;
        f.tracker
            .ledger
            .close(at(30))
            .await
            .unwrap();
        f.tracker.apply(reading(60, 205.0, Some("m2"))).await;

        let sessions = f.repository.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].start, at(60));
        assert!(sessions[1].is_open());
    }

    #[tokio::test]
    async fn test_conflicting_open_leaves_existing_session() {
        let f = fixture();
        f.tracker.apply(reading(0, 200.0, Some("m1"))).await;
        // The first session is never closed; a new marker must not stack a
        // second open one on top of it.
        f.tracker.apply(reading(10, 201.0, Some("m2"))).await;

        let sessions = f.repository.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].is_open());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_cache_update() {
        let f = fixture();
        f.repository.fail_everything();
        f.tracker.apply(reading(0, 210.0, Some("m1"))).await;

        let snapshot = f.cache.snapshot();
        assert_eq!(snapshot.grill_temp, 210.0);
        assert_eq!(f.cache.history().len(), 1);
        assert!(f.repository.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded_through_apply() {
        let f = fixture();
        for n in 0..10_050 {
            f.tracker.apply(reading(n, n as f64, Some("m1"))).await;
        }

        let history = f.cache.history();
        assert_eq!(history.len(), 10_000);
        assert_eq!(history.first().unwrap().grill_temp, 50.0);
        assert_eq!(history.last().unwrap().grill_temp, 10_049.0);
        assert_eq!(f.repository.sessions.lock().unwrap().len(), 1);
    }
}
