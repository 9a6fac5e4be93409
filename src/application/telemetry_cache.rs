// Shared in-memory telemetry state - latest snapshot plus rolling history
use crate::domain::reading::Reading;
use crate::domain::state::LatestState;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct TelemetryCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    events: broadcast::Sender<Reading>,
}

pub struct CacheInner {
    pub latest: LatestState,
    pub history: VecDeque<Reading>,
}

impl CacheInner {
    /// Append to the history and evict past `capacity`, in one step, so no
    /// reader can observe the buffer over its bound.
    pub fn append_history(&mut self, reading: Reading, capacity: usize) {
        self.history.push_back(reading);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

impl TelemetryCache {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(CacheInner {
                latest: LatestState::default(),
                history: VecDeque::new(),
            }),
            capacity,
            events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The one lock covering latest and history together. Multi-field
    /// updates happen entirely under it, so snapshots are never torn.
    pub(crate) fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LatestState {
        self.lock().latest.clone()
    }

    pub fn history(&self) -> Vec<Reading> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.events.subscribe()
    }

    /// Best-effort fan-out; a send with no subscribers is not an error.
    pub fn publish(&self, reading: Reading) {
        let _ = self.events.send(reading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading_numbered(n: i64) -> Reading {
        Reading {
            timestamp: Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap(),
            grill_temp: n as f64,
            probe_temp: 0.0,
            grill_setpoint: None,
            probe_setpoint: None,
            ambient_temp: None,
            connected: true,
            last_connected: None,
            cook_timer_start: None,
            cook_timer_end: None,
            cook_timer_remaining: None,
        }
    }

    #[test]
    fn test_cold_cache_is_empty() {
        let cache = TelemetryCache::new(10_000);
        let snapshot = cache.snapshot();
        assert!(snapshot.timestamp.is_none());
        assert!(!snapshot.ever_connected);
        assert!(cache.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded_and_ordered() {
        let cache = TelemetryCache::new(10_000);
        for n in 0..10_050 {
            let mut inner = cache.lock();
            inner.append_history(reading_numbered(n), cache.capacity());
        }

        let history = cache.history();
        assert_eq!(history.len(), 10_000);
        assert_eq!(history.first().unwrap().grill_temp, 50.0);
        assert_eq!(history.last().unwrap().grill_temp, 10_049.0);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let cache = TelemetryCache::new(16);
        let mut rx = cache.subscribe();
        cache.publish(reading_numbered(7));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.grill_temp, 7.0);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let cache = TelemetryCache::new(16);
        cache.publish(reading_numbered(1));
    }
}
