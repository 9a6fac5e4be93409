// Reading ingestor - Normalizes raw samples off the source channel
use crate::application::state_tracker::StateTracker;
use crate::domain::reading::RawSample;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct ReadingIngestor {
    tracker: StateTracker,
}

impl ReadingIngestor {
    pub fn new(tracker: StateTracker) -> Self {
        Self { tracker }
    }

    /// Drain the source channel until it closes or shutdown is requested.
    /// Samples that fail normalization are dropped with a warning and never
    /// reach the tracker.
    pub async fn run(&self, mut samples: mpsc::Receiver<RawSample>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                sample = samples.recv() => {
                    let Some(sample) = sample else {
                        tracing::info!("Telemetry source channel closed");
                        break;
                    };
                    match sample.normalize(Utc::now()) {
                        Ok(reading) => self.tracker.apply(reading).await,
                        Err(e) => tracing::warn!("Dropping sample: {}", e),
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Ingest loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cook_repository::testing::MemoryRepository;
    use crate::application::session_ledger::SessionLedger;
    use crate::application::telemetry_cache::TelemetryCache;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_invalid_samples_are_dropped() {
        let repository = Arc::new(MemoryRepository::default());
        let cache = Arc::new(TelemetryCache::new(100));
        let ledger = SessionLedger::new(repository.clone());
        let tracker = StateTracker::new(cache.clone(), ledger, repository);
        let ingestor = ReadingIngestor::new(tracker);

        let (tx, rx) = mpsc::channel(8);
        tx.send(RawSample::default()).await.unwrap();
        tx.send(RawSample {
            grill_temp: Some(225.0),
            probe_temp: Some(140.0),
            ..RawSample::default()
        })
        .await
        .unwrap();
        drop(tx);

        ingestor.run(rx, CancellationToken::new()).await;

        let history = cache.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].grill_temp, 225.0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let repository = Arc::new(MemoryRepository::default());
        let cache = Arc::new(TelemetryCache::new(100));
        let ledger = SessionLedger::new(repository.clone());
        let tracker = StateTracker::new(cache, ledger, repository);
        let ingestor = ReadingIngestor::new(tracker);

        let (_tx, rx) = mpsc::channel::<RawSample>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Returns instead of waiting on the still-open channel.
        ingestor.run(rx, cancel).await;
    }
}
