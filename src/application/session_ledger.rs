// Session ledger - Use case for opening and closing cook sessions
use crate::application::cook_repository::CookRepository;
use crate::domain::error::TelemetryError;
use crate::domain::session::{Session, SessionMeta};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct SessionLedger {
    repository: Arc<dyn CookRepository>,
    // Serializes the check-then-write in open and close so two callers can
    // never both see "no open session" and create one each.
    gate: Arc<Mutex<()>>,
}

impl SessionLedger {
    pub fn new(repository: Arc<dyn CookRepository>) -> Self {
        Self {
            repository,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Open a session starting at `start`. Fails with SessionConflict while
    /// an earlier session is still open.
    pub async fn open(
        &self,
        start: DateTime<Utc>,
        meta: &SessionMeta,
    ) -> Result<i64, TelemetryError> {
        let _guard = self.gate.lock().await;

        if let Some(open) = self
            .repository
            .find_most_recent_session()
            .await?
            .filter(Session::is_open)
        {
            return Err(TelemetryError::SessionConflict { id: open.id });
        }

        self.repository.create_session(start, meta).await
    }

    /// Close the open session at `end`, if there is one. Returns the closed
    /// session's id, or None when there was nothing to close.
    pub async fn close(&self, end: DateTime<Utc>) -> Result<Option<i64>, TelemetryError> {
        let _guard = self.gate.lock().await;

        let Some(open) = self
            .repository
            .find_most_recent_session()
            .await?
            .filter(Session::is_open)
        else {
            return Ok(None);
        };

        let duration_secs = (end - open.start).num_milliseconds() as f64 / 1000.0;
        self.repository
            .update_session(open.id, end, duration_secs)
            .await?;
        Ok(Some(open.id))
    }

    pub async fn list(&self) -> Result<Vec<Session>, TelemetryError> {
        self.repository.list_sessions().await
    }

    pub async fn most_recent(&self) -> Result<Option<Session>, TelemetryError> {
        self.repository.find_most_recent_session().await
    }
}
