// Repository trait for cook session persistence
use crate::domain::error::TelemetryError;
use crate::domain::reading::Reading;
use crate::domain::session::{Session, SessionMeta};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CookRepository: Send + Sync {
    /// Insert an open session row and return its id
    async fn create_session(
        &self,
        start: DateTime<Utc>,
        meta: &SessionMeta,
    ) -> Result<i64, TelemetryError>;

    /// Stamp an end instant and duration on an existing session
    async fn update_session(
        &self,
        id: i64,
        end: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<(), TelemetryError>;

    /// The session created last, open or closed
    async fn find_most_recent_session(&self) -> Result<Option<Session>, TelemetryError>;

    /// All sessions in creation order
    async fn list_sessions(&self) -> Result<Vec<Session>, TelemetryError>;

    /// Append an accepted reading to the durable cook log
    async fn append_cook_log(&self, reading: &Reading) -> Result<(), TelemetryError>;
}
