// Error types shared across layers
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid reading: missing {field}")]
    InvalidReading { field: &'static str },

    #[error("session {id} is still open")]
    SessionConflict { id: i64 },

    #[error("persistence failure in {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("telemetry source unavailable: {reason}")]
    SourceUnavailable { reason: String },
}

impl TelemetryError {
    pub fn persistence(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Persistence {
            operation,
            source: source.into(),
        }
    }
}
