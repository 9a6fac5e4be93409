// Application state for HTTP handlers
use crate::application::session_ledger::SessionLedger;
use crate::application::telemetry_cache::TelemetryCache;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TelemetryCache>,
    pub ledger: SessionLedger,
    pub simulate: bool,
    pub wake_threshold_secs: u64,
}
