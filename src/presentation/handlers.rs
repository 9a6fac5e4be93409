// HTTP request handlers
use crate::domain::reading::Reading;
use crate::domain::session::Session;
use crate::presentation::app_state::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

fn epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub timestamp: Option<f64>,
    pub grill_temp: f64,
    pub probe_temp: f64,
    pub grill_set: Option<f64>,
    pub probe_set: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub connected: bool,
    pub is_simulated: bool,
    pub is_idle: bool,
    pub is_stale: bool,
    pub session_start_time: Option<f64>,
    pub last_connected: Option<String>,
    pub cook_timer_remaining: Option<f64>,
}

/// Current appliance snapshot
pub async fn current_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let snapshot = state.cache.snapshot();
    // Same comparison IdleMonitor::tick makes; the two staleness views
    // must agree at fractional-second ages.
    let is_stale = snapshot
        .timestamp
        .map(|t| Utc::now() - t > Duration::seconds(state.wake_threshold_secs as i64))
        .unwrap_or(true);

    let session_start_time = match state.ledger.most_recent().await {
        Ok(session) => session.map(|s| epoch_secs(s.start)),
        Err(e) => {
            tracing::error!("Error fetching most recent session: {}", e);
            None
        }
    };

    Json(StatsResponse {
        timestamp: snapshot.timestamp.map(epoch_secs),
        grill_temp: snapshot.grill_temp,
        probe_temp: snapshot.probe_temp,
        grill_set: snapshot.grill_setpoint,
        probe_set: snapshot.probe_setpoint,
        ambient_temp: snapshot.ambient_temp,
        connected: snapshot.connected,
        is_simulated: state.simulate,
        is_idle: snapshot.is_idle,
        is_stale,
        session_start_time,
        last_connected: snapshot.last_connected,
        cook_timer_remaining: snapshot.cook_timer_remaining,
    })
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub time: f64,
    pub grill_temp: f64,
    pub probe_temp: f64,
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub connected: bool,
    pub last_connected: Option<String>,
}

impl HistoryEntry {
    fn from_reading(reading: &Reading) -> Self {
        Self {
            time: epoch_secs(reading.timestamp),
            grill_temp: reading.grill_temp,
            probe_temp: reading.probe_temp,
            grill_setpoint: reading.grill_setpoint,
            probe_setpoint: reading.probe_setpoint,
            ambient_temp: reading.ambient_temp,
            connected: reading.connected,
            last_connected: reading.last_connected.clone(),
        }
    }
}

/// Rolling reading history, oldest first
pub async fn reading_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    let entries = state
        .cache
        .history()
        .iter()
        .map(HistoryEntry::from_reading)
        .collect();
    Json(entries)
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub start: f64,
    pub end: Option<f64>,
    pub duration: Option<f64>,
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub notes: Option<String>,
}

impl SessionResponse {
    fn from_session(session: &Session) -> Self {
        Self {
            id: session.id,
            start: epoch_secs(session.start),
            end: session.end.map(epoch_secs),
            duration: session.duration_secs,
            grill_setpoint: session.grill_setpoint,
            probe_setpoint: session.probe_setpoint,
            ambient_temp: session.ambient_temp,
            notes: session.notes.clone(),
        }
    }
}

/// All recorded cook sessions, oldest first
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionResponse>> {
    match state.ledger.list().await {
        Ok(sessions) => Json(sessions.iter().map(SessionResponse::from_session).collect()),
        Err(e) => {
            tracing::error!("Error fetching sessions: {}", e);
            // Return empty list on error
            Json(Vec::new())
        }
    }
}

/// Push accepted readings to dashboards as they arrive
pub async fn stream_readings(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.cache.subscribe();
    let stream = BroadcastStream::new(rx).map(|result| {
        let event = match result {
            Ok(reading) => {
                let entry = HistoryEntry::from_reading(&reading);
                Event::default()
                    .event("reading")
                    .data(serde_json::to_string(&entry).unwrap_or_default())
            }
            Err(_) => Event::default().comment("lagged"),
        };
        Ok(event)
    });

    Sse::new(stream)
}
