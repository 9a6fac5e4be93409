// Cook session domain model
use super::reading::Reading;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Seconds between start and end. Set together with `end`, never alone.
    pub duration_secs: Option<f64>,
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub notes: Option<String>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Conditions captured once when a session opens.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
}

impl SessionMeta {
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            grill_setpoint: reading.grill_setpoint,
            probe_setpoint: reading.probe_setpoint,
            ambient_temp: reading.ambient_temp,
        }
    }
}
