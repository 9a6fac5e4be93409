// Telemetry reading domain models
use crate::domain::error::TelemetryError;
use chrono::{DateTime, Utc};

/// One sample as a telemetry source produced it. Every field is optional
/// because devices omit keys freely; `normalize` decides what is usable.
#[derive(Debug, Clone, Default)]
pub struct RawSample {
    pub grill_temp: Option<f64>,
    pub probe_temp: Option<f64>,
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub connected: Option<bool>,
    pub last_connected: Option<String>,
    pub cook_timer_start: Option<f64>,
    pub cook_timer_end: Option<f64>,
    pub cook_timer_remaining: Option<f64>,
}

/// A validated reading, stamped with its arrival instant. Session and idle
/// bookkeeping all run off this timestamp, never device-reported time.
#[derive(Debug, Clone)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub grill_temp: f64,
    pub probe_temp: f64,
    pub grill_setpoint: Option<f64>,
    pub probe_setpoint: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub connected: bool,
    pub last_connected: Option<String>,
    pub cook_timer_start: Option<f64>,
    pub cook_timer_end: Option<f64>,
    pub cook_timer_remaining: Option<f64>,
}

impl RawSample {
    /// Promote a raw sample to a reading. Both temperatures are required;
    /// everything else passes through as-is, with a missing connected flag
    /// treated as disconnected.
    pub fn normalize(self, timestamp: DateTime<Utc>) -> Result<Reading, TelemetryError> {
        let grill_temp = self
            .grill_temp
            .ok_or(TelemetryError::InvalidReading { field: "grill_temp" })?;
        let probe_temp = self
            .probe_temp
            .ok_or(TelemetryError::InvalidReading { field: "probe_temp" })?;

        Ok(Reading {
            timestamp,
            grill_temp,
            probe_temp,
            grill_setpoint: self.grill_setpoint,
            probe_setpoint: self.probe_setpoint,
            ambient_temp: self.ambient_temp,
            connected: self.connected.unwrap_or(false),
            last_connected: self.last_connected,
            cook_timer_start: self.cook_timer_start,
            cook_timer_end: self.cook_timer_end,
            cook_timer_remaining: self.cook_timer_remaining,
        })
    }
}
