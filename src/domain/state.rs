// Live appliance state domain model
use super::reading::Reading;
use chrono::{DateTime, Utc};

/// Mirror of the most recent reading, plus the two flags that outlive any
/// single reading: `ever_connected` (sticky) and `is_idle` (owned by the
/// idle monitor).
#[derive(Debug, Clone, Default)]
pub struct LatestState {
    pub timestamp: Option<DateTime<Utc>>,
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
    pub ever_connected: bool,
    pub is_idle: bool,
}

impl LatestState {
    /// Mirror a reading into the snapshot. Temperatures are rounded to one
    /// decimal for display stability only; detection logic reads raw values.
    /// Returns true when the reading's connection marker starts a new epoch.
    pub fn mirror(&mut self, reading: &Reading) -> bool {
        self.timestamp = Some(reading.timestamp);
        self.grill_temp = round_display(reading.grill_temp);
        self.probe_temp = round_display(reading.probe_temp);
        self.grill_setpoint = reading.grill_setpoint;
        self.probe_setpoint = reading.probe_setpoint;
        self.ambient_temp = reading.ambient_temp;
        self.connected = reading.connected;
        self.cook_timer_start = reading.cook_timer_start;
        self.cook_timer_end = reading.cook_timer_end;
        self.cook_timer_remaining = reading.cook_timer_remaining;

        // The stored marker is only replaced on an epoch change, so a device
        // that stops sending the field mid-session cannot retrigger one.
        let Some(marker) = reading.last_connected.as_deref() else {
            return false;
        };
        if self.ever_connected && self.last_connected.as_deref() == Some(marker) {
            return false;
        }
        self.ever_connected = true;
        self.last_connected = Some(marker.to_string());
        true
    }
}

fn round_display(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_with_marker(marker: Option<&str>) -> Reading {
        Reading {
            timestamp: Utc::now(),
            grill_temp: 203.46,
            probe_temp: 128.34,
            grill_setpoint: Some(250.0),
            probe_setpoint: Some(145.0),
            ambient_temp: None,
            connected: true,
            last_connected: marker.map(str::to_string),
            cook_timer_start: None,
            cook_timer_end: None,
            cook_timer_remaining: None,
        }
    }

    #[test]
    fn test_mirror_rounds_for_display() {
        let mut state = LatestState::default();
        state.mirror(&reading_with_marker(None));
        assert_eq!(state.grill_temp, 203.5);
        assert_eq!(state.probe_temp, 128.3);
    }

    #[test]
    fn test_first_marker_starts_epoch() {
        let mut state = LatestState::default();
        assert!(state.mirror(&reading_with_marker(Some("m1"))));
        assert!(state.ever_connected);
        assert_eq!(state.last_connected.as_deref(), Some("m1"));
    }

    #[test]
    fn test_repeated_marker_is_idempotent() {
        let mut state = LatestState::default();
        assert!(state.mirror(&reading_with_marker(Some("m1"))));
        assert!(!state.mirror(&reading_with_marker(Some("m1"))));
        assert!(!state.mirror(&reading_with_marker(Some("m1"))));
    }

    #[test]
    fn test_changed_marker_starts_new_epoch() {
        let mut state = LatestState::default();
        assert!(state.mirror(&reading_with_marker(Some("m1"))));
        assert!(state.mirror(&reading_with_marker(Some("m2"))));
        assert_eq!(state.last_connected.as_deref(), Some("m2"));
    }

    #[test]
    fn test_absent_marker_is_sticky() {
        let mut state = LatestState::default();
        assert!(state.mirror(&reading_with_marker(Some("m1"))));
        assert!(!state.mirror(&reading_with_marker(None)));
        assert_eq!(state.last_connected.as_deref(), Some("m1"));
        assert!(state.ever_connected);
    }

    #[test]
    fn test_mirror_never_touches_idle_flag() {
        let mut state = LatestState {
            is_idle: true,
            ..LatestState::default()
        };
        state.mirror(&reading_with_marker(Some("m1")));
        assert!(state.is_idle);
    }
}
