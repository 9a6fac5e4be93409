// Live device adapter - Polls the grill's cloud status endpoint
use crate::domain::error::TelemetryError;
use crate::domain::reading::RawSample;
use crate::infrastructure::config::DeviceConfig;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Ordered JSON paths for each sample field. Firmware versions disagree on
/// key names, so every field carries a fallback chain; the first path that
/// resolves wins. Paths traverse objects by key and arrays by index.
#[derive(Debug, Clone)]
pub struct FieldMap {
    pub grill_temp: Vec<&'static str>,
    pub probe_temp: Vec<&'static str>,
    pub grill_setpoint: Vec<&'static str>,
    pub probe_setpoint: Vec<&'static str>,
    pub connected: Vec<&'static str>,
    pub last_connected: Vec<&'static str>,
    pub cook_timer_start: Vec<&'static str>,
    pub cook_timer_end: Vec<&'static str>,
    pub cook_timer_remaining: Vec<&'static str>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            grill_temp: vec!["status.grill"],
            probe_temp: vec!["status.probe"],
            grill_setpoint: vec!["status.grillSetPoint", "status.grill_set", "status.set"],
            probe_setpoint: vec![
                "status.probeSetPoint",
                "status.probe_set",
                "status.acc.0.probe.set_temp",
            ],
            connected: vec!["status.connected"],
            last_connected: vec!["details.lastConnectedOn"],
            cook_timer_start: vec!["status.cook_timer_start"],
            cook_timer_end: vec!["status.cook_timer_end"],
            cook_timer_remaining: vec!["status.cook_timer_remaining"],
        }
    }
}

fn resolve<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = payload;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn first_f64(payload: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| resolve(payload, path).and_then(Value::as_f64))
}

fn first_bool(payload: &Value, paths: &[&str]) -> Option<bool> {
    paths
        .iter()
        .find_map(|path| resolve(payload, path).and_then(Value::as_bool))
}

// Connection markers show up as strings or numeric timestamps depending on
// firmware; either way they are compared opaquely, so keep them as text.
fn first_marker(payload: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match resolve(payload, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub struct DeviceClient {
    client: reqwest::Client,
    base_url: String,
    poll_interval: std::time::Duration,
    fields: FieldMap,
}

impl DeviceClient {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: std::time::Duration::from_secs(config.poll_secs),
            fields: FieldMap::default(),
        }
    }

    async fn fetch_status(&self) -> Result<Value, TelemetryError> {
        let url = format!("{}/status", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            TelemetryError::SourceUnavailable {
                reason: format!("request to {} failed: {}", url, e),
            }
        })?;

        if !response.status().is_success() {
            return Err(TelemetryError::SourceUnavailable {
                reason: format!("device returned {}", response.status()),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TelemetryError::SourceUnavailable {
                reason: format!("device payload was not JSON: {}", e),
            })
    }

    fn map_payload(&self, payload: &Value) -> RawSample {
        let fields = &self.fields;
        RawSample {
            grill_temp: first_f64(payload, &fields.grill_temp),
            probe_temp: first_f64(payload, &fields.probe_temp),
            grill_setpoint: first_f64(payload, &fields.grill_setpoint),
            probe_setpoint: first_f64(payload, &fields.probe_setpoint),
            // Devices report no ambient reading; only the simulator fills it.
            ambient_temp: None,
            connected: first_bool(payload, &fields.connected),
            last_connected: first_marker(payload, &fields.last_connected),
            cook_timer_start: first_f64(payload, &fields.cook_timer_start),
            cook_timer_end: first_f64(payload, &fields.cook_timer_end),
            cook_timer_remaining: first_f64(payload, &fields.cook_timer_remaining),
        }
    }

    /// Poll the device on a fixed schedule until shutdown. An unreachable
    /// device only logs; the idle monitor notices the silence.
    pub async fn run(self, samples: mpsc::Sender<RawSample>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.fetch_status().await {
                        Ok(payload) => {
                            let sample = self.map_payload(&payload);
                            if samples.send(sample).await.is_err() {
                                tracing::info!("Sample receiver dropped, stopping device poller");
                                return;
                            }
                        }
                        Err(e) => tracing::warn!("Device poll failed: {}", e),
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Device poller shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> DeviceClient {
        DeviceClient::new(&DeviceConfig::default())
    }

    #[test]
    fn test_maps_current_firmware_payload() {
        let payload = json!({
            "status": {
                "grill": 224.6,
                "probe": 139.1,
                "grillSetPoint": 250,
                "probeSetPoint": 145,
                "connected": true,
                "cook_timer_remaining": 1200
            },
            "details": { "lastConnectedOn": "2024-04-20T18:00:00Z" }
        });

        let sample = client().map_payload(&payload);
        assert_eq!(sample.grill_temp, Some(224.6));
        assert_eq!(sample.probe_temp, Some(139.1));
        assert_eq!(sample.grill_setpoint, Some(250.0));
        assert_eq!(sample.probe_setpoint, Some(145.0));
        assert_eq!(sample.connected, Some(true));
        assert_eq!(
            sample.last_connected.as_deref(),
            Some("2024-04-20T18:00:00Z")
        );
        assert_eq!(sample.cook_timer_remaining, Some(1200.0));
    }

    #[test]
    fn test_setpoint_fallback_chain() {
        let payload = json!({ "status": { "grill_set": 225 } });
        assert_eq!(client().map_payload(&payload).grill_setpoint, Some(225.0));

        let payload = json!({ "status": { "set": 225 } });
        assert_eq!(client().map_payload(&payload).grill_setpoint, Some(225.0));

        // The first path in the chain wins over later ones.
        let payload = json!({ "status": { "grillSetPoint": 250, "set": 225 } });
        assert_eq!(client().map_payload(&payload).grill_setpoint, Some(250.0));
    }

    #[test]
    fn test_probe_setpoint_from_accessory_array() {
        let payload = json!({
            "status": {
                "acc": [ { "probe": { "set_temp": 145 } } ]
            }
        });
        assert_eq!(client().map_payload(&payload).probe_setpoint, Some(145.0));
    }

    #[test]
    fn test_numeric_marker_becomes_text() {
        let payload = json!({ "details": { "lastConnectedOn": 1713636000 } });
        assert_eq!(
            client().map_payload(&payload).last_connected.as_deref(),
            Some("1713636000")
        );
    }

    #[test]
    fn test_empty_payload_maps_to_empty_sample() {
        let sample = client().map_payload(&json!({}));
        assert_eq!(sample.grill_temp, None);
        assert_eq!(sample.probe_temp, None);
        assert_eq!(sample.connected, None);
        assert_eq!(sample.last_connected, None);
    }
}
