use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Feed the service from the synthetic generator instead of a device.
    #[serde(default)]
    pub simulate: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: default_device_base_url(),
            poll_secs: default_poll_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default = "default_grill_target_temp")]
    pub grill_target_temp: f64,
    #[serde(default = "default_probe_target_temp")]
    pub probe_target_temp: f64,
    #[serde(default = "default_ambient_temp")]
    pub ambient_temp: f64,
    /// Time constant of the exponential warm-up toward the target.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f64,
    #[serde(default = "default_fan_period_secs")]
    pub fan_period_secs: f64,
    #[serde(default = "default_fan_amplitude")]
    pub fan_amplitude: f64,
    #[serde(default = "default_probe_time_constant_secs")]
    pub probe_time_constant_secs: f64,
    #[serde(default = "default_sim_tick_secs")]
    pub tick_secs: u64,
    /// How long a simulated cook runs before the generator stops.
    #[serde(default = "default_sim_duration_secs")]
    pub duration_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grill_target_temp: default_grill_target_temp(),
            probe_target_temp: default_probe_target_temp(),
            ambient_temp: default_ambient_temp(),
            warmup_secs: default_warmup_secs(),
            fan_period_secs: default_fan_period_secs(),
            fan_amplitude: default_fan_amplitude(),
            probe_time_constant_secs: default_probe_time_constant_secs(),
            tick_secs: default_sim_tick_secs(),
            duration_secs: default_sim_duration_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdleConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// A reading older than this marks the appliance idle.
    #[serde(default = "default_wake_threshold_secs")]
    pub wake_threshold_secs: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            wake_threshold_secs: default_wake_threshold_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_db_path() -> String {
    "data/grill.db".to_string()
}

fn default_device_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_poll_secs() -> u64 {
    5
}

fn default_grill_target_temp() -> f64 {
    250.0
}

fn default_probe_target_temp() -> f64 {
    145.0
}

fn default_ambient_temp() -> f64 {
    70.0
}

fn default_warmup_secs() -> f64 {
    600.0
}

fn default_fan_period_secs() -> f64 {
    300.0
}

fn default_fan_amplitude() -> f64 {
    5.0
}

fn default_probe_time_constant_secs() -> f64 {
    150.0
}

fn default_sim_tick_secs() -> u64 {
    2
}

fn default_sim_duration_secs() -> u64 {
    3 * 60 * 60
}

fn default_check_interval_secs() -> u64 {
    2
}

fn default_wake_threshold_secs() -> u64 {
    5
}

fn default_history_capacity() -> usize {
    10_000
}

/// Load `config/default.toml` if present, then apply GRILL__ environment
/// overrides (GRILL__SIMULATE, GRILL__SERVER__BIND_ADDR, ...).
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(
            config::Environment::with_prefix("GRILL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.simulate);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.device.poll_secs, 5);
        assert_eq!(config.simulation.grill_target_temp, 250.0);
        assert_eq!(config.simulation.ambient_temp, 70.0);
        assert_eq!(config.simulation.duration_secs, 10_800);
        assert_eq!(config.idle.wake_threshold_secs, 5);
        assert_eq!(config.idle.check_interval_secs, 2);
        assert_eq!(config.history.capacity, 10_000);
    }

    #[test]
    fn test_partial_file_backfills_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "simulate = true\n[idle]\nwake_threshold_secs = 3\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = settings.try_deserialize().unwrap();
        assert!(config.simulate);
        assert_eq!(config.idle.wake_threshold_secs, 3);
        assert_eq!(config.idle.check_interval_secs, 2);
        assert_eq!(config.history.capacity, 10_000);
    }
}
