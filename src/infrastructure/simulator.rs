// Synthetic telemetry generator for running without a grill
use crate::domain::reading::RawSample;
use crate::infrastructure::config::SimulationConfig;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Produces a plausible cook: exponential warm-up toward the target with a
/// sinusoidal fan surge on top, and a probe that trails the grill with
/// first-order lag. Samples carry a per-run connection marker so a simulated
/// cook opens a session like a real one.
pub struct Simulator {
    config: SimulationConfig,
    rng: StdRng,
    marker: String,
    elapsed_secs: f64,
    probe_temp: f64,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        let probe_temp = config.ambient_temp;
        Self {
            config,
            rng,
            marker: Utc::now().to_rfc3339(),
            elapsed_secs: 0.0,
            probe_temp,
        }
    }

    /// Produce the next sample, then advance the simulated clock by `dt_secs`.
    fn step(&mut self, dt_secs: f64) -> RawSample {
        let c = &self.config;

        let warmup = 1.0 - (-self.elapsed_secs / c.warmup_secs).exp();
        let base = c.ambient_temp + (c.grill_target_temp - c.ambient_temp) * warmup;
        let surge = c.fan_amplitude * (TAU * self.elapsed_secs / c.fan_period_secs).sin();
        let grill_temp = base + surge + self.rng.gen_range(-1.0..=1.0);

        let lag = 1.0 - (-dt_secs / c.probe_time_constant_secs).exp();
        self.probe_temp += (grill_temp - self.probe_temp) * lag;
        let probe_temp = self.probe_temp + self.rng.gen_range(-0.2..=0.2);

        self.elapsed_secs += dt_secs;

        RawSample {
            grill_temp: Some(grill_temp),
            probe_temp: Some(probe_temp),
            grill_setpoint: Some(c.grill_target_temp),
            probe_setpoint: Some(c.probe_target_temp),
            ambient_temp: Some(c.ambient_temp),
            connected: Some(true),
            last_connected: Some(self.marker.clone()),
            ..RawSample::default()
        }
    }

    /// Emit samples on a fixed tick until the configured cook length runs
    /// out or shutdown is requested.
    pub async fn run(mut self, samples: mpsc::Sender<RawSample>, cancel: CancellationToken) {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(self.config.tick_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Simulating a {}s cook toward {}°F",
            self.config.duration_secs,
            self.config.grill_target_temp
        );

        while self.elapsed_secs < self.config.duration_secs as f64 {
            tokio::select! {
                _ = ticker.tick() => {
                    let sample = self.step(self.config.tick_secs as f64);
                    if samples.send(sample).await.is_err() {
                        tracing::info!("Sample receiver dropped, stopping simulator");
                        return;
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Simulator shutting down");
                    return;
                }
            }
        }

        tracing::info!("Simulated cook finished");
    }
}
