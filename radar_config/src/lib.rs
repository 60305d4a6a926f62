#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the ranging controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Environment overrides (`RADAR_*`) are layered on top of the file through an
//!   injected lookup, so callers decide where variables come from.
use serde::Deserialize;

/// Upper bound for the HC-SR04 class of sensors.
pub const MAX_SENSOR_RANGE_M: f64 = 4.0;

pub const ENV_TCP_HOST: &str = "RADAR_TCP_HOST";
pub const ENV_TCP_PORT: &str = "RADAR_TCP_PORT";
pub const ENV_REQUIRE_PASSWORD: &str = "RADAR_REQUIRE_PASSWORD";
pub const ENV_PASSWORD: &str = "RADAR_PASSWORD";

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pins {
    pub trigger: u8,
    pub echo: u8,
    pub servo: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensor {
    /// Max range in meters; echoes beyond it count as "no echo".
    pub max_distance_m: f64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            max_distance_m: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sweep {
    pub step_deg: u8,
    /// Delay between commanding a new angle and reading the sensor.
    pub settle_ms: u64,
    /// Samples strictly below this distance raise an alert.
    pub alert_distance_cm: f64,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            step_deg: 5,
            settle_ms: 50,
            alert_distance_cm: 40.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Network {
    pub host: String,
    pub port: u16,
    pub accept_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5005,
            accept_timeout_ms: 60_000,
            write_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Gate {
    /// Ask for the secret before arming hardware.
    pub required: bool,
    /// Shared secret. Empty counts as not configured.
    pub secret: Option<String>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            required: true,
            secret: None,
        }
    }
}

impl Gate {
    /// The secret, if one is set and non-empty.
    pub fn configured_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub sensor: Sensor,
    #[serde(default)]
    pub sweep: Sweep,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub gate: Gate,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// `1`, `true`, `yes` (any case) are true; everything else is false.
fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Layer `RADAR_*` overrides on top of the file values.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> eyre::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_TCP_HOST) {
            self.network.host = host;
        }
        if let Some(port) = lookup(ENV_TCP_PORT) {
            self.network.port = port
                .trim()
                .parse()
                .map_err(|e| eyre::eyre!("{ENV_TCP_PORT}={port:?} is not a valid port: {e}"))?;
        }
        if let Some(flag) = lookup(ENV_REQUIRE_PASSWORD) {
            self.gate.required = parse_flag(&flag);
        }
        if let Some(secret) = lookup(ENV_PASSWORD) {
            self.gate.secret = Some(secret);
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        if p.trigger == p.echo || p.trigger == p.servo || p.echo == p.servo {
            eyre::bail!(
                "pins must be distinct (trigger={}, echo={}, servo={})",
                p.trigger,
                p.echo,
                p.servo
            );
        }

        // Sensor
        let max_m = self.sensor.max_distance_m;
        if !max_m.is_finite() || max_m <= 0.0 || max_m > MAX_SENSOR_RANGE_M {
            eyre::bail!("sensor.max_distance_m must be in (0.0, {MAX_SENSOR_RANGE_M}]");
        }

        // Sweep
        if !(1..=180).contains(&self.sweep.step_deg) {
            eyre::bail!("sweep.step_deg must be in [1, 180]");
        }
        if self.sweep.settle_ms > 10_000 {
            eyre::bail!("sweep.settle_ms is unreasonably large (>10s)");
        }
        let alert = self.sweep.alert_distance_cm;
        if !alert.is_finite() || alert < 0.0 {
            eyre::bail!("sweep.alert_distance_cm must be a finite value >= 0");
        }

        // Network
        if self.network.host.trim().is_empty() {
            eyre::bail!("network.host must not be empty");
        }
        if self.network.accept_timeout_ms == 0 {
            eyre::bail!("network.accept_timeout_ms must be >= 1");
        }
        if self.network.write_timeout_ms == 0 {
            eyre::bail!("network.write_timeout_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }

        Ok(())
    }
}
