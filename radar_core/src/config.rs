//! Runtime configuration used by the engine, link and gates.
//!
//! Separate from the TOML-deserialized config in `radar_config`; see
//! `conversions` for the mapping.

use std::time::Duration;

/// Sweep timing and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepCfg {
    /// Angular increment per step, in degrees (1..=180).
    pub step_deg: u8,
    /// Wait between commanding an angle and reading the sensor.
    pub settle: Duration,
    /// Samples strictly closer than this raise an alert.
    pub alert_distance_cm: f64,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            step_deg: 5,
            settle: Duration::from_millis(50),
            alert_distance_cm: 40.0,
        }
    }
}

/// Telemetry listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCfg {
    pub host: String,
    pub port: u16,
    pub accept_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for NetworkCfg {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5005,
            accept_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
        }
    }
}

#[inline]
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
