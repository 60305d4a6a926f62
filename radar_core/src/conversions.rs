//! `From` implementations bridging `radar_config` types to `radar_core` types.

use std::time::Duration;

use crate::config::{NetworkCfg, SweepCfg};
use crate::gate::ActivationGate;

impl From<&radar_config::Sweep> for SweepCfg {
    fn from(c: &radar_config::Sweep) -> Self {
        Self {
            step_deg: c.step_deg,
            settle: Duration::from_millis(c.settle_ms),
            alert_distance_cm: c.alert_distance_cm,
        }
    }
}

impl From<&radar_config::Network> for NetworkCfg {
    fn from(c: &radar_config::Network) -> Self {
        Self {
            host: c.host.clone(),
            port: c.port,
            accept_timeout: Duration::from_millis(c.accept_timeout_ms),
            write_timeout: Duration::from_millis(c.write_timeout_ms),
        }
    }
}

impl From<&radar_config::Gate> for ActivationGate {
    fn from(c: &radar_config::Gate) -> Self {
        ActivationGate::new(c.required, c.configured_secret().map(str::to_owned))
    }
}
