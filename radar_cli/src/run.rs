//! Hardware assembly, config mapping, and the `run` / `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use radar_config::{Config, Pins};
use radar_core::error::{RadarError, Result as CoreResult};
use radar_core::hw_error::map_sensor_error;
use radar_core::{ActivationGate, Controller, NetworkCfg, RunSummary, SweepCfg, Teardown};
use radar_traits::clock::{Clock, MonotonicClock};
use radar_traits::{RangeSensor, SweepActuator};
use tracing::{info, warn};

use crate::prompt::StdinPrompt;

/// Angle the servo is parked at for the self-check reading.
const CENTER_DEG: u8 = 90;

#[derive(Debug, Clone, Copy)]
pub struct HardwareSpec {
    pub pins: Pins,
    pub max_distance_m: f64,
}

impl From<&Config> for HardwareSpec {
    fn from(cfg: &Config) -> Self {
        Self {
            pins: cfg.pins,
            max_distance_m: cfg.sensor.max_distance_m,
        }
    }
}

#[cfg(not(feature = "hardware"))]
pub fn open_hardware(
    spec: HardwareSpec,
) -> CoreResult<(radar_hardware::SimulatedSensor, radar_hardware::SimulatedServo)> {
    tracing::debug!(pins = ?spec.pins, "using simulated sensor and servo");
    Ok(radar_hardware::simulated_pair(
        radar_hardware::Scene::demo(),
        spec.max_distance_m,
    ))
}

#[cfg(feature = "hardware")]
pub fn open_hardware(
    spec: HardwareSpec,
) -> CoreResult<(radar_hardware::HardwareSensor, radar_hardware::HardwareServo)> {
    let p = spec.pins;
    let sensor = radar_hardware::HardwareSensor::try_new(p.trigger, p.echo, spec.max_distance_m)
        .map_err(|e| {
            eyre::Report::new(RadarError::Hardware(format!(
                "open sensor pins trigger={} echo={}: {e}",
                p.trigger, p.echo
            )))
        })?;
    let servo = radar_hardware::HardwareServo::try_new(p.servo).map_err(|e| {
        eyre::Report::new(RadarError::Hardware(format!(
            "open servo pin {}: {e}",
            p.servo
        )))
    })?;
    Ok((sensor, servo))
}

/// Full controller lifecycle. Returns once interrupted or on the first fault.
///
/// Ctrl-C keeps its default behaviour while the secret prompt is open; the
/// handler that raises the shutdown flag is installed only once activation
/// has passed.
pub fn run_radar(cfg: &Config) -> CoreResult<RunSummary> {
    let spec = HardwareSpec::from(cfg);
    let sweep: SweepCfg = (&cfg.sweep).into();
    let network: NetworkCfg = (&cfg.network).into();
    let gate: ActivationGate = (&cfg.gate).into();

    let mut builder = Controller::builder()
        .with_hardware(move || open_hardware(spec))
        .with_sweep(sweep)
        .with_network(network);
    if gate.needs_prompt() {
        builder = builder.with_prompt(StdinPrompt::new());
    }
    let controller = builder
        .with_activation_gate(gate)
        .build()
        .wrap_err("build controller")?;

    let armed = controller.activate()?;
    tracing::debug!(activation = ?armed.activation(), "activation passed");

    let shutdown = Arc::new(AtomicBool::new(false));
    install_interrupt(&shutdown)?;
    armed.run(shutdown)
}

/// Outcome of `self-check`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfCheck {
    pub angle: u8,
    /// `None` when nothing echoed back within range.
    pub distance_cm: Option<f64>,
}

/// Centre the servo, take one reading, then detach and release.
pub fn self_check(cfg: &Config) -> CoreResult<SelfCheck> {
    let (mut sensor, mut servo) = open_hardware(HardwareSpec::from(cfg))?;
    let settle = SweepCfg::from(&cfg.sweep).settle;

    let reading = center_reading(&mut sensor, &mut servo, &MonotonicClock::new(), settle);

    let report = radar_core::teardown(Teardown {
        link: None,
        listener: None,
        actuator: &mut servo,
        sensor: &mut sensor,
    });
    if !report.is_clean() {
        warn!(failed = ?report.failed, "self-check teardown incomplete");
    }

    let distance_cm = reading?;
    info!(angle = CENTER_DEG, ?distance_cm, "self-check reading");
    Ok(SelfCheck {
        angle: CENTER_DEG,
        distance_cm,
    })
}

fn center_reading(
    sensor: &mut dyn RangeSensor,
    servo: &mut dyn SweepActuator,
    clock: &dyn Clock,
    settle: std::time::Duration,
) -> CoreResult<Option<f64>> {
    servo
        .set_angle(CENTER_DEG)
        .map_err(|e| eyre::Report::new(RadarError::HardwareFault(e.to_string())))?;
    clock.sleep(settle);
    match sensor.measure() {
        Ok(cm) => Ok(Some(cm)),
        Err(e) => match map_sensor_error(&*e) {
            RadarError::SensorTimeout => Ok(None),
            other => Err(eyre::Report::new(other)),
        },
    }
}

/// Install the Ctrl-C handler that raises `flag`.
fn install_interrupt(flag: &Arc<AtomicBool>) -> eyre::Result<()> {
    let f = flag.clone();
    ctrlc::set_handler(move || {
        f.store(true, Ordering::Relaxed);
    })
    .wrap_err("install Ctrl-C handler")
}

#[cfg(all(test, not(feature = "hardware")))]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let text = "[pins]\ntrigger = 23\necho = 24\nservo = 18\n[sweep]\nsettle_ms = 0\n";
        radar_config::load_toml(text).unwrap()
    }

    #[test]
    fn self_check_on_sim_reports_no_echo_at_center() {
        // the demo scene is empty at 90°
        let r = self_check(&cfg()).unwrap();
        assert_eq!(r.angle, 90);
        assert_eq!(r.distance_cm, None);
    }
}
