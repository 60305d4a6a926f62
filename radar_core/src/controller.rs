//! Composition root: activation → hardware → accept → sweep-and-stream → teardown.
//!
//! Teardown runs on every exit path once hardware exists, and each of its
//! steps is guarded on its own so one failure never skips the rest.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use radar_traits::clock::{Clock, MonotonicClock};
use radar_traits::{AuthPrompt, BoxError, RangeSensor, SweepActuator};
use tracing::{debug, error, info, warn};

use crate::config::{NetworkCfg, SweepCfg};
use crate::error::{BuildError, Result};
use crate::gate::{Activation, ActivationGate, ConnectionGate};
use crate::sweep::SweepEngine;
use crate::telemetry::TelemetryLink;

type DynSensor = Box<dyn RangeSensor>;
type DynActuator = Box<dyn SweepActuator>;
type HardwareFactory = Box<dyn FnOnce() -> Result<(DynSensor, DynActuator)>>;

/// Why a run ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown flag was raised (operator interrupt).
    Interrupted,
}

/// Totals for a run that ended without a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub activation: Activation,
    pub stop: StopReason,
    pub samples_sent: u64,
    pub alerts: u64,
    pub teardown: TeardownReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    CloseSession,
    CloseListener,
    DetachActuator,
    ReleaseSensor,
}

/// Steps that failed (and were ignored) during teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub failed: Vec<TeardownStep>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resources handed to `teardown`. Absent session/listener steps are skipped.
pub struct Teardown<'a> {
    pub link: Option<TelemetryLink>,
    pub listener: Option<&'a mut ConnectionGate>,
    pub actuator: &'a mut dyn SweepActuator,
    pub sensor: &'a mut dyn RangeSensor,
}

/// Release everything in fixed order: session, listener, actuator, sensor.
pub fn teardown(parts: Teardown<'_>) -> TeardownReport {
    let Teardown {
        link,
        listener,
        actuator,
        sensor,
    } = parts;
    let mut report = TeardownReport::default();

    if let Some(link) = link {
        guarded(&mut report, TeardownStep::CloseSession, move || {
            link.close().map_err(Into::into)
        });
    }
    if let Some(listener) = listener {
        guarded(&mut report, TeardownStep::CloseListener, move || {
            listener.close().map_err(Into::into)
        });
    }
    guarded(&mut report, TeardownStep::DetachActuator, move || {
        actuator.detach()
    });
    guarded(&mut report, TeardownStep::ReleaseSensor, move || {
        sensor.release()
    });

    report
}

fn guarded<F>(report: &mut TeardownReport, step: TeardownStep, f: F)
where
    F: FnOnce() -> std::result::Result<(), BoxError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => debug!(?step, "teardown step done"),
        Ok(Err(e)) => {
            debug!(?step, error = %e, "teardown step failed; ignored");
            report.failed.push(step);
        }
        Err(_) => {
            warn!(?step, "teardown step panicked; ignored");
            report.failed.push(step);
        }
    }
}

/// Owns the configuration and collaborators for one controller lifetime.
pub struct Controller {
    hardware: HardwareFactory,
    prompt: Option<Box<dyn AuthPrompt>>,
    clock: Box<dyn Clock + Send + Sync>,
    sweep: SweepCfg,
    network: NetworkCfg,
    gate: ActivationGate,
}

impl core::fmt::Debug for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("sweep", &self.sweep)
            .field("network", &self.network)
            .field("gate_required", &self.gate.is_required())
            .finish()
    }
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    /// Run the activation check, then the full lifecycle until interrupt or fault.
    ///
    /// `ActivationDenied` returns before the hardware factory is called. Any
    /// fault after that still goes through `teardown` before being returned.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<RunSummary> {
        self.activate()?.run(shutdown)
    }

    /// Only the activation check. No hardware is built and nothing is bound,
    /// so a caller can install its interrupt handling after this returns.
    pub fn activate(self) -> Result<Activated> {
        let Controller {
            hardware,
            mut prompt,
            clock,
            sweep,
            network,
            gate,
        } = self;

        let activation = gate.check(prompt.as_deref_mut())?;
        Ok(Activated {
            activation,
            hardware,
            clock,
            sweep,
            network,
        })
    }
}

/// A controller that passed its activation check and has not armed hardware yet.
pub struct Activated {
    activation: Activation,
    hardware: HardwareFactory,
    clock: Box<dyn Clock + Send + Sync>,
    sweep: SweepCfg,
    network: NetworkCfg,
}

impl core::fmt::Debug for Activated {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Activated")
            .field("activation", &self.activation)
            .field("sweep", &self.sweep)
            .field("network", &self.network)
            .finish()
    }
}

impl Activated {
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Arm hardware, serve one consumer and tear down.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<RunSummary> {
        let Activated {
            activation,
            hardware,
            clock,
            sweep,
            network,
        } = self;

        let (sensor, actuator) = hardware()?;
        info!(
            step_deg = sweep.step_deg,
            settle_ms = sweep.settle.as_millis() as u64,
            "hardware armed"
        );

        let mut engine =
            SweepEngine::new(sensor, actuator, clock, sweep).with_cancel(shutdown.clone());
        let mut listener: Option<ConnectionGate> = None;
        let mut link: Option<TelemetryLink> = None;

        let outcome = serve(&network, &shutdown, &mut engine, &mut listener, &mut link);

        let samples_sent = link.as_ref().map_or(0, TelemetryLink::sent);
        let alerts = engine.alerts();
        match &outcome {
            Ok(stop) => info!(?stop, samples_sent, alerts, "sweep stopped"),
            Err(e) => error!(error = %e, samples_sent, "controller stopped on fault"),
        }

        let (mut sensor, mut actuator) = engine.into_parts();
        let report = teardown(Teardown {
            link: link.take(),
            listener: listener.as_mut(),
            actuator: &mut *actuator,
            sensor: &mut *sensor,
        });
        if !report.is_clean() {
            debug!(failed = ?report.failed, "teardown had ignored failures");
        }
        info!("clean shutdown complete");

        outcome.map(|stop| RunSummary {
            activation,
            stop,
            samples_sent,
            alerts,
            teardown: report,
        })
    }
}

fn serve<C: Clock>(
    network: &NetworkCfg,
    shutdown: &AtomicBool,
    engine: &mut SweepEngine<DynSensor, DynActuator, C>,
    listener: &mut Option<ConnectionGate>,
    link: &mut Option<TelemetryLink>,
) -> Result<StopReason> {
    let gate = listener.insert(ConnectionGate::bind(network)?);
    info!(addr = %gate.local_addr(), "waiting for telemetry consumer");

    let Some(session) = gate.accept_one(shutdown)? else {
        return Ok(StopReason::Interrupted);
    };
    info!(peer = %session.peer_addr(), "telemetry consumer connected");

    let link = link.insert(TelemetryLink::new(session, network.write_timeout)?);
    info!("starting sweep");
    for sample in engine.by_ref() {
        link.send(&sample?)?;
    }
    Ok(StopReason::Interrupted)
}

/// Builder for `Controller`. Hardware is required; everything else defaults.
#[derive(Default)]
pub struct ControllerBuilder {
    hardware: Option<HardwareFactory>,
    prompt: Option<Box<dyn AuthPrompt>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    sweep: Option<SweepCfg>,
    network: Option<NetworkCfg>,
    gate: Option<ActivationGate>,
}

impl ControllerBuilder {
    /// Deferred hardware construction; only called after activation passes.
    pub fn with_hardware<S, A, F>(mut self, factory: F) -> Self
    where
        S: RangeSensor + 'static,
        A: SweepActuator + 'static,
        F: FnOnce() -> Result<(S, A)> + 'static,
    {
        self.hardware = Some(Box::new(move || {
            let (s, a) = factory()?;
            Ok((Box::new(s) as DynSensor, Box::new(a) as DynActuator))
        }));
        self
    }

    pub fn with_prompt<P: AuthPrompt + 'static>(mut self, prompt: P) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_sweep(mut self, sweep: SweepCfg) -> Self {
        self.sweep = Some(sweep);
        self
    }

    pub fn with_network(mut self, network: NetworkCfg) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_activation_gate(mut self, gate: ActivationGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Result<Controller> {
        let hardware = self
            .hardware
            .ok_or_else(|| eyre::Report::new(BuildError::MissingHardware))?;
        let sweep = self.sweep.unwrap_or_default();
        let network = self.network.unwrap_or_default();
        let gate = self.gate.unwrap_or_default();

        if !(1..=180).contains(&sweep.step_deg) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "step_deg must be in [1, 180]",
            )));
        }
        if !sweep.alert_distance_cm.is_finite() || sweep.alert_distance_cm < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "alert_distance_cm must be finite and >= 0",
            )));
        }
        if network.accept_timeout.is_zero() || network.write_timeout.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "network timeouts must be > 0",
            )));
        }
        if gate.needs_prompt() && self.prompt.is_none() {
            return Err(eyre::Report::new(BuildError::MissingPrompt));
        }

        Ok(Controller {
            hardware,
            prompt: self.prompt,
            clock: self
                .clock
                .unwrap_or_else(|| Box::new(MonotonicClock::new())),
            sweep,
            network,
            gate,
        })
    }
}
