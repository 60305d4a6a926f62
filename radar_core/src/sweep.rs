//! Servo sweep state machine and the pull-based sample producer.
//!
//! The engine walks 0° → 180° → 0° forever. Each step commands the actuator,
//! waits the settle delay, reads the sensor and yields one `Sample`. A missed
//! echo is replaced with the sensor's max range; any other hardware fault is
//! returned to the caller. Cancellation is observed only between steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use radar_traits::clock::{Clock, MonotonicClock};
use radar_traits::{RangeSensor, SweepActuator};
use tracing::{debug, trace};

use crate::config::SweepCfg;
use crate::error::{RadarError, Result};
use crate::hw_error::{map_actuator_error, map_sensor_error};
use crate::sample::{AlertEvent, Sample};

pub const MIN_ANGLE: u8 = 0;
pub const MAX_ANGLE: u8 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Position of the sweep: the angle the next step visits and the leg it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepState {
    direction: Direction,
    current_angle: u8,
}

impl Default for SweepState {
    fn default() -> Self {
        Self::new(MIN_ANGLE, Direction::Ascending)
    }
}

impl SweepState {
    /// Angles above 180 are clamped.
    pub fn new(angle: u8, direction: Direction) -> Self {
        Self {
            direction,
            current_angle: angle.min(MAX_ANGLE),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The angle the next step will command.
    pub fn current_angle(&self) -> u8 {
        self.current_angle
    }

    /// Move past the current angle. A boundary angle is visited before the
    /// direction flips; steps that overshoot a boundary land exactly on it.
    pub fn advance(&mut self, step_deg: u8) {
        let step = step_deg.max(1);
        match self.direction {
            Direction::Ascending if self.current_angle >= MAX_ANGLE => {
                self.direction = Direction::Descending;
                self.current_angle = MAX_ANGLE.saturating_sub(step);
            }
            Direction::Ascending => {
                self.current_angle = self.current_angle.saturating_add(step).min(MAX_ANGLE);
            }
            Direction::Descending if self.current_angle == MIN_ANGLE => {
                self.direction = Direction::Ascending;
                self.current_angle = step.min(MAX_ANGLE);
            }
            Direction::Descending => {
                self.current_angle = self.current_angle.saturating_sub(step);
            }
        }
    }
}

/// Drives one sensor/actuator pair through the sweep.
///
/// Implements `Iterator<Item = Result<Sample>>`: it never ends on its own and
/// returns `None` only once the cancel flag is raised.
pub struct SweepEngine<S, A, C = MonotonicClock> {
    sensor: S,
    actuator: A,
    clock: C,
    cfg: SweepCfg,
    state: SweepState,
    cancel: Option<Arc<AtomicBool>>,
    samples: u64,
    alerts: u64,
    missed_echoes: u64,
}

impl<S, A, C> core::fmt::Debug for SweepEngine<S, A, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SweepEngine")
            .field("cfg", &self.cfg)
            .field("state", &self.state)
            .field("samples", &self.samples)
            .field("alerts", &self.alerts)
            .finish()
    }
}

impl<S: RangeSensor, A: SweepActuator, C: Clock> SweepEngine<S, A, C> {
    pub fn new(sensor: S, actuator: A, clock: C, cfg: SweepCfg) -> Self {
        Self {
            sensor,
            actuator,
            clock,
            cfg,
            state: SweepState::default(),
            cancel: None,
            samples: 0,
            alerts: 0,
            missed_echoes: 0,
        }
    }

    /// Resume from an explicit position instead of 0° ascending.
    pub fn with_state(mut self, state: SweepState) -> Self {
        self.state = state;
        self
    }

    /// Flag checked once before every step.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn alerts(&self) -> u64 {
        self.alerts
    }

    pub fn missed_echoes(&self) -> u64 {
        self.missed_echoes
    }

    /// Perform one full step regardless of the cancel flag.
    ///
    /// On error the state is left where it was, so a later call retries the
    /// same angle.
    pub fn step(&mut self) -> Result<Sample> {
        let angle = self.state.current_angle();

        self.actuator
            .set_angle(angle)
            .map_err(|e| eyre::Report::new(map_actuator_error(&*e)))?;
        self.clock.sleep(self.cfg.settle);

        let distance_cm = match self.sensor.measure() {
            Ok(cm) => cm,
            Err(e) => match map_sensor_error(&*e) {
                RadarError::SensorTimeout => {
                    self.missed_echoes += 1;
                    trace!(angle, "no echo; reporting max range");
                    self.sensor.max_distance_cm()
                }
                other => return Err(eyre::Report::new(other)),
            },
        };
        if !distance_cm.is_finite() || distance_cm < 0.0 {
            return Err(eyre::Report::new(RadarError::HardwareFault(format!(
                "invalid distance reading {distance_cm}"
            ))));
        }

        let sample = Sample::new(angle, distance_cm, self.clock.now());
        self.samples += 1;
        debug!(angle, distance_cm, "sample");

        if let Some(alert) = AlertEvent::classify(&sample, self.cfg.alert_distance_cm) {
            self.alerts += 1;
            alert.log();
        }

        self.state.advance(self.cfg.step_deg);
        Ok(sample)
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Hand the hardware back, e.g. for teardown.
    pub fn into_parts(self) -> (S, A) {
        (self.sensor, self.actuator)
    }
}

impl<S: RangeSensor, A: SweepActuator, C: Clock> Iterator for SweepEngine<S, A, C> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_cancelled() {
            debug!(state = ?self.state, "sweep cancelled at step boundary");
            return None;
        }
        Some(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(mut st: SweepState, step: u8, n: usize) -> Vec<u8> {
        (0..n)
            .map(|_| {
                let a = st.current_angle();
                st.advance(step);
                a
            })
            .collect()
    }

    #[test]
    fn boundary_visited_once_then_flips() {
        let st = SweepState::new(170, Direction::Ascending);
        assert_eq!(walk(st, 5, 6), vec![170, 175, 180, 175, 170, 165]);
        let st = SweepState::new(10, Direction::Descending);
        assert_eq!(walk(st, 5, 5), vec![10, 5, 0, 5, 10]);
    }

    #[test]
    fn uneven_step_lands_on_boundaries() {
        let st = SweepState::new(166, Direction::Ascending);
        assert_eq!(walk(st, 7, 4), vec![166, 173, 180, 173]);
        let st = SweepState::new(3, Direction::Descending);
        assert_eq!(walk(st, 7, 3), vec![3, 0, 7]);
    }

    #[test]
    fn full_span_step_bounces() {
        assert_eq!(walk(SweepState::default(), 180, 4), vec![0, 180, 0, 180]);
        assert_eq!(walk(SweepState::default(), 200, 3), vec![0, 180, 0]);
    }

    #[test]
    fn zero_step_treated_as_one() {
        assert_eq!(walk(SweepState::default(), 0, 3), vec![0, 1, 2]);
    }

    #[test]
    fn clamps_start_angle() {
        let st = SweepState::new(250, Direction::Ascending);
        assert_eq!(st.current_angle(), MAX_ANGLE);
    }
}
