#[cfg(feature = "hardware")]
pub mod hcsr04;
#[cfg(feature = "hardware")]
pub mod servo;

pub mod error;
pub mod util;

use radar_traits::{BoxError, RangeSensor, SweepActuator};
use std::cell::Cell;
use std::rc::Rc;

use crate::error::HwError;

/// A reflector in the simulated field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Inclusive angular extent in degrees.
    pub from_deg: u8,
    pub to_deg: u8,
    pub distance_cm: f64,
}

/// Static field of view for the simulation backend.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    obstacles: Vec<Obstacle>,
}

impl Scene {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// A near object left of centre and a wall further right.
    pub fn demo() -> Self {
        Self::new(vec![
            Obstacle {
                from_deg: 60,
                to_deg: 80,
                distance_cm: 30.0,
            },
            Obstacle {
                from_deg: 140,
                to_deg: 170,
                distance_cm: 75.0,
            },
        ])
    }

    /// Nearest obstacle covering `angle`, if any.
    pub fn range_at(&self, angle_deg: u8) -> Option<f64> {
        self.obstacles
            .iter()
            .filter(|o| (o.from_deg..=o.to_deg).contains(&angle_deg))
            .map(|o| o.distance_cm)
            .min_by(f64::total_cmp)
    }
}

/// Simulated ranger that reads the servo position shared with `SimulatedServo`.
pub struct SimulatedSensor {
    scene: Scene,
    angle: Rc<Cell<u8>>,
    max_distance_cm: f64,
    released: bool,
}

/// Simulated servo; publishes its commanded angle to the paired sensor.
pub struct SimulatedServo {
    angle: Rc<Cell<u8>>,
    attached: bool,
}

/// Build a sensor/servo pair that share one simulated shaft.
pub fn simulated_pair(scene: Scene, max_distance_m: f64) -> (SimulatedSensor, SimulatedServo) {
    let angle = Rc::new(Cell::new(90));
    let sensor = SimulatedSensor {
        scene,
        angle: angle.clone(),
        max_distance_cm: max_distance_m * 100.0,
        released: false,
    };
    let servo = SimulatedServo {
        angle,
        attached: false,
    };
    (sensor, servo)
}

impl SimulatedSensor {
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl SimulatedServo {
    pub fn angle(&self) -> u8 {
        self.angle.get()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl RangeSensor for SimulatedSensor {
    fn measure(&mut self) -> Result<f64, BoxError> {
        if self.released {
            return Err(Box::new(HwError::Released));
        }
        match self.scene.range_at(self.angle.get()) {
            Some(cm) if cm <= self.max_distance_cm => Ok(cm),
            _ => Err(Box::new(HwError::EchoTimeout)),
        }
    }

    fn max_distance_cm(&self) -> f64 {
        self.max_distance_cm
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.released = true;
        Ok(())
    }
}

impl SweepActuator for SimulatedServo {
    fn set_angle(&mut self, angle_deg: u8) -> Result<(), BoxError> {
        let angle = angle_deg.min(180);
        self.angle.set(angle);
        self.attached = true;
        tracing::trace!(
            angle_deg = angle,
            command = util::angle_to_command(angle),
            "servo set (simulated)"
        );
        Ok(())
    }

    fn detach(&mut self) -> Result<(), BoxError> {
        if self.attached {
            tracing::debug!("servo detached (simulated)");
        }
        self.attached = false;
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub struct HardwareSensor {
    inner: hcsr04::Hcsr04,
}

#[cfg(feature = "hardware")]
impl HardwareSensor {
    pub fn try_new(trigger_pin: u8, echo_pin: u8, max_distance_m: f64) -> error::Result<Self> {
        Ok(Self {
            inner: hcsr04::Hcsr04::new(trigger_pin, echo_pin, max_distance_m)?,
        })
    }
}

#[cfg(feature = "hardware")]
impl RangeSensor for HardwareSensor {
    fn measure(&mut self) -> Result<f64, BoxError> {
        match self.inner.measure_m() {
            Ok(m) => {
                tracing::debug!(distance_cm = m * 100.0, "range sample");
                Ok(m * 100.0)
            }
            Err(e) => Err(Box::new(e)),
        }
    }

    fn max_distance_cm(&self) -> f64 {
        self.inner.max_distance_m() * 100.0
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.inner.release();
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub struct HardwareServo {
    inner: servo::PwmServo,
}

#[cfg(feature = "hardware")]
impl HardwareServo {
    pub fn try_new(pin: u8) -> error::Result<Self> {
        Ok(Self {
            inner: servo::PwmServo::new(pin)?,
        })
    }
}

#[cfg(feature = "hardware")]
impl SweepActuator for HardwareServo {
    fn set_angle(&mut self, angle_deg: u8) -> Result<(), BoxError> {
        self.inner.set_angle(angle_deg).map_err(Into::into)
    }

    fn detach(&mut self) -> Result<(), BoxError> {
        self.inner.detach().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_position_drives_sensor_reading() {
        let (mut sensor, mut servo) = simulated_pair(Scene::demo(), 1.0);
        servo.set_angle(70).unwrap();
        assert_eq!(sensor.measure().unwrap(), 30.0);
        servo.set_angle(10).unwrap();
        assert!(sensor.measure().is_err());
    }

    #[test]
    fn beyond_max_range_is_no_echo() {
        let (mut sensor, mut servo) = simulated_pair(Scene::demo(), 0.5);
        servo.set_angle(150).unwrap();
        let err = sensor.measure().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::EchoTimeout)
        ));
    }
}
