//! Hardware and operator boundaries for the ranging controller.
//!
//! Everything the core touches outside of its own memory goes through one of
//! these traits, so drivers can be swapped for simulation in tests.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single distance measurement source.
pub trait RangeSensor {
    /// One measurement in centimeters.
    ///
    /// Must return within the max-range window. A missing echo must be reported
    /// with a typed timeout error (`RadarError::SensorTimeout` or the driver's
    /// own echo-timeout variant); any other error is treated as a hardware
    /// fault and stops the sweep.
    fn measure(&mut self) -> Result<f64, BoxError>;

    /// Configured maximum range, in centimeters.
    fn max_distance_cm(&self) -> f64;

    /// Release pins/resources. Idempotent.
    fn release(&mut self) -> Result<(), BoxError>;
}

/// A position-controllable servo.
pub trait SweepActuator {
    /// Latch a new position in degrees (0..=180). Does not wait for settling.
    fn set_angle(&mut self, angle_deg: u8) -> Result<(), BoxError>;

    /// Stop driving the servo. Idempotent.
    fn detach(&mut self) -> Result<(), BoxError>;
}

/// Source of the operator-entered activation secret.
pub trait AuthPrompt {
    fn obtain_secret(&mut self) -> Result<String, BoxError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn measure(&mut self) -> Result<f64, BoxError> {
        (**self).measure()
    }
    fn max_distance_cm(&self) -> f64 {
        (**self).max_distance_cm()
    }
    fn release(&mut self) -> Result<(), BoxError> {
        (**self).release()
    }
}

impl<T: SweepActuator + ?Sized> SweepActuator for Box<T> {
    fn set_angle(&mut self, angle_deg: u8) -> Result<(), BoxError> {
        (**self).set_angle(angle_deg)
    }
    fn detach(&mut self) -> Result<(), BoxError> {
        (**self).detach()
    }
}

impl<T: AuthPrompt + ?Sized> AuthPrompt for Box<T> {
    fn obtain_secret(&mut self) -> Result<String, BoxError> {
        (**self).obtain_secret()
    }
}
