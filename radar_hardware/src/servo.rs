use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::angle_to_command;

/// 50 Hz frame used by hobby servos.
const FRAME: Duration = Duration::from_millis(20);
/// Pulse width at command 0.0; ±HALF_SPAN reaches the -1.0/+1.0 ends.
const MID_PULSE_US: f64 = 1500.0;
const HALF_SPAN_US: f64 = 500.0;

/// Hobby servo driven by rppal software PWM.
pub struct PwmServo {
    pin: OutputPin,
    attached: bool,
}

impl PwmServo {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("servo pin {pin}: {e}")))?
            .into_output_low();
        Ok(Self {
            pin,
            attached: false,
        })
    }

    pub fn set_angle(&mut self, angle_deg: u8) -> Result<()> {
        let pulse = pulse_for(angle_deg);
        self.pin
            .set_pwm(FRAME, pulse)
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        self.attached = true;
        trace!(angle_deg, pulse_us = pulse.as_micros() as u64, "servo pwm");
        Ok(())
    }

    pub fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.attached = false;
        self.pin
            .clear_pwm()
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        self.pin.set_low();
        Ok(())
    }
}

fn pulse_for(angle_deg: u8) -> Duration {
    let us = MID_PULSE_US + angle_to_command(angle_deg) * HALF_SPAN_US;
    Duration::from_micros(us.round() as u64)
}
