use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{echo_window, pulse_to_meters, wait_echo_idle, wait_while_with_timeout};

/// Max wait between the trigger pulse and the echo line going high.
const ECHO_START_TIMEOUT: Duration = Duration::from_millis(10);
/// Longer than the module's own ~38 ms no-target pulse.
const ECHO_IDLE_TIMEOUT: Duration = Duration::from_millis(60);
const TRIGGER_PULSE: Duration = Duration::from_micros(10);
const TRIGGER_SETTLE: Duration = Duration::from_micros(2);

/// Trigger/echo ultrasonic ranger (HC-SR04 and compatibles).
pub struct Hcsr04 {
    trigger: OutputPin,
    echo: InputPin,
    max_distance_m: f64,
    window: Duration,
    released: bool,
}

impl Hcsr04 {
    pub fn new(trigger_pin: u8, echo_pin: u8, max_distance_m: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let trigger = gpio
            .get(trigger_pin)
            .map_err(|e| HwError::Gpio(format!("trigger pin {trigger_pin}: {e}")))?
            .into_output_low();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| HwError::Gpio(format!("echo pin {echo_pin}: {e}")))?
            .into_input();
        Ok(Self {
            trigger,
            echo,
            max_distance_m,
            window: echo_window(max_distance_m),
            released: false,
        })
    }

    pub fn max_distance_m(&self) -> f64 {
        self.max_distance_m
    }

    /// One ranging cycle. Returns meters, or `EchoTimeout` when no echo
    /// arrives or it would put the target beyond `max_distance_m`.
    ///
    /// A pulse left over from the previous cycle (cut short by our window)
    /// is waited out first, so it is never read as this cycle's echo.
    pub fn measure_m(&mut self) -> Result<f64> {
        if self.released {
            return Err(HwError::Released);
        }

        let echo = &self.echo;
        wait_echo_idle(|| echo.is_high(), ECHO_IDLE_TIMEOUT)?;

        self.trigger.set_low();
        spin_for(TRIGGER_SETTLE);
        self.trigger.set_high();
        spin_for(TRIGGER_PULSE);
        self.trigger.set_low();

        wait_while_with_timeout(|| echo.is_low(), ECHO_START_TIMEOUT, Duration::ZERO)?;
        let pulse = wait_while_with_timeout(|| echo.is_high(), self.window, Duration::ZERO)?;

        let meters = pulse_to_meters(pulse);
        trace!(pulse_us = pulse.as_micros() as u64, meters, "hcsr04 echo");
        Ok(meters)
    }

    pub fn release(&mut self) {
        if !self.released {
            self.trigger.set_low();
            self.released = true;
        }
    }
}

#[inline]
fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
