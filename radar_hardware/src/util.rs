use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Speed of sound in dry air at ~20 °C.
pub const SPEED_OF_SOUND_M_S: f64 = 343.0;

/// Spin (or sleep, when `poll_interval` is non-zero) while `cond` holds,
/// failing with `EchoTimeout` once `timeout` elapses. Returns how long it waited.
pub fn wait_while_with_timeout(
    mut cond: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let start = Instant::now();
    let deadline = start + timeout;
    while cond() {
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(start.elapsed())
}

/// Wait for a leftover echo pulse to end before the next trigger.
/// A line that stays high for longer than `bound` is `EchoStuck`.
pub fn wait_echo_idle(is_high: impl FnMut() -> bool, bound: Duration) -> Result<()> {
    match wait_while_with_timeout(is_high, bound, Duration::ZERO) {
        Ok(_) => Ok(()),
        Err(HwError::EchoTimeout) => Err(HwError::EchoStuck),
        Err(e) => Err(e),
    }
}

/// Longest echo pulse that still corresponds to a target within `max_distance_m`.
pub fn echo_window(max_distance_m: f64) -> Duration {
    Duration::from_secs_f64((2.0 * max_distance_m.max(0.0)) / SPEED_OF_SOUND_M_S)
}

/// Distance in meters for an echo pulse of the given width.
#[inline]
pub fn pulse_to_meters(pulse: Duration) -> f64 {
    pulse.as_secs_f64() * SPEED_OF_SOUND_M_S / 2.0
}

/// Map 0..=180 degrees linearly onto the servo command range [-1.0, 1.0].
/// Angles above 180 are clamped.
#[inline]
pub fn angle_to_command(angle_deg: u8) -> f64 {
    (f64::from(angle_deg.min(180)) - 90.0) / 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_endpoints_and_centre() {
        assert_eq!(angle_to_command(0), -1.0);
        assert_eq!(angle_to_command(90), 0.0);
        assert_eq!(angle_to_command(180), 1.0);
        assert_eq!(angle_to_command(255), 1.0);
        assert!((angle_to_command(45) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn idle_echo_line_passes_after_pulse_ends() {
        let mut polls = 0;
        let res = wait_echo_idle(
            || {
                polls += 1;
                polls < 4
            },
            Duration::from_millis(100),
        );
        assert!(res.is_ok());
        assert_eq!(polls, 4);
    }

    #[test]
    fn echo_line_stuck_high_is_reported() {
        let err = wait_echo_idle(|| true, Duration::from_millis(2)).unwrap_err();
        assert!(matches!(err, HwError::EchoStuck));
    }

    #[test]
    fn one_meter_round_trip_window() {
        let w = echo_window(1.0);
        // 2 m / 343 m/s ≈ 5.83 ms
        assert!(w > Duration::from_micros(5800) && w < Duration::from_micros(5900));
        assert!((pulse_to_meters(w) - 1.0).abs() < 1e-9);
    }
}
