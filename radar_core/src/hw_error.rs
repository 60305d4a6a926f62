//! Maps `Box<dyn Error>` from trait boundaries to typed `RadarError`.
//!
//! The traits in `radar_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed enum, with an optional feature-gated path for
//! `radar_hardware::HwError` downcasting.

use crate::error::RadarError;

/// Map a sensor error. A missed echo becomes `SensorTimeout`, which the sweep
/// engine recovers from; everything else is a `HardwareFault`.
///
/// With `hardware-errors` on, only typed timeouts (`RadarError::SensorTimeout`
/// or `HwError::EchoTimeout`) count as a missed echo. Without it there is no
/// typed path for driver errors, so a message mentioning "timeout" is taken
/// as one.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> RadarError {
    if let Some(r) = e.downcast_ref::<RadarError>() {
        return r.clone();
    }

    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<radar_hardware::error::HwError>() {
            return match hw {
                radar_hardware::error::HwError::EchoTimeout => RadarError::SensorTimeout,
                other => RadarError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    #[cfg(not(feature = "hardware-errors"))]
    {
        if s.to_lowercase().contains("timeout") {
            return RadarError::SensorTimeout;
        }
    }
    RadarError::HardwareFault(s)
}

/// Map an actuator error. Actuator failures are never recoverable.
pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> RadarError {
    if let Some(r) = e.downcast_ref::<RadarError>() {
        return r.clone();
    }
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<radar_hardware::error::HwError>() {
            return RadarError::HardwareFault(hw.to_string());
        }
    }
    RadarError::HardwareFault(e.to_string())
}
