//! Sweep samples, alert classification and the telemetry line format.

use std::fmt::Write as _;
use std::time::Instant;

/// One (angle, distance) observation. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    angle: u8,
    distance_cm: f64,
    timestamp: Instant,
}

impl Sample {
    /// `distance_cm` must be finite and non-negative.
    pub fn new(angle: u8, distance_cm: f64, timestamp: Instant) -> Self {
        debug_assert!(
            distance_cm.is_finite() && distance_cm >= 0.0,
            "distance out of domain: {distance_cm}"
        );
        Self {
            angle,
            distance_cm,
            timestamp,
        }
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn distance_cm(&self) -> f64 {
        self.distance_cm
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Append the wire form `"<angle>,<distance_cm:.2>\n"` to `buf`.
    pub fn encode_into(&self, buf: &mut String) {
        // Writing into a String cannot fail.
        let _ = writeln!(buf, "{},{:.2}", self.angle, self.distance_cm);
    }

    /// Wire form as an owned line.
    pub fn to_line(&self) -> String {
        let mut s = String::with_capacity(12);
        self.encode_into(&mut s);
        s
    }
}

/// A sample closer than the alert threshold. Derived, only ever logged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvent {
    pub angle: u8,
    pub distance_cm: f64,
}

impl AlertEvent {
    /// Strict less-than: a reading exactly at the threshold is not an alert.
    pub fn classify(sample: &Sample, threshold_cm: f64) -> Option<Self> {
        (sample.distance_cm < threshold_cm).then_some(Self {
            angle: sample.angle,
            distance_cm: sample.distance_cm,
        })
    }

    pub fn log(&self) {
        tracing::warn!(
            angle = self.angle,
            distance_cm = self.distance_cm.round(),
            "object detected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(angle: u8, cm: f64) -> Sample {
        Sample::new(angle, cm, Instant::now())
    }

    #[test]
    fn wire_line_rounds_to_two_decimals() {
        assert_eq!(at(90, 12.345).to_line(), "90,12.35\n");
    }

    #[rstest]
    #[case(0, 0.0, "0,0.00\n")]
    #[case(180, 100.0, "180,100.00\n")]
    #[case(5, 7.004, "5,7.00\n")]
    #[case(45, 33.999, "45,34.00\n")]
    fn wire_line_cases(#[case] angle: u8, #[case] cm: f64, #[case] line: &str) {
        assert_eq!(at(angle, cm).to_line(), line);
    }

    #[test]
    fn encode_appends() {
        let mut buf = String::new();
        at(1, 1.0).encode_into(&mut buf);
        at(2, 2.0).encode_into(&mut buf);
        assert_eq!(buf, "1,1.00\n2,2.00\n");
    }

    #[rstest]
    #[case(39.99, true)]
    #[case(40.0, false)]
    #[case(40.01, false)]
    #[case(0.0, true)]
    fn alert_is_strictly_below_threshold(#[case] cm: f64, #[case] alert: bool) {
        assert_eq!(AlertEvent::classify(&at(10, cm), 40.0).is_some(), alert);
    }
}
