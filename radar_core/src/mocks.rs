//! Scripted and spying hardware for tests and dry runs.
//!
//! Each mock hands out shared handles (`Arc` counters) so a test can keep
//! observing it after ownership moved into an engine or controller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use radar_traits::{AuthPrompt, BoxError, RangeSensor, SweepActuator};

use crate::error::RadarError;

/// One scripted sensor outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Echo(f64),
    NoEcho,
    Fault(&'static str),
}

/// Sensor that replays a script, then repeats a fallback reading.
#[derive(Debug)]
pub struct ScriptedSensor {
    script: VecDeque<Reading>,
    fallback: Reading,
    max_distance_cm: f64,
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Reading::NoEcho,
            max_distance_cm: 100.0,
            reads: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always reports `cm`.
    pub fn constant(cm: f64) -> Self {
        Self::new([]).with_fallback(Reading::Echo(cm))
    }

    pub fn with_fallback(mut self, r: Reading) -> Self {
        self.fallback = r;
        self
    }

    pub fn with_max_distance_cm(mut self, cm: f64) -> Self {
        self.max_distance_cm = cm;
        self
    }

    pub fn reads(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }

    pub fn releases(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }
}

impl RangeSensor for ScriptedSensor {
    fn measure(&mut self) -> Result<f64, BoxError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.script.pop_front().unwrap_or(self.fallback) {
            Reading::Echo(cm) => Ok(cm),
            Reading::NoEcho => Err(Box::new(RadarError::SensorTimeout)),
            Reading::Fault(msg) => Err(msg.into()),
        }
    }

    fn max_distance_cm(&self) -> f64 {
        self.max_distance_cm
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.releases.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Actuator that records every commanded angle. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SpyActuator {
    angles: Arc<Mutex<Vec<u8>>>,
    detaches: Arc<AtomicUsize>,
    fail_detach: bool,
}

impl SpyActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `detach` call returns an error (after being counted).
    pub fn failing_detach(mut self) -> Self {
        self.fail_detach = true;
        self
    }

    pub fn angles(&self) -> Vec<u8> {
        self.angles.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::Relaxed)
    }
}

impl SweepActuator for SpyActuator {
    fn set_angle(&mut self, angle_deg: u8) -> Result<(), BoxError> {
        if let Ok(mut a) = self.angles.lock() {
            a.push(angle_deg);
        }
        Ok(())
    }

    fn detach(&mut self) -> Result<(), BoxError> {
        self.detaches.fetch_add(1, Ordering::Relaxed);
        if self.fail_detach {
            return Err("servo driver unavailable".into());
        }
        Ok(())
    }
}

/// Prompt that always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedPrompt {
    answer: String,
    asked: Arc<AtomicUsize>,
}

impl FixedPrompt {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn asked(&self) -> Arc<AtomicUsize> {
        self.asked.clone()
    }
}

impl AuthPrompt for FixedPrompt {
    fn obtain_secret(&mut self) -> Result<String, BoxError> {
        self.asked.fetch_add(1, Ordering::Relaxed);
        Ok(self.answer.clone())
    }
}
