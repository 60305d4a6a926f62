#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core radar logic (hardware-agnostic).
//!
//! All hardware interactions go through `radar_traits::RangeSensor` and
//! `radar_traits::SweepActuator`; the operator secret comes from
//! `radar_traits::AuthPrompt`.
//!
//! ## Architecture
//!
//! - **Sweep**: 0°↔180° state machine producing one `Sample` per step (`sweep`)
//! - **Samples**: wire encoding `"<angle>,<distance:.2>\n"` and proximity alerts (`sample`)
//! - **Gates**: operator activation and single-client TCP accept (`gate`)
//! - **Telemetry**: write-timeout bounded sample streaming (`telemetry`)
//! - **Controller**: lifecycle composition and guarded teardown (`controller`)

pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod gate;
pub mod hw_error;
pub mod mocks;
pub mod sample;
pub mod sweep;
pub mod telemetry;

pub use config::{NetworkCfg, SweepCfg};
pub use controller::{
    Activated, Controller, ControllerBuilder, RunSummary, StopReason, Teardown, TeardownReport,
    TeardownStep, teardown,
};
pub use error::{BuildError, RadarError, Report, Result};
pub use gate::{Activation, ActivationGate, ConnectionGate, ConnectionSession};
pub use sample::{AlertEvent, Sample};
pub use sweep::{Direction, SweepEngine, SweepState};
pub use telemetry::TelemetryLink;
