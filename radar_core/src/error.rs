use thiserror::Error;

/// Fault taxonomy of the ranging controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RadarError {
    /// No echo inside the max-range window. Recovered inside the sweep engine.
    #[error("sensor timeout: no echo within max range")]
    SensorTimeout,
    #[error("no telemetry consumer connected within {timeout_ms} ms")]
    AcceptTimeout { timeout_ms: u64 },
    #[error("telemetry peer disconnected")]
    PeerDisconnected,
    #[error("telemetry write timed out after {timeout_ms} ms")]
    WriteTimeout { timeout_ms: u64 },
    #[error("activation denied: secret mismatch")]
    ActivationDenied,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing hardware factory")]
    MissingHardware,
    #[error("activation gate needs a secret prompt but none was provided")]
    MissingPrompt,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
