//! Human-readable error descriptions and structured JSON error formatting.

use radar_core::error::{BuildError, RadarError};

/// Stable name for a fault class, used as the JSON `reason`.
pub fn fault_name(e: &RadarError) -> &'static str {
    match e {
        RadarError::SensorTimeout => "SensorTimeout",
        RadarError::AcceptTimeout { .. } => "AcceptTimeout",
        RadarError::PeerDisconnected => "PeerDisconnected",
        RadarError::WriteTimeout { .. } => "WriteTimeout",
        RadarError::ActivationDenied => "ActivationDenied",
        RadarError::Hardware(_) => "Hardware",
        RadarError::HardwareFault(_) => "HardwareFault",
        RadarError::Io(_) => "Io",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingHardware => {
                "What happened: No hardware was provided to the controller.\nLikely causes: The sensor/servo factory was not wired into the builder.\nHow to fix: Pass a factory via with_hardware(...).".to_string()
            }
            BuildError::MissingPrompt => {
                "What happened: An activation secret is configured but there is no way to ask for it.\nLikely causes: The controller was built without a prompt.\nHow to fix: Provide a prompt via with_prompt(...), or unset [gate].secret.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/radar_config.toml for a sample."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RadarError>() {
        return match re {
            RadarError::ActivationDenied => "What happened: Activation was denied.\nLikely causes: The entered secret did not match [gate].secret or RADAR_PASSWORD.\nHow to fix: Re-run and enter the correct secret, or disable the gate with RADAR_REQUIRE_PASSWORD=0.".to_string(),
            RadarError::AcceptTimeout { timeout_ms } => format!(
                "What happened: No telemetry consumer connected within {timeout_ms} ms.\nLikely causes: The viewer was not started, or it points at the wrong host/port.\nHow to fix: Start the consumer first, check --host/--port, or raise network.accept_timeout_ms."
            ),
            RadarError::PeerDisconnected => "What happened: The telemetry consumer disconnected.\nLikely causes: The viewer was closed or the network dropped.\nHow to fix: Restart the controller and reconnect the consumer.".to_string(),
            RadarError::WriteTimeout { timeout_ms } => format!(
                "What happened: Sending telemetry stalled for more than {timeout_ms} ms.\nLikely causes: The consumer stopped reading or the link is congested.\nHow to fix: Check the consumer, or raise network.write_timeout_ms."
            ),
            RadarError::Hardware(msg) => format!(
                "What happened: Failed to initialize hardware ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
            ),
            RadarError::HardwareFault(msg) => format!(
                "What happened: The sensor or servo failed mid-sweep ({msg}).\nLikely causes: Loose wiring, power brown-out, or a released device.\nHow to fix: Check TRIG/ECHO and servo wiring and the 5V supply, then run `radar self-check`."
            ),
            RadarError::SensorTimeout => "What happened: The sensor produced no echo.\nLikely causes: Nothing within range, or the ECHO pin is miswired.\nHow to fix: Verify wiring with `radar self-check` while holding an object in front of the sensor.".to_string(),
            RadarError::Io(msg) => format!(
                "What happened: A network operation failed ({msg}).\nLikely causes: The port is already in use or the host address is not local.\nHow to fix: Pick another --port or check [network].host."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        let detail = te.message();
        return format!(
            "What happened: Configuration is invalid or incomplete ({detail}).\nLikely causes: Missing [pins] (trigger, echo, servo), or a malformed TOML value.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config pointing at a readable TOML file (see etc/radar_config.toml)."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("radar_tcp_port") {
        let cause = err.root_cause();
        return format!(
            "What happened: Invalid configuration ({cause}).\nLikely causes: Out-of-range values in the TOML or a bad RADAR_* environment variable.\nHow to fix: Edit the config or environment, then rerun."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map fault classes to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<RadarError>() {
        Some(RadarError::ActivationDenied) => 2,
        Some(RadarError::AcceptTimeout { .. }) => 3,
        Some(RadarError::PeerDisconnected) => 4,
        Some(RadarError::WriteTimeout { .. }) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(re) = err.downcast_ref::<RadarError>() {
        let msg = humanize(err);
        let obj = match re {
            RadarError::AcceptTimeout { timeout_ms } | RadarError::WriteTimeout { timeout_ms } => {
                json!({
                    "reason": fault_name(re),
                    "details": { "timeout_ms": timeout_ms },
                    "message": msg,
                })
            }
            _ => json!({ "reason": fault_name(re), "message": msg }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
