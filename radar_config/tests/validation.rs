use std::collections::HashMap;

use radar_config::load_toml;
use rstest::rstest;

const MINIMAL: &str = r#"
[pins]
trigger = 6
echo = 13
servo = 5
"#;

#[test]
fn defaults_match_reference_controller() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.sweep.step_deg, 5);
    assert_eq!(cfg.sweep.settle_ms, 50);
    assert_eq!(cfg.sweep.alert_distance_cm, 40.0);
    assert_eq!(cfg.sensor.max_distance_m, 1.0);
    assert_eq!(cfg.network.host, "127.0.0.1");
    assert_eq!(cfg.network.port, 5005);
    assert_eq!(cfg.network.accept_timeout_ms, 60_000);
    assert_eq!(cfg.network.write_timeout_ms, 5_000);
    assert!(cfg.gate.required);
    assert_eq!(cfg.gate.configured_secret(), None);
}

#[test]
fn missing_pins_is_a_parse_error() {
    assert!(load_toml("[sweep]\nstep_deg = 5\n").is_err());
}

#[rstest]
#[case("[sweep]\nstep_deg = 0", "step_deg must be in [1, 180]")]
#[case("[sweep]\nstep_deg = 181", "step_deg must be in [1, 180]")]
#[case("[sweep]\nsettle_ms = 20000", "settle_ms is unreasonably large")]
#[case("[sweep]\nalert_distance_cm = -1.0", "alert_distance_cm must be")]
#[case("[sensor]\nmax_distance_m = 0.0", "max_distance_m must be in")]
#[case("[sensor]\nmax_distance_m = 5.0", "max_distance_m must be in")]
#[case("[network]\nhost = \"  \"", "host must not be empty")]
#[case("[network]\naccept_timeout_ms = 0", "accept_timeout_ms must be >= 1")]
#[case("[network]\nwrite_timeout_ms = 0", "write_timeout_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_out_of_range(#[case] extra: &str, #[case] needle: &str) {
    let toml = format!("{MINIMAL}\n{extra}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rejects_shared_pins() {
    let cfg = load_toml("[pins]\ntrigger = 6\necho = 6\nservo = 5\n").unwrap();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("pins must be distinct"));
}

#[test]
fn env_overrides_take_precedence() {
    let mut cfg = load_toml(&format!(
        "{MINIMAL}\n[gate]\nrequired = false\nsecret = \"from-file\"\n"
    ))
    .unwrap();
    let env: HashMap<&str, &str> = [
        ("RADAR_TCP_HOST", "0.0.0.0"),
        ("RADAR_TCP_PORT", "6006"),
        ("RADAR_REQUIRE_PASSWORD", "yes"),
        ("RADAR_PASSWORD", "X123"),
    ]
    .into_iter()
    .collect();

    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

    assert_eq!(cfg.network.host, "0.0.0.0");
    assert_eq!(cfg.network.port, 6006);
    assert!(cfg.gate.required);
    assert_eq!(cfg.gate.configured_secret(), Some("X123"));
}

#[test]
fn absent_env_leaves_file_values() {
    let mut cfg = load_toml(MINIMAL).unwrap();
    cfg.apply_env(|_| None).unwrap();
    assert_eq!(cfg.network.port, 5005);
    assert!(cfg.gate.required);
}

#[test]
fn bad_env_port_is_reported() {
    let mut cfg = load_toml(MINIMAL).unwrap();
    let err = cfg
        .apply_env(|k| (k == "RADAR_TCP_PORT").then(|| "radar".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("RADAR_TCP_PORT"));
}
