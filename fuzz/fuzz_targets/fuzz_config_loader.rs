#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(mut cfg) = radar_config::load_toml(data) else {
        return;
    };
    let _ = cfg.validate();

    // Feed the same bytes through the env override path.
    let first_line = data.lines().next().unwrap_or_default().to_string();
    let _ = cfg.apply_env(|k| match k {
        radar_config::ENV_TCP_PORT | radar_config::ENV_REQUIRE_PASSWORD => {
            Some(first_line.clone())
        }
        _ => None,
    });
    let _ = cfg.validate();
});
