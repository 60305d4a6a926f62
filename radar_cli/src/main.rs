#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod error_fmt;
mod prompt;
mod run;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use radar_config::{Config, Logging};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "radar exited with error");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let loaded = load_config(&cli.config);
    let logging = loaded.as_ref().map(|c| &c.logging).ok();
    init_tracing(cli.json, &cli.log_level, logging)?;
    let mut cfg = loaded?;

    cfg.apply_env(|k| std::env::var(k).ok())
        .wrap_err("invalid configuration")?;

    match cli.cmd {
        Commands::Run {
            host,
            port,
            accept_timeout_ms,
        } => {
            if let Some(h) = host {
                cfg.network.host = h;
            }
            if let Some(p) = port {
                cfg.network.port = p;
            }
            if let Some(ms) = accept_timeout_ms {
                cfg.network.accept_timeout_ms = ms;
            }
            cfg.validate().wrap_err("invalid configuration")?;

            let summary = run::run_radar(&cfg)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "stopped",
                        "activation": format!("{:?}", summary.activation),
                        "samples_sent": summary.samples_sent,
                        "alerts": summary.alerts,
                    })
                );
            } else {
                println!(
                    "stopped: sent {} samples, {} alerts",
                    summary.samples_sent, summary.alerts
                );
            }
        }
        Commands::SelfCheck => {
            cfg.validate().wrap_err("invalid configuration")?;
            let r = run::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "angle": r.angle,
                        "distance_cm": r.distance_cm,
                    })
                );
            } else {
                match r.distance_cm {
                    Some(cm) => println!("self-check ok: angle={} distance_cm={cm:.2}", r.angle),
                    None => println!("self-check ok: angle={} no echo", r.angle),
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    radar_config::load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}

/// Console layer (pretty or JSON) plus an optional JSON-lines file layer.
///
/// Level precedence: `RUST_LOG`, then `--log-level`, then `[logging].level`
/// when `--log-level` was left at its default.
fn init_tracing(json: bool, cli_level: &str, logging: Option<&Logging>) -> eyre::Result<()> {
    let level = match logging.and_then(|l| l.level.as_deref()) {
        Some(file_level) if cli_level == "info" => file_level,
        _ => cli_level,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    layers.push(if json {
        console.json().boxed()
    } else {
        console.boxed()
    });

    if let Some(path) = logging.and_then(|l| l.file.as_deref()) {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
        let appender = match logging.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    Ok(())
}
