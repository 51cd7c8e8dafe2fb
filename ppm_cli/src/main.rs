//! `ppm`: command-line front end for the ppm dosing controller.

mod cli;
mod error_fmt;
mod run;
mod sink;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use ppm_config::Config;
use ppm_core::error::PpmError;
use ppm_core::{OperatingProfile, RunParams};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() -> ExitCode {
    let hook = hook_warning(color_eyre::install());
    let cli = Cli::parse();

    match real_main(&cli, hook.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "ppm failed");
            if cli.json {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

/// Reported once logging is up; a missing hook only degrades error rendering.
fn hook_warning(installed: eyre::Result<()>) -> Option<String> {
    installed.err().map(|e| format!("{e:#}"))
}

fn real_main(cli: &Cli, hook_error: Option<&str>) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    let _log_guard = init_tracing(cli, &cfg)?;
    if let Some(error) = hook_error {
        tracing::warn!(error, "color-eyre report hook not installed");
    }
    tracing::info!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Run {
            trace,
            virtual_time,
            profile,
            max_ticks,
        } => {
            let profile: OperatingProfile =
                profile.map_or_else(|| cfg.runner.profile.into(), Into::into);
            let clock = run::SharedClock::new(*virtual_time);
            let devices = run::open_devices(&cfg, trace.as_deref(), &clock)?;
            let mut ctrl = run::build(devices, run::settings(&cfg, profile), &clock, cli.json)?;

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                .wrap_err("install Ctrl-C handler")?;

            let mut params = RunParams::from(&cfg.runner);
            params.max_ticks = *max_ticks;
            run::run_controller(&mut ctrl, params, &shutdown, cli.json)?;
            Ok(())
        }
        Commands::SelfCheck { trace } => {
            let clock = run::SharedClock::new(trace.is_some());
            let devices = run::open_devices(&cfg, trace.as_deref(), &clock)?;
            let settings = ppm_core::ControllerSettings {
                calibration_offset_ma: None,
                ..run::settings(&cfg, cfg.runner.profile.into())
            };
            let mut ctrl = run::build(devices, settings, &clock, cli.json)?;
            run::self_check(&mut ctrl, cli.json)?;
            Ok(())
        }
    }
}

/// Read, parse and validate the TOML config. Every failure is a config error.
fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = ppm_config::load_toml(&text)
        .map_err(|e| eyre::Report::new(PpmError::Config(e.to_string())))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(PpmError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays reserved for status output.
/// An optional JSON-lines log file is configured under `[logging]`; the
/// returned guard flushes it when dropped.
fn init_tracing(cli: &Cli, cfg: &Config) -> eyre::Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    let mut guard = None;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    });

    if let Some(file) = &cfg.logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().ok_or_else(|| {
            PpmError::Config(format!("logging.file has no file name: {file}"))
        })?;
        let appender = match cfg.logging.rotation.as_deref().unwrap_or("never") {
            "never" => tracing_appender::rolling::never(dir, name),
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            other => {
                return Err(PpmError::Config(format!(
                    "logging.rotation must be never, daily or hourly (got {other})"
                ))
                .into());
            }
        };
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        let level = cfg.logging.level.as_deref().unwrap_or("info");
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::try_new(level)?)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}
