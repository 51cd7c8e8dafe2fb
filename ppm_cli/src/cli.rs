//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ppm", version, about = "Electrolytic ppm dosing controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/ppm_config.toml")]
    pub config: PathBuf,

    /// Print status events and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Operating profile override.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProfileArg {
    /// Select targets with the buttons, then dose until the target is reached
    Dosing,
    /// Toggle the output with the change-value button and log measurements
    Bench,
}

impl From<ProfileArg> for ppm_core::OperatingProfile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Dosing => Self::Dosing,
            ProfileArg::Bench => Self::Bench,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate, then run the controller until finished or interrupted
    Run {
        /// Replay button levels and shunt readings from a CSV trace
        /// (t_ms,change_value,advance,raw) instead of real hardware
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
        /// Run on a virtual clock: sleeps return immediately
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Run on a virtual clock.\n\nThe settle pause, tick period and sampling interval advance simulated time instead of sleeping, so a trace describing a multi-minute dose finishes in milliseconds. Intended for traces; real hardware keeps real time."
        )]
        virtual_time: bool,
        /// Operating profile (overrides runner.profile from the config)
        #[arg(long, value_enum, value_name = "PROFILE")]
        profile: Option<ProfileArg>,
        /// Stop after this many controller ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
    },
    /// Open the devices, measure the leakage baseline and print it
    SelfCheck {
        /// Use a CSV trace instead of real hardware
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },
}
