#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core ppm dosing logic (hardware-agnostic).
//!
//! All hardware goes through the `ppm_traits` seams: two `DigitalInput`
//! buttons, an `AnalogInput` across the shunt and a `PowerOutput` for the
//! cell supply.
//!
//! ## Architecture
//!
//! - **Debounce**: settle-and-reread edge detection per button (`debounce`)
//! - **Sensor**: raw counts to volts and mA, leakage correction (`sensor`)
//! - **Calibration**: one-shot leakage baseline at power-on (`calibration`)
//! - **Accumulator**: windowed coulometric ppm estimate (`accumulator`)
//! - **Mode machine**: target selection, start lock and termination (`machine`)
//! - **Bench**: manual toggle-and-measure profile (`bench`)
//! - **Controller**: tick loop applying actions to hardware (`core`, `builder`)
//!
//! Time is `u64` milliseconds since the controller was built, read from an
//! injected `Clock` so tests and simulations can run in virtual time.

pub mod accumulator;
pub mod bench;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod core;
pub mod debounce;
pub mod error;
pub mod hw_error;
pub mod machine;
pub mod mocks;
pub mod runner;
pub mod sensor;
pub mod session;
pub mod status;

pub use accumulator::{DoseAccumulator, PPM_CELL_FACTOR, WindowReport};
pub use bench::BenchStation;
pub use builder::{
    Controller, ControllerBuilder, ControllerG, ControllerSettings, Missing, Set,
    build_controller,
};
pub use calibration::Calibration;
pub use config::{DebounceCfg, OperatingProfile, SamplingCfg, SensorCfg, TargetLimits};
pub use crate::core::ControllerCore;
pub use debounce::{Debouncer, Edge};
pub use error::{BuildError, PpmError};
pub use machine::{Action, ButtonEdges, ModeMachine};
pub use runner::{RunParams, RunSummary};
pub use sensor::{CurrentSensor, ShuntReading};
pub use session::{Mode, Session, wrap_step};
pub use status::{StatusEvent, StatusSink, TickStatus, TracingSink};
