//! Drives a controller from power-on to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ppm_traits::{AnalogInput, DigitalInput, PowerOutput};

use crate::core::ControllerCore;
use crate::error::Result as CoreResult;
use crate::session::Mode;
use crate::status::TickStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Pause between ticks, slept on the controller's clock.
    pub tick_ms: u64,
    /// Stop after this many ticks even if not finished.
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            max_ticks: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Final dosing mode; `None` for the bench profile.
    pub final_mode: Option<Mode>,
    pub elapsed_ppm: f32,
    pub elapsed_minutes: f32,
    pub ticks: u64,
}

impl RunSummary {
    pub fn finished(&self) -> bool {
        self.final_mode == Some(Mode::Finished)
    }
}

/// Calibrate (unless already done or pinned), then tick every `tick_ms` until
/// the target is reached, `shutdown` is set or `max_ticks` is hit. The output
/// is switched off on every exit path.
pub fn run<C, V, A, O>(
    ctrl: &mut ControllerCore<C, V, A, O>,
    params: RunParams,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    if !ctrl.is_calibrated()
        && let Err(e) = ctrl.calibrate()
    {
        ctrl.shutdown();
        tracing::error!(error = %e, "calibration failed");
        return Err(e);
    }

    let period = Duration::from_millis(params.tick_ms.max(1));
    let profile = ctrl.profile();
    tracing::info!(?profile, tick_ms = params.tick_ms, "controller loop start");

    let mut ticks: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(ticks, "shutdown requested");
            break;
        }
        if params.max_ticks.is_some_and(|max| ticks >= max) {
            tracing::info!(ticks, "tick limit reached");
            break;
        }

        let status = match ctrl.tick() {
            Ok(s) => s,
            Err(e) => {
                ctrl.shutdown();
                tracing::error!(error = %e, ticks, "controller tick failed");
                return Err(e);
            }
        };
        ticks += 1;
        if status == TickStatus::Finished {
            break;
        }
        ctrl.sleep(period);
    }

    ctrl.shutdown();
    let summary = RunSummary {
        final_mode: ctrl.mode(),
        elapsed_ppm: ctrl.elapsed_ppm(),
        elapsed_minutes: ctrl.elapsed_minutes(),
        ticks,
    };
    tracing::info!(
        final_mode = ?summary.final_mode,
        elapsed_ppm = summary.elapsed_ppm,
        elapsed_minutes = summary.elapsed_minutes,
        ticks,
        "controller loop done"
    );
    Ok(summary)
}
