//! The controller tick loop (`ControllerCore`).
//!
//! Reads both buttons, debounces them with a clock-driven settle pause, runs
//! the selected strategy and applies the resulting actions to the output and
//! the status sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ppm_traits::{AnalogInput, Clock, DigitalInput, PowerOutput};

use crate::bench::BenchStation;
use crate::calibration::{Calibration, measure_baseline};
use crate::config::{DebounceCfg, OperatingProfile};
use crate::debounce::Debouncer;
use crate::error::{PpmError, Result};
use crate::hw_error::device;
use crate::machine::{Action, ButtonEdges, ModeMachine};
use crate::sensor::CurrentSensor;
use crate::session::{Mode, Session};
use crate::status::{StatusSink, TickStatus};

pub(crate) enum Strategy {
    Dosing(ModeMachine),
    Bench(BenchStation),
}

/// Generic core; `Controller` is the boxed wrapper around it.
pub struct ControllerCore<C, V, A, O>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    pub(crate) change_button: C,
    pub(crate) advance_button: V,
    pub(crate) analog: A,
    pub(crate) output: O,
    pub(crate) change_db: Debouncer,
    pub(crate) advance_db: Debouncer,
    pub(crate) strategy: Strategy,
    pub(crate) sensor: CurrentSensor,
    pub(crate) debounce: DebounceCfg,
    pub(crate) calibration: Calibration,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) sink: Box<dyn StatusSink>,
    pub(crate) powered_on: bool,
}

impl<C, V, A, O> core::fmt::Debug for ControllerCore<C, V, A, O>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControllerCore")
            .field("profile", &self.profile())
            .field("mode", &self.mode())
            .field("elapsed_ppm", &self.elapsed_ppm())
            .field("output_active", &self.output_active())
            .field("calibration", &self.calibration)
            .finish()
    }
}

impl<C, V, A, O> ControllerCore<C, V, A, O>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    pub fn profile(&self) -> OperatingProfile {
        match self.strategy {
            Strategy::Dosing(_) => OperatingProfile::Dosing,
            Strategy::Bench(_) => OperatingProfile::Bench,
        }
    }

    /// Session of the dosing profile; `None` on the bench.
    pub fn session(&self) -> Option<&Session> {
        match &self.strategy {
            Strategy::Dosing(m) => Some(m.session()),
            Strategy::Bench(_) => None,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.session().map(Session::mode)
    }

    pub fn elapsed_ppm(&self) -> f32 {
        match &self.strategy {
            Strategy::Dosing(m) => m.accumulator().elapsed_ppm(),
            Strategy::Bench(_) => 0.0,
        }
    }

    pub fn elapsed_minutes(&self) -> f32 {
        match &self.strategy {
            Strategy::Dosing(m) => m.accumulator().elapsed_minutes(),
            Strategy::Bench(_) => 0.0,
        }
    }

    pub fn output_active(&self) -> bool {
        match &self.strategy {
            Strategy::Dosing(m) => m.session().output_active(),
            Strategy::Bench(b) => b.output_active(),
        }
    }

    pub const fn is_calibrated(&self) -> bool {
        self.calibration.is_done()
    }

    pub const fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Milliseconds since the controller was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Sleep on the controller's clock (instant under a virtual clock).
    pub fn sleep(&self, d: Duration) {
        self.clock.sleep(d);
    }

    /// Measure the leakage baseline. Allowed once per power cycle, and not at
    /// all when an offset was supplied at build time.
    pub fn calibrate(&mut self) -> Result<f32> {
        if self.calibration.is_done() {
            return Err(eyre::Report::new(PpmError::State(
                "calibration already done for this power cycle".into(),
            )));
        }
        let reading = match measure_baseline(&self.sensor, &mut self.analog, &mut self.output) {
            Ok(r) => r,
            Err(e) => {
                self.mirror_output(false);
                return Err(e);
            }
        };
        self.calibration = Calibration::Measured(reading);
        self.apply_offset(reading.current_ma);
        Ok(reading.current_ma)
    }

    pub(crate) fn apply_offset(&mut self, offset_ma: f32) {
        match &mut self.strategy {
            Strategy::Dosing(m) => m.set_calibration_offset(offset_ma),
            Strategy::Bench(b) => b.set_calibration_offset(offset_ma),
        }
    }

    /// Emit the power-on display. Runs automatically on the first tick.
    pub fn power_on(&mut self) {
        if self.powered_on {
            return;
        }
        self.powered_on = true;
        if let Strategy::Dosing(m) = &self.strategy {
            for action in m.power_on() {
                if let Action::Status(ev) = action {
                    self.sink.show(&ev);
                }
            }
        }
    }

    /// One scheduler step.
    pub fn tick(&mut self) -> Result<TickStatus> {
        if !self.calibration.is_done() {
            return Err(eyre::Report::new(PpmError::State(
                "not calibrated".into(),
            )));
        }
        self.power_on();

        let edges = self.read_edges()?;
        let now_ms = self.now_ms();
        let analog = &mut self.analog;
        let read_raw = || device(analog.read_raw(), "reading shunt");
        let actions = match &mut self.strategy {
            Strategy::Dosing(m) => m.tick(now_ms, edges, read_raw)?,
            Strategy::Bench(b) => b.tick(now_ms, edges, read_raw)?,
        };
        for action in actions {
            self.apply(action)?;
        }
        Ok(self.status())
    }

    fn status(&self) -> TickStatus {
        match self.mode() {
            Some(Mode::Finished) => TickStatus::Finished,
            _ if self.output_active() => TickStatus::Running,
            _ => TickStatus::Idle,
        }
    }

    fn read_edges(&mut self) -> Result<ButtonEdges> {
        let settle = Duration::from_millis(self.debounce.settle_ms);

        let raw = device(self.change_button.is_active(), "reading change-value button")?;
        let change_value = {
            let (clock, button) = (&self.clock, &mut self.change_button);
            self.change_db.try_update(raw, || {
                clock.sleep(settle);
                device(button.is_active(), "re-reading change-value button")
            })?
        };

        let raw = device(self.advance_button.is_active(), "reading advance button")?;
        let advance = {
            let (clock, button) = (&self.clock, &mut self.advance_button);
            self.advance_db.try_update(raw, || {
                clock.sleep(settle);
                device(button.is_active(), "re-reading advance button")
            })?
        };

        Ok(ButtonEdges {
            change_value,
            advance,
        })
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            // The session flag follows the device only once the call succeeds.
            Action::ActivateOutput => {
                let res = device(self.output.activate(), "activating output");
                if res.is_err() {
                    self.mirror_output(false);
                }
                res
            }
            Action::DeactivateOutput => {
                let res = device(self.output.deactivate(), "deactivating output");
                if res.is_err() {
                    self.mirror_output(true);
                }
                res
            }
            Action::Status(ev) => {
                self.sink.show(&ev);
                Ok(())
            }
        }
    }

    fn mirror_output(&mut self, active: bool) {
        match &mut self.strategy {
            Strategy::Dosing(m) => m.mirror_output(active),
            Strategy::Bench(b) => b.mirror_output(active),
        }
    }

    /// Switch the output off (best-effort).
    pub fn shutdown(&mut self) {
        if let Err(e) = self.output.deactivate() {
            tracing::warn!(error = %e, "output deactivate failed on shutdown");
        }
        self.mirror_output(false);
    }
}
