//! The dosing mode state machine.
//!
//! `ModeMachine` is a pure scheduler: it takes the current time, the debounced
//! button edges and a way to read the shunt, and returns the actions the
//! caller must apply. It never touches hardware itself.

use crate::accumulator::{DoseAccumulator, WindowReport};
use crate::config::{SamplingCfg, TargetLimits};
use crate::debounce::Edge;
use crate::sensor::CurrentSensor;
use crate::session::{Mode, Session};
use crate::status::StatusEvent;

/// Debounced edges of both buttons for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdges {
    pub change_value: Edge,
    pub advance: Edge,
}

impl ButtonEdges {
    pub const NONE: Self = Self {
        change_value: Edge::NoChange,
        advance: Edge::NoChange,
    };
}

/// Side effect requested by a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    ActivateOutput,
    DeactivateOutput,
    Status(StatusEvent),
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    session: Session,
    accumulator: DoseAccumulator,
    limits: TargetLimits,
    sensor: CurrentSensor,
    interval_ms: u64,
    last_sample_ms: Option<u64>,
}

impl ModeMachine {
    pub fn new(limits: TargetLimits, sampling: SamplingCfg, sensor: CurrentSensor) -> Self {
        Self {
            session: Session::new(&limits),
            accumulator: DoseAccumulator::new(&sampling),
            limits,
            sensor,
            interval_ms: sampling.interval_ms.max(1),
            last_sample_ms: None,
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn accumulator(&self) -> &DoseAccumulator {
        &self.accumulator
    }

    pub fn set_calibration_offset(&mut self, offset_ma: f32) {
        self.session.set_calibration_offset(offset_ma);
    }

    /// Record the physical output level when it differs from what the
    /// machine asked for (shutdown, or a failed device call).
    pub(crate) fn mirror_output(&mut self, active: bool) {
        self.session.set_output_active(active);
    }

    /// Initial display after power-on.
    pub fn power_on(&self) -> Vec<Action> {
        vec![Action::Status(StatusEvent::ShowPpmTarget {
            ppm: self.session.ppm_target(),
        })]
    }

    /// Apply button presses. Change-value is handled before advance; only
    /// presses act, releases are ignored.
    pub fn handle_edges(&mut self, now_ms: u64, edges: ButtonEdges) -> Vec<Action> {
        let mut actions = Vec::new();

        if edges.change_value.is_press() && self.session.bump_target(&self.limits) {
            let event = match self.session.mode() {
                Mode::SettingPpm => StatusEvent::ShowPpmTarget {
                    ppm: self.session.ppm_target(),
                },
                _ => StatusEvent::ShowVolumeTarget {
                    volume_ml: self.session.volume_target_ml(),
                },
            };
            tracing::debug!(
                ppm = self.session.ppm_target(),
                volume_ml = self.session.volume_target_ml(),
                "target changed"
            );
            actions.push(Action::Status(event));
        }

        if edges.advance.is_press()
            && let Some(mode) = self.session.advance()
        {
            tracing::info!(%mode, "mode advanced");
            self.enter(mode, now_ms, &mut actions);
        }

        actions
    }

    fn enter(&mut self, mode: Mode, now_ms: u64, actions: &mut Vec<Action>) {
        match mode {
            Mode::SettingVolume => actions.push(Action::Status(StatusEvent::ShowVolumeTarget {
                volume_ml: self.session.volume_target_ml(),
            })),
            Mode::AskingStart => actions.push(Action::Status(StatusEvent::ShowAskStart {
                ppm: self.session.ppm_target(),
                volume_ml: self.session.volume_target_ml(),
            })),
            Mode::Running => {
                self.accumulator.reset();
                self.last_sample_ms = Some(now_ms);
                self.session.set_output_active(true);
                actions.push(Action::ActivateOutput);
                actions.push(Action::Status(StatusEvent::ShowRunningProgress {
                    elapsed_ppm: 0.0,
                    elapsed_minutes: 0.0,
                }));
                tracing::info!(
                    ppm_target = self.session.ppm_target(),
                    volume_ml = self.session.volume_target_ml(),
                    "dosing started"
                );
            }
            Mode::SettingPpm | Mode::Finished => {}
        }
    }

    /// A sample is due once a full interval has passed since the last one
    /// (or since dosing started).
    pub fn sample_due(&self, now_ms: u64) -> bool {
        self.session.mode() == Mode::Running
            && self
                .last_sample_ms
                .is_some_and(|t| now_ms.saturating_sub(t) >= self.interval_ms)
    }

    /// Feed one raw shunt reading taken at `now_ms`.
    pub fn record_sample(&mut self, now_ms: u64, raw: u16) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.session.mode() != Mode::Running {
            return actions;
        }
        self.last_sample_ms = Some(now_ms);

        let reading = self.sensor.sample(
            raw,
            self.session.output_active(),
            self.session.calibration_offset_ma(),
        );
        tracing::debug!(
            raw,
            voltage_v = reading.voltage_v,
            current_ma = reading.current_ma,
            "sample"
        );
        actions.push(Action::Status(StatusEvent::Measurement {
            voltage_v: reading.voltage_v,
            current_ma: reading.current_ma,
            output_active: self.session.output_active(),
        }));

        if let Some(report) = self
            .accumulator
            .push(reading.current_ma, self.session.volume_target_ml())
        {
            self.complete_window(&report, &mut actions);
        }
        actions
    }

    fn complete_window(&mut self, report: &WindowReport, actions: &mut Vec<Action>) {
        tracing::debug!(
            average_ma = report.average_ma,
            window_ppm = report.window_ppm,
            elapsed_ppm = report.elapsed_ppm,
            elapsed_minutes = report.elapsed_minutes,
            "window complete"
        );
        if report.elapsed_ppm >= f32::from(self.session.ppm_target()) {
            self.session.set_output_active(false);
            self.session.finish();
            actions.push(Action::DeactivateOutput);
            actions.push(Action::Status(StatusEvent::ShowFinished {
                elapsed_ppm: report.elapsed_ppm,
            }));
            tracing::info!(
                elapsed_ppm = report.elapsed_ppm,
                elapsed_minutes = report.elapsed_minutes,
                "target reached"
            );
        } else {
            actions.push(Action::Status(StatusEvent::ShowRunningProgress {
                elapsed_ppm: report.elapsed_ppm,
                elapsed_minutes: report.elapsed_minutes,
            }));
        }
    }

    /// One scheduler step: edges first, then at most one sample.
    pub fn tick<E>(
        &mut self,
        now_ms: u64,
        edges: ButtonEdges,
        read_raw: impl FnOnce() -> Result<u16, E>,
    ) -> Result<Vec<Action>, E> {
        let mut actions = self.handle_edges(now_ms, edges);
        if self.sample_due(now_ms) {
            let raw = read_raw()?;
            actions.extend(self.record_sample(now_ms, raw));
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorCfg;

    fn press_advance() -> ButtonEdges {
        ButtonEdges {
            change_value: Edge::NoChange,
            advance: Edge::RoseToActive,
        }
    }

    fn machine() -> ModeMachine {
        ModeMachine::new(
            TargetLimits::default(),
            SamplingCfg::default(),
            CurrentSensor::new(&SensorCfg::default()),
        )
    }

    #[test]
    fn entering_running_activates_output_and_reports_zero() {
        let mut m = machine();
        m.handle_edges(0, press_advance());
        m.handle_edges(0, press_advance());
        let actions = m.handle_edges(100, press_advance());
        assert_eq!(
            actions,
            vec![
                Action::ActivateOutput,
                Action::Status(StatusEvent::ShowRunningProgress {
                    elapsed_ppm: 0.0,
                    elapsed_minutes: 0.0
                })
            ]
        );
        assert!(m.session().output_active());
        assert!(!m.sample_due(100 + 9_999));
        assert!(m.sample_due(100 + 10_000));
    }

    #[test]
    fn no_sampling_before_running() {
        let m = machine();
        assert!(!m.sample_due(u64::MAX));
    }

    #[test]
    fn read_is_skipped_when_no_sample_due() {
        let mut m = machine();
        let r: Result<_, ()> = m.tick(0, ButtonEdges::NONE, || panic!("must not read"));
        assert!(r.is_ok());
    }
}
