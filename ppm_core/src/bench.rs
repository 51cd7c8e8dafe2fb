//! Bench profile: manual output toggle with periodic measurements.
//!
//! Used on the rig to check wiring and leakage. It shares the sensor and
//! output with the dosing profile but has no session: it never accumulates
//! ppm and never finishes.

use crate::machine::{Action, ButtonEdges};
use crate::sensor::CurrentSensor;
use crate::status::StatusEvent;

#[derive(Debug, Clone)]
pub struct BenchStation {
    sensor: CurrentSensor,
    interval_ms: u64,
    last_sample_ms: u64,
    output_active: bool,
    offset_ma: f32,
}

impl BenchStation {
    pub fn new(sensor: CurrentSensor, interval_ms: u64) -> Self {
        Self {
            sensor,
            interval_ms: interval_ms.max(1),
            last_sample_ms: 0,
            output_active: false,
            offset_ma: 0.0,
        }
    }

    pub const fn output_active(&self) -> bool {
        self.output_active
    }

    pub fn set_calibration_offset(&mut self, offset_ma: f32) {
        self.offset_ma = offset_ma;
    }

    /// Record the physical output level after a forced switch or a failed one.
    pub(crate) fn mirror_output(&mut self, active: bool) {
        self.output_active = active;
    }

    /// Change-value toggles the output; advance is ignored.
    pub fn handle_edges(&mut self, edges: ButtonEdges) -> Vec<Action> {
        if !edges.change_value.is_press() {
            return Vec::new();
        }
        self.output_active = !self.output_active;
        tracing::info!(output_active = self.output_active, "bench output toggled");
        if self.output_active {
            vec![Action::ActivateOutput]
        } else {
            vec![Action::DeactivateOutput]
        }
    }

    pub fn sample_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_sample_ms) >= self.interval_ms
    }

    pub fn record_sample(&mut self, now_ms: u64, raw: u16) -> Vec<Action> {
        self.last_sample_ms = now_ms;
        let r = self.sensor.sample(raw, self.output_active, self.offset_ma);
        vec![Action::Status(StatusEvent::Measurement {
            voltage_v: r.voltage_v,
            current_ma: r.current_ma,
            output_active: self.output_active,
        })]
    }

    pub fn tick<E>(
        &mut self,
        now_ms: u64,
        edges: ButtonEdges,
        read_raw: impl FnOnce() -> Result<u16, E>,
    ) -> Result<Vec<Action>, E> {
        let mut actions = self.handle_edges(edges);
        if self.sample_due(now_ms) {
            let raw = read_raw()?;
            actions.extend(self.record_sample(now_ms, raw));
        }
        Ok(actions)
    }
}
