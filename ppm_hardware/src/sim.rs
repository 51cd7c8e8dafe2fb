//! Simulated devices for bench-free runs and tests.
//!
//! `TracePlayback` replays a recorded timeline of button levels and shunt
//! readings against a shared clock; `ConstantShunt` and `SimulatedOutput`
//! cover the simpler cases.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use ppm_traits::{AnalogInput, Clock, DigitalInput, PowerOutput};

/// Input levels from `at_ms` (relative to playback start) until the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceStep {
    pub at_ms: u64,
    pub change_value: bool,
    pub advance: bool,
    pub raw: u16,
}

/// Shared timeline of input levels. Before the first step every line reads
/// inactive and the shunt reads 0.
pub struct TracePlayback {
    steps: Vec<TraceStep>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl TracePlayback {
    /// Steps are sorted by `at_ms` here; a stable sort keeps the last of
    /// several steps sharing a timestamp authoritative.
    pub fn new(mut steps: Vec<TraceStep>, clock: Arc<dyn Clock + Send + Sync>) -> Rc<Self> {
        steps.sort_by_key(|s| s.at_ms);
        let epoch = clock.now();
        Rc::new(Self {
            steps,
            clock,
            epoch,
        })
    }

    /// A playback with no steps: buttons never pressed, shunt reads 0.
    pub fn idle(clock: Arc<dyn Clock + Send + Sync>) -> Rc<Self> {
        Self::new(Vec::new(), clock)
    }

    /// Step in effect at the playback clock's current time.
    pub fn current(&self) -> TraceStep {
        let now = self.clock.ms_since(self.epoch);
        let idx = self.steps.partition_point(|s| s.at_ms <= now);
        if idx == 0 {
            TraceStep::default()
        } else {
            self.steps[idx - 1]
        }
    }

    pub fn change_value_button(self: &Rc<Self>) -> TraceButton {
        TraceButton {
            playback: Rc::clone(self),
            line: ButtonLine::ChangeValue,
        }
    }

    pub fn advance_button(self: &Rc<Self>) -> TraceButton {
        TraceButton {
            playback: Rc::clone(self),
            line: ButtonLine::Advance,
        }
    }

    pub fn shunt(self: &Rc<Self>) -> TraceShunt {
        TraceShunt {
            playback: Rc::clone(self),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ButtonLine {
    ChangeValue,
    Advance,
}

pub struct TraceButton {
    playback: Rc<TracePlayback>,
    line: ButtonLine,
}

impl DigitalInput for TraceButton {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let step = self.playback.current();
        Ok(match self.line {
            ButtonLine::ChangeValue => step.change_value,
            ButtonLine::Advance => step.advance,
        })
    }
}

pub struct TraceShunt {
    playback: Rc<TracePlayback>,
}

impl AnalogInput for TraceShunt {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let raw = self.playback.current().raw;
        tracing::trace!(raw, "shunt read (trace)");
        Ok(raw)
    }
}

/// Shunt that always returns the same raw reading.
#[derive(Debug, Clone, Copy)]
pub struct ConstantShunt(pub u16);

impl AnalogInput for ConstantShunt {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0)
    }
}

/// Power output that records its state; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOutput {
    active: Rc<Cell<bool>>,
    activations: Rc<Cell<u32>>,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Number of off-to-on transitions seen so far.
    pub fn activations(&self) -> u32 {
        self.activations.get()
    }
}

impl PowerOutput for SimulatedOutput {
    fn activate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.active.get() {
            self.activations.set(self.activations.get().saturating_add(1));
            tracing::debug!("power output on (simulated)");
        }
        self.active.set(true);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.active.get() {
            tracing::debug!("power output off (simulated)");
        }
        self.active.set(false);
        Ok(())
    }
}
