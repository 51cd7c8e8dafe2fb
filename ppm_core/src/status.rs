//! Status events and the sink that renders them.

/// Values handed to the display; the sink owns all formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    ShowPpmTarget {
        ppm: u16,
    },
    ShowVolumeTarget {
        volume_ml: u16,
    },
    ShowAskStart {
        ppm: u16,
        volume_ml: u16,
    },
    ShowRunningProgress {
        elapsed_ppm: f32,
        elapsed_minutes: f32,
    },
    ShowFinished {
        elapsed_ppm: f32,
    },
    /// Diagnostic reading emitted for every accepted sample.
    Measurement {
        voltage_v: f32,
        current_ma: f32,
        output_active: bool,
    },
}

impl StatusEvent {
    /// Stable snake_case name, used by structured sinks.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ShowPpmTarget { .. } => "ppm_target",
            Self::ShowVolumeTarget { .. } => "volume_target",
            Self::ShowAskStart { .. } => "ask_start",
            Self::ShowRunningProgress { .. } => "running_progress",
            Self::ShowFinished { .. } => "finished",
            Self::Measurement { .. } => "measurement",
        }
    }
}

pub trait StatusSink {
    fn show(&mut self, event: &StatusEvent);
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn show(&mut self, event: &StatusEvent) {
        (**self).show(event);
    }
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn show(&mut self, event: &StatusEvent) {
        match *event {
            StatusEvent::ShowPpmTarget { ppm } => tracing::info!(ppm, "ppm target"),
            StatusEvent::ShowVolumeTarget { volume_ml } => {
                tracing::info!(volume_ml, "volume target");
            }
            StatusEvent::ShowAskStart { ppm, volume_ml } => {
                tracing::info!(ppm, volume_ml, "press advance to start");
            }
            StatusEvent::ShowRunningProgress {
                elapsed_ppm,
                elapsed_minutes,
            } => tracing::info!(elapsed_ppm, elapsed_minutes, "dosing"),
            StatusEvent::ShowFinished { elapsed_ppm } => {
                tracing::info!(elapsed_ppm, "dosing finished");
            }
            StatusEvent::Measurement {
                voltage_v,
                current_ma,
                output_active,
            } => tracing::debug!(voltage_v, current_ma, output_active, "measurement"),
        }
    }
}

/// Coarse state reported by each controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Output off; waiting for the operator.
    Idle,
    /// Output on.
    Running,
    /// Target reached; output already off.
    Finished,
}
