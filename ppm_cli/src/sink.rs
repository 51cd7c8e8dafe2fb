//! Status sinks rendering controller events on stdout.

use std::sync::Arc;
use std::time::Instant;

use ppm_core::{StatusEvent, StatusSink};
use ppm_traits::Clock;

/// One human-readable line per event.
#[derive(Debug, Default)]
pub struct TextSink;

impl StatusSink for TextSink {
    fn show(&mut self, event: &StatusEvent) {
        match *event {
            StatusEvent::ShowPpmTarget { ppm } => println!("Target: {ppm} ppm"),
            StatusEvent::ShowVolumeTarget { volume_ml } => println!("Volume: {volume_ml} mL"),
            StatusEvent::ShowAskStart { ppm, volume_ml } => {
                println!("Dose {ppm} ppm into {volume_ml} mL? Press advance to start");
            }
            StatusEvent::ShowRunningProgress {
                elapsed_ppm,
                elapsed_minutes,
            } => println!("Running: {elapsed_ppm:.2} ppm after {elapsed_minutes:.1} min"),
            StatusEvent::ShowFinished { elapsed_ppm } => {
                println!("Finished: {elapsed_ppm:.2} ppm");
            }
            StatusEvent::Measurement {
                voltage_v,
                current_ma,
                output_active,
            } => println!(
                "V={voltage_v:.3} V  I={current_ma:.2} mA  output={}",
                if output_active { "on" } else { "off" }
            ),
        }
    }
}

/// One JSON object per event, stamped with milliseconds on the run clock.
pub struct JsonSink {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl JsonSink {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self { clock, epoch }
    }
}

pub fn event_json(event: &StatusEvent, t_ms: u64) -> serde_json::Value {
    use serde_json::json;
    let mut v = match *event {
        StatusEvent::ShowPpmTarget { ppm } => json!({ "ppm": ppm }),
        StatusEvent::ShowVolumeTarget { volume_ml } => json!({ "volume_ml": volume_ml }),
        StatusEvent::ShowAskStart { ppm, volume_ml } => {
            json!({ "ppm": ppm, "volume_ml": volume_ml })
        }
        StatusEvent::ShowRunningProgress {
            elapsed_ppm,
            elapsed_minutes,
        } => json!({ "elapsed_ppm": elapsed_ppm, "elapsed_minutes": elapsed_minutes }),
        StatusEvent::ShowFinished { elapsed_ppm } => json!({ "elapsed_ppm": elapsed_ppm }),
        StatusEvent::Measurement {
            voltage_v,
            current_ma,
            output_active,
        } => json!({
            "voltage_v": voltage_v,
            "current_ma": current_ma,
            "output_active": output_active,
        }),
    };
    v["event"] = json!(event.kind());
    v["t_ms"] = json!(t_ms);
    v
}

impl StatusSink for JsonSink {
    fn show(&mut self, event: &StatusEvent) {
        println!("{}", event_json(event, self.clock.ms_since(self.epoch)));
    }
}
