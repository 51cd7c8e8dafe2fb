//! Device assembly, controller wiring and the two commands.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use ppm_config::{Config, TraceRow};
use ppm_core::error::Result as CoreResult;
use ppm_core::{
    Controller, ControllerSettings, OperatingProfile, RunParams, RunSummary, StatusSink,
};
use ppm_hardware::{SimulatedOutput, TracePlayback, TraceStep};
use ppm_traits::{AnalogInput, Clock, DigitalInput, ManualClock, MonotonicClock, PowerOutput};

use crate::sink::{JsonSink, TextSink};

/// Clock handle shared by the controller, the trace playback and the sink.
#[derive(Clone)]
pub struct SharedClock(Arc<dyn Clock + Send + Sync>);

impl SharedClock {
    pub fn new(virtual_time: bool) -> Self {
        if virtual_time {
            Self(Arc::new(ManualClock::new()))
        } else {
            Self(Arc::new(MonotonicClock::new()))
        }
    }

    pub fn arc(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.0)
    }
}

impl Clock for SharedClock {
    fn now(&self) -> Instant {
        self.0.now()
    }

    fn sleep(&self, d: Duration) {
        self.0.sleep(d);
    }
}

pub struct Devices {
    pub change_value: Box<dyn DigitalInput>,
    pub advance: Box<dyn DigitalInput>,
    pub shunt: Box<dyn AnalogInput>,
    pub output: Box<dyn PowerOutput>,
}

fn to_steps(rows: &[TraceRow]) -> Vec<TraceStep> {
    rows.iter()
        .map(|r| TraceStep {
            at_ms: r.t_ms,
            change_value: r.change_value == 1,
            advance: r.advance == 1,
            raw: r.raw,
        })
        .collect()
}

fn simulated(playback: &std::rc::Rc<TracePlayback>) -> Devices {
    Devices {
        change_value: Box::new(playback.change_value_button()),
        advance: Box::new(playback.advance_button()),
        shunt: Box::new(playback.shunt()),
        output: Box::new(SimulatedOutput::new()),
    }
}

/// Trace playback when a trace is given, real hardware when built with it,
/// otherwise an idle simulation.
pub fn open_devices(
    cfg: &Config,
    trace: Option<&Path>,
    clock: &SharedClock,
) -> CoreResult<Devices> {
    if let Some(path) = trace {
        let rows = ppm_config::load_trace_csv(path)?;
        tracing::info!(path = %path.display(), steps = rows.len(), "using trace playback");
        return Ok(simulated(&TracePlayback::new(to_steps(&rows), clock.arc())));
    }

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        use ppm_hardware::ads1115::Ads1115Shunt;
        use ppm_hardware::{GpioButton, GpioOutput};

        let p = &cfg.pins;
        let change_value = GpioButton::new(p.change_value, p.buttons_active_high)
            .wrap_err("open change-value button")?;
        let advance =
            GpioButton::new(p.advance, p.buttons_active_high).wrap_err("open advance button")?;
        let output = GpioOutput::new(p.power_output).wrap_err("open power output")?;
        let shunt = Ads1115Shunt::new(
            p.adc_i2c_address,
            p.adc_channel,
            Duration::from_millis(cfg.sensor.read_timeout_ms),
        )
        .wrap_err("open shunt ADC")?;
        tracing::info!(
            change_value = p.change_value,
            advance = p.advance,
            power_output = p.power_output,
            adc = p.adc_i2c_address,
            "using GPIO hardware"
        );
        return Ok(Devices {
            change_value: Box::new(change_value),
            advance: Box::new(advance),
            shunt: Box::new(shunt),
            output: Box::new(output),
        });
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg;
        tracing::warn!("built without hardware support and no --trace given; inputs stay idle");
        Ok(simulated(&TracePlayback::idle(clock.arc())))
    }
}

pub fn settings(cfg: &Config, profile: OperatingProfile) -> ControllerSettings {
    ControllerSettings {
        limits: (&cfg.targets).into(),
        sampling: (&cfg.sampling).into(),
        sensor: (&cfg.sensor).into(),
        debounce: (&cfg.debounce).into(),
        profile,
        calibration_offset_ma: cfg.calibration.map(|c| c.offset_ma),
    }
}

pub fn build(
    devices: Devices,
    settings: ControllerSettings,
    clock: &SharedClock,
    json: bool,
) -> CoreResult<Controller> {
    let sink: Box<dyn StatusSink> = if json {
        Box::new(JsonSink::new(clock.arc()))
    } else {
        Box::new(TextSink)
    };
    Controller::builder()
        .with_buttons(devices.change_value, devices.advance)
        .with_shunt(devices.shunt)
        .with_output(devices.output)
        .with_settings(settings)
        .with_clock(Box::new(clock.clone()))
        .with_sink(sink)
        .build()
}

pub fn run_controller(
    ctrl: &mut Controller,
    params: RunParams,
    shutdown: &AtomicBool,
    json: bool,
) -> CoreResult<RunSummary> {
    let summary = ctrl.run(params, shutdown)?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "event": "summary",
                "profile": profile_name(ctrl.profile()),
                "final_mode": summary.final_mode.map(|m| m.as_str()),
                "finished": summary.finished(),
                "elapsed_ppm": summary.elapsed_ppm,
                "elapsed_minutes": summary.elapsed_minutes,
                "ticks": summary.ticks,
            })
        );
    } else if summary.finished() {
        println!(
            "Dose complete: {:.2} ppm in {:.1} min",
            summary.elapsed_ppm, summary.elapsed_minutes
        );
    } else {
        println!(
            "Stopped after {} ticks: {:.2} ppm in {:.1} min",
            summary.ticks, summary.elapsed_ppm, summary.elapsed_minutes
        );
    }
    Ok(summary)
}

/// Measure the leakage baseline once and report it.
pub fn self_check(ctrl: &mut Controller, json: bool) -> CoreResult<f32> {
    let result = ctrl.calibrate().wrap_err("self-check calibration");
    ctrl.shutdown();
    let offset_ma = result?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "event": "self_check", "offset_ma": offset_ma, "ok": true })
        );
    } else {
        println!("Self-check OK: leakage baseline {offset_ma:.3} mA");
    }
    Ok(offset_ma)
}

pub const fn profile_name(p: OperatingProfile) -> &'static str {
    match p {
        OperatingProfile::Dosing => "dosing",
        OperatingProfile::Bench => "bench",
    }
}
