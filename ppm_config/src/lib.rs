#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and input-trace parsing for the ppm dosing controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The trace CSV loader enforces headers, binary button levels and
//!   non-decreasing timestamps.
use serde::Deserialize;

/// Simulated input trace schema.
///
/// Expected headers:
/// t_ms,change_value,advance,raw
///
/// Example:
/// t_ms,change_value,advance,raw
/// 0,0,0,4
/// 500,0,1,4
/// 700,0,0,4
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub change_value: u8,
    pub advance: u8,
    pub raw: u16,
}

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// BCM pin of the "change value" button
    pub change_value: u8,
    /// BCM pin of the "advance" button
    pub advance: u8,
    /// BCM pin switching the cell supply
    pub power_output: u8,
    /// Buttons read high when pressed (external pull-down)
    #[serde(default = "default_true")]
    pub buttons_active_high: bool,
    /// I2C address of the shunt ADC
    #[serde(default = "default_adc_address")]
    pub adc_i2c_address: u16,
    /// Single-ended ADC channel wired to the shunt
    #[serde(default = "default_adc_channel")]
    pub adc_channel: u8,
}

fn default_true() -> bool {
    true
}

fn default_adc_address() -> u16 {
    0x48
}

fn default_adc_channel() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub min_ppm: u16,
    pub max_ppm: u16,
    pub step_ppm: u16,
    pub min_volume_ml: u16,
    pub max_volume_ml: u16,
    pub step_volume_ml: u16,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            min_ppm: 5,
            max_ppm: 50,
            step_ppm: 5,
            min_volume_ml: 50,
            max_volume_ml: 1000,
            step_volume_ml: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sampling {
    /// Period between current samples while running (ms)
    pub interval_ms: u64,
    /// Samples averaged into one accumulation window
    pub samples_per_window: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            samples_per_window: 6,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensor {
    /// ADC reference voltage (V)
    pub v_ref: f32,
    /// ADC counts corresponding to `v_ref`
    pub adc_full_scale: u32,
    /// Shunt resistance (ohm)
    pub shunt_ohm: f32,
    /// Max time to wait for one ADC conversion (ms)
    pub read_timeout_ms: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            v_ref: 4.66,
            adc_full_scale: 1024,
            shunt_ohm: 1.0,
            read_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Debounce {
    /// Pause before re-reading a button whose level changed (ms)
    pub settle_ms: u64,
}

impl Default for Debounce {
    fn default() -> Self {
        Self { settle_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Dosing,
    Bench,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Operating profile selected at startup: "dosing" or "bench"
    pub profile: Profile,
    /// Scheduler tick period (ms)
    pub tick_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            profile: Profile::Dosing,
            tick_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Pinned leakage baseline. When present the startup measurement is skipped;
/// use it when the rig cannot be trusted to read true leakage at power-on.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationCfg {
    pub offset_ma: f32,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub sensor: Sensor,
    #[serde(default)]
    pub debounce: Debounce,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub calibration: Option<CalibrationCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Parse trace rows from any reader (header line required).
pub fn load_trace_reader<R: std::io::Read>(reader: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read trace CSV headers: {}", e))?
        .clone();
    let expected = ["t_ms", "change_value", "advance", "raw"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 't_ms,change_value,advance,raw', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid trace CSV row {}: {}", line, e))?;
        if row.change_value > 1 || row.advance > 1 {
            eyre::bail!("trace CSV row {}: button levels must be 0 or 1", line);
        }
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "trace CSV row {}: t_ms {} goes backwards (previous {})",
                line,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let file =
        std::fs::File::open(path).map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    load_trace_reader(file)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        if p.change_value == p.advance
            || p.change_value == p.power_output
            || p.advance == p.power_output
        {
            eyre::bail!("pins.change_value, pins.advance and pins.power_output must be distinct");
        }
        if p.adc_channel > 3 {
            eyre::bail!("pins.adc_channel must be in 0..=3");
        }

        // Targets
        let t = &self.targets;
        if t.step_ppm == 0 {
            eyre::bail!("targets.step_ppm must be > 0");
        }
        if t.min_ppm > t.max_ppm {
            eyre::bail!("targets.min_ppm must be <= targets.max_ppm");
        }
        if t.min_volume_ml == 0 {
            eyre::bail!("targets.min_volume_ml must be > 0");
        }
        if t.step_volume_ml == 0 {
            eyre::bail!("targets.step_volume_ml must be > 0");
        }
        if t.min_volume_ml > t.max_volume_ml {
            eyre::bail!("targets.min_volume_ml must be <= targets.max_volume_ml");
        }

        // Sampling
        if self.sampling.interval_ms == 0 {
            eyre::bail!("sampling.interval_ms must be >= 1");
        }
        if self.sampling.samples_per_window == 0 {
            eyre::bail!("sampling.samples_per_window must be >= 1");
        }
        if self
            .sampling
            .interval_ms
            .checked_mul(u64::from(self.sampling.samples_per_window))
            .is_none()
        {
            eyre::bail!("sampling.interval_ms * sampling.samples_per_window overflows");
        }

        // Sensor
        let s = &self.sensor;
        if !(s.v_ref.is_finite() && s.v_ref > 0.0) {
            eyre::bail!("sensor.v_ref must be a finite value > 0");
        }
        if s.adc_full_scale == 0 {
            eyre::bail!("sensor.adc_full_scale must be >= 1");
        }
        if !(s.shunt_ohm.is_finite() && s.shunt_ohm > 0.0) {
            eyre::bail!("sensor.shunt_ohm must be a finite value > 0");
        }
        if s.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }

        // Debounce
        if self.debounce.settle_ms > 1000 {
            eyre::bail!("debounce.settle_ms is unreasonably large (>1s)");
        }

        // Runner
        if self.runner.tick_ms == 0 {
            eyre::bail!("runner.tick_ms must be >= 1");
        }
        if self.runner.tick_ms > self.sampling.interval_ms {
            eyre::bail!("runner.tick_ms must not exceed sampling.interval_ms");
        }

        // Calibration
        if let Some(c) = self.calibration
            && !c.offset_ma.is_finite()
        {
            eyre::bail!("calibration.offset_ma must be finite");
        }

        Ok(())
    }
}
