//! Runtime configuration for the controller.
//!
//! These are the structs consumed by `ControllerCore`. They are separate from
//! the TOML-deserialized config in `ppm_config`; see `conversions` for the
//! bridge.

/// Bounds and step sizes of the two operator-adjustable targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLimits {
    pub min_ppm: u16,
    pub max_ppm: u16,
    pub step_ppm: u16,
    pub min_volume_ml: u16,
    pub max_volume_ml: u16,
    pub step_volume_ml: u16,
}

impl Default for TargetLimits {
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

/// Sampling cadence while dosing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingCfg {
    /// Milliseconds between two current samples.
    pub interval_ms: u64,
    /// Samples averaged into one accumulation window.
    pub samples_per_window: u32,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            samples_per_window: 6,
        }
    }
}

impl SamplingCfg {
    /// Minutes of process time represented by one full window.
    pub fn window_minutes(&self) -> f32 {
        (f64::from(self.samples_per_window) * self.interval_ms as f64 / 60_000.0) as f32
    }
}

/// Shunt measurement chain: ADC reference, ADC resolution and shunt value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCfg {
    pub v_ref: f32,
    pub adc_full_scale: u32,
    pub shunt_ohm: f32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            v_ref: 4.66,
            adc_full_scale: 1024,
            shunt_ohm: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceCfg {
    /// Pause between seeing a level change and re-reading the line.
    pub settle_ms: u64,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self { settle_ms: 10 }
    }
}

/// Strategy the controller runs after power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingProfile {
    /// Button-driven target selection followed by a dosing run.
    #[default]
    Dosing,
    /// Manual output toggle with periodic measurements; never finishes.
    Bench,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_one_minute() {
        let s = SamplingCfg::default();
        assert!((s.window_minutes() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let s = SamplingCfg {
            interval_ms: u64::MAX / 4,
            samples_per_window: 6,
        };
        assert!(s.window_minutes().is_finite());
        assert!(s.window_minutes() > 0.0);
    }
}
