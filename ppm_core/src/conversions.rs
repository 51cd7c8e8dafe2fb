//! `From` implementations bridging `ppm_config` types to `ppm_core` types.

use crate::config::{DebounceCfg, OperatingProfile, SamplingCfg, SensorCfg, TargetLimits};
use crate::runner::RunParams;

impl From<&ppm_config::Targets> for TargetLimits {
    fn from(c: &ppm_config::Targets) -> Self {
        Self {
            min_ppm: c.min_ppm,
            max_ppm: c.max_ppm,
            step_ppm: c.step_ppm,
            min_volume_ml: c.min_volume_ml,
            max_volume_ml: c.max_volume_ml,
            step_volume_ml: c.step_volume_ml,
        }
    }
}

impl From<&ppm_config::Sampling> for SamplingCfg {
    fn from(c: &ppm_config::Sampling) -> Self {
        Self {
            interval_ms: c.interval_ms,
            samples_per_window: c.samples_per_window,
        }
    }
}

impl From<&ppm_config::Sensor> for SensorCfg {
    fn from(c: &ppm_config::Sensor) -> Self {
        Self {
            v_ref: c.v_ref,
            adc_full_scale: c.adc_full_scale,
            shunt_ohm: c.shunt_ohm,
        }
    }
}

impl From<&ppm_config::Debounce> for DebounceCfg {
    fn from(c: &ppm_config::Debounce) -> Self {
        Self {
            settle_ms: c.settle_ms,
        }
    }
}

impl From<ppm_config::Profile> for OperatingProfile {
    fn from(p: ppm_config::Profile) -> Self {
        match p {
            ppm_config::Profile::Dosing => Self::Dosing,
            ppm_config::Profile::Bench => Self::Bench,
        }
    }
}

// max_ticks has no config key; callers set it from the command line.
impl From<&ppm_config::RunnerCfg> for RunParams {
    fn from(c: &ppm_config::RunnerCfg) -> Self {
        Self {
            tick_ms: c.tick_ms,
            max_ticks: None,
        }
    }
}
