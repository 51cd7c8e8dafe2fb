//! Shunt current measurement.

use crate::config::SensorCfg;

/// One converted shunt reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuntReading {
    pub raw: u16,
    pub voltage_v: f32,
    /// Current in mA; corrected for the leakage baseline when taken with the
    /// output active.
    pub current_ma: f32,
}

/// Converts raw ADC counts across the shunt into millivolts and milliamps.
#[derive(Debug, Clone, Copy)]
pub struct CurrentSensor {
    volts_per_count: f32,
    shunt_ohm: f32,
}

impl CurrentSensor {
    pub fn new(cfg: &SensorCfg) -> Self {
        Self {
            volts_per_count: cfg.v_ref / cfg.adc_full_scale.max(1) as f32,
            shunt_ohm: cfg.shunt_ohm,
        }
    }

    /// Uncorrected conversion of a raw count.
    pub fn convert(&self, raw: u16) -> ShuntReading {
        let voltage_v = f32::from(raw) * self.volts_per_count;
        ShuntReading {
            raw,
            voltage_v,
            current_ma: voltage_v / self.shunt_ohm * 1000.0,
        }
    }

    /// Conversion with the calibration baseline subtracted while the output is
    /// active. The result is not clamped and may be negative.
    pub fn sample(&self, raw: u16, output_active: bool, offset_ma: f32) -> ShuntReading {
        let mut r = self.convert(raw);
        if output_active {
            r.current_ma -= offset_ma;
        }
        r
    }
}
