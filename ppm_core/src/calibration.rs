//! Leakage baseline measured once at power-on.

use ppm_traits::{AnalogInput, PowerOutput};

use crate::error::Result;
use crate::hw_error::device;
use crate::sensor::{CurrentSensor, ShuntReading};

/// Where the active baseline came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// Not yet measured; dosing cannot start.
    Pending,
    /// Measured at startup from this reading.
    Measured(ShuntReading),
    /// Supplied up front; the startup measurement is skipped.
    Pinned(f32),
}

impl Calibration {
    pub const fn is_done(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub const fn offset_ma(&self) -> f32 {
        match self {
            Self::Pending => 0.0,
            Self::Measured(r) => r.current_ma,
            Self::Pinned(ma) => *ma,
        }
    }
}

/// Force the output on, take one uncorrected reading and force it off again.
///
/// The output is switched off even when switching it on or reading fails; a
/// failure to switch it off is reported only after a successful read.
pub fn measure_baseline<A, O>(
    sensor: &CurrentSensor,
    analog: &mut A,
    output: &mut O,
) -> Result<ShuntReading>
where
    A: AnalogInput + ?Sized,
    O: PowerOutput + ?Sized,
{
    let read = device(output.activate(), "activating output for calibration")
        .and_then(|()| device(analog.read_raw(), "reading shunt during calibration"));
    let off = device(output.deactivate(), "deactivating output after calibration");
    let raw = read?;
    off?;
    let reading = sensor.convert(raw);
    tracing::info!(
        raw = reading.raw,
        voltage_v = reading.voltage_v,
        offset_ma = reading.current_ma,
        "calibration baseline measured"
    );
    Ok(reading)
}
