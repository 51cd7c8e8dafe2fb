use std::time::Duration;

use ppm_traits::AnalogInput;
use rppal::i2c::I2c;
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::poll_until_with_timeout;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS_START: u16 = 1 << 15;
// PGA ±4.096 V, single-shot, 128 SPS, comparator disabled.
const CONFIG_BASE: u16 = (0b001 << 9) | (1 << 8) | (0b100 << 5) | 0b11;

/// ADS1115 measuring the shunt voltage single-ended on one channel.
///
/// Readings are the positive half of the signed 16-bit conversion, so the
/// matching full-scale constant is 32768 with a 4.096 V reference.
pub struct Ads1115Shunt {
    i2c: I2c,
    channel: u8,
    timeout: Duration,
}

impl Ads1115Shunt {
    pub fn new(address: u16, channel: u8, timeout: Duration) -> Result<Self> {
        if channel > 3 {
            return Err(HwError::I2c(format!("ads1115 channel {channel} out of range 0..=3")));
        }
        let mut i2c = I2c::new().map_err(|e| HwError::I2c(format!("open i2c bus: {e}")))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(format!("select ads1115 at {address:#04x}: {e}")))?;
        Ok(Self {
            i2c,
            channel,
            timeout,
        })
    }

    fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_single_shot(&mut self) -> Result<u16> {
        let mux = (0b100 | u16::from(self.channel)) << 12;
        let config = OS_START | mux | CONFIG_BASE;
        let [hi, lo] = config.to_be_bytes();
        self.i2c
            .write(&[REG_CONFIG, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;

        // OS bit reads back as 1 once the conversion has finished.
        let timeout = self.timeout;
        poll_until_with_timeout(
            || Ok(self.read_register(REG_CONFIG)? & OS_START != 0),
            timeout,
            Duration::from_micros(500),
        )?;

        let value = self.read_register(REG_CONVERSION)? as i16;
        trace!(raw = value, channel = self.channel, "ads1115 conversion");
        Ok(value.max(0) as u16)
    }
}

impl AnalogInput for Ads1115Shunt {
    fn read_raw(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_single_shot()?)
    }
}
