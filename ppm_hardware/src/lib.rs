//! Device implementations for the ppm dosing controller.
//!
//! Simulated devices are always available; Raspberry Pi GPIO buttons, the
//! power output and the ADS1115 shunt ADC are compiled with the `hardware`
//! feature.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ads1115;
pub mod error;
pub mod sim;
pub mod util;

pub use sim::{ConstantShunt, SimulatedOutput, TracePlayback, TraceStep};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioButton, GpioOutput};

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod gpio {
    use ppm_traits::{DigitalInput, PowerOutput};
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use crate::error::{HwError, Result};

    fn open_gpio() -> Result<Gpio> {
        Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
    }

    /// Push button on a GPIO line. Level polarity is configurable because the
    /// board may use pull-ups or pull-downs.
    pub struct GpioButton {
        pin: InputPin,
        active_high: bool,
    }

    impl GpioButton {
        pub fn new(bcm_pin: u8, active_high: bool) -> Result<Self> {
            let pin = open_gpio()?
                .get(bcm_pin)
                .map_err(|e| HwError::Gpio(format!("open button pin {bcm_pin}: {e}")))?
                .into_input();
            Ok(Self { pin, active_high })
        }
    }

    impl DigitalInput for GpioButton {
        fn is_active(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.pin.is_high() == self.active_high)
        }
    }

    /// Power channel switching the cell supply (relay or MOSFET gate).
    pub struct GpioOutput {
        pin: OutputPin,
    }

    impl GpioOutput {
        pub fn new(bcm_pin: u8) -> Result<Self> {
            let mut pin = open_gpio()?
                .get(bcm_pin)
                .map_err(|e| HwError::Gpio(format!("open output pin {bcm_pin}: {e}")))?
                .into_output();
            // Power-on state is off regardless of what the pin held before.
            pin.set_low();
            Ok(Self { pin })
        }
    }

    impl PowerOutput for GpioOutput {
        fn activate(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.pin.set_high();
            tracing::debug!(pin = self.pin.pin(), "power output on");
            Ok(())
        }

        fn deactivate(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.pin.set_low();
            tracing::debug!(pin = self.pin.pin(), "power output off");
            Ok(())
        }
    }
}
