pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// A single debounced-by-caller digital line (button).
pub trait DigitalInput {
    /// True when the line is at its active (pressed) level.
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Raw ADC channel measuring the voltage across the shunt resistor.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

/// On/off power channel driving the electrolytic cell. Calls must be idempotent.
pub trait PowerOutput {
    fn activate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn deactivate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_active()
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_raw()
    }
}

impl<T: PowerOutput + ?Sized> PowerOutput for Box<T> {
    fn activate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).activate()
    }
    fn deactivate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).deactivate()
    }
}
