//! Maps `Box<dyn Error>` from trait boundaries to typed `PpmError`.
//!
//! The traits in `ppm_traits` use `Box<dyn Error + Send + Sync>` so any device
//! can plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `ppm_hardware::HwError` downcasting.

use crate::error::PpmError;

/// Map a trait-boundary error to a typed `PpmError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PpmError {
    #[cfg(feature = "hardware-errors")]
    {
        use ppm_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::ConversionTimeout => PpmError::Timeout,
                HwError::Io(io) => PpmError::Io(io.to_string()),
                other => PpmError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PpmError::Timeout
    } else {
        PpmError::Hardware(s)
    }
}

/// Lift a device result into the crate's `eyre` result, tagging it with what
/// was being attempted.
pub(crate) fn device<T>(
    r: Result<T, Box<dyn std::error::Error + Send + Sync>>,
    what: &'static str,
) -> crate::error::Result<T> {
    use eyre::WrapErr;
    r.map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err(what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_timeout() {
        let e = std::io::Error::other("ADC conversion timeout");
        assert!(matches!(map_hw_error(&e), PpmError::Timeout));
    }

    #[test]
    fn other_errors_map_to_hardware() {
        let e = std::io::Error::other("gpio busy");
        match map_hw_error(&e) {
            PpmError::Hardware(msg) => assert!(msg.contains("gpio busy")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        use ppm_hardware::error::HwError;
        assert!(matches!(
            map_hw_error(&HwError::ConversionTimeout),
            PpmError::Timeout
        ));
        assert!(matches!(
            map_hw_error(&HwError::Gpio("pin 4".into())),
            PpmError::HardwareFault(_)
        ));
    }
}
