//! Human-readable error descriptions and structured JSON error formatting.

use ppm_core::error::{BuildError, PpmError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingButtons => {
                "What happened: No buttons were provided to the controller.\nLikely causes: GPIO inputs failed to initialize or were not wired into the builder.\nHow to fix: Check [pins] change_value/advance and pass both via with_buttons(...).".to_string()
            }
            BuildError::MissingSensor => {
                "What happened: No shunt sensor was provided to the controller.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Check the I2C wiring and [pins] adc_i2c_address/adc_channel.".to_string()
            }
            BuildError::MissingOutput => {
                "What happened: No power output was provided to the controller.\nLikely causes: The output pin failed to initialize or was not wired into the builder.\nHow to fix: Check [pins] power_output.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/ppm_config.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<PpmError>() {
        return match de {
            PpmError::Timeout => "What happened: Shunt ADC read timed out.\nLikely causes: ADS1115 not on the bus, wrong I2C address, or read timeout too low.\nHow to fix: Verify SDA/SCL wiring and power, check pins.adc_i2c_address, or raise sensor.read_timeout_ms.".to_string(),
            PpmError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing [pins] (change_value, advance, power_output) or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            PpmError::State(msg) => format!(
                "What happened: Controller used out of order ({msg}).\nLikely causes: Calibration skipped or repeated within one power cycle.\nHow to fix: Restart the controller; calibration runs once at startup."
            ),
            PpmError::Hardware(msg) | PpmError::HardwareFault(msg) => format!(
                "What happened: A device reported an error ({msg}).\nLikely causes: Loose wiring, missing GPIO/I2C permissions, or a faulty relay.\nHow to fix: Check wiring and permissions, then rerun with --log-level=debug."
            ),
            PpmError::Io(msg) => format!(
                "What happened: I/O failure ({msg}).\nLikely causes: Device node unavailable or permission denied.\nHow to fix: Check that /dev/gpiomem and /dev/i2c-1 exist and are accessible."
            ),
        };
    }

    // String-based heuristics for errors coming from init or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,change_value,advance,raw'.".to_string();
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config FILE pointing to a TOML config. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name of the error class, used in JSON output.
pub fn error_reason(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<PpmError>() {
        Some(PpmError::Config(_)) => "Config",
        Some(PpmError::Timeout) => "Timeout",
        Some(PpmError::Hardware(_) | PpmError::HardwareFault(_) | PpmError::Io(_)) => {
            "Hardware"
        }
        Some(PpmError::State(_)) => "State",
        None => "Error",
    }
}

/// Stable exit codes per error class.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    match error_reason(err) {
        "Config" => 3,
        "Hardware" => 4,
        "Timeout" => 5,
        "State" => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "event": "error",
        "reason": error_reason(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let e = eyre::Report::new(PpmError::Timeout);
        assert_eq!(exit_code_for_error(&e), 5);
        assert!(humanize(&e).starts_with("What happened: Shunt ADC read timed out"));

        let e = eyre::Report::new(BuildError::InvalidConfig("step_ppm must be > 0"));
        assert_eq!(exit_code_for_error(&e), 3);
        assert!(humanize(&e).contains("step_ppm"));

        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), 1);
    }

    #[test]
    fn wrapped_errors_keep_their_class() {
        use eyre::WrapErr;
        let e: eyre::Result<()> = Err(eyre::Report::new(PpmError::Hardware("relay".into())));
        let e = e.wrap_err("activating output").unwrap_err();
        assert_eq!(error_reason(&e), "Hardware");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Hardware");
        assert_eq!(v["event"], "error");
    }
}
