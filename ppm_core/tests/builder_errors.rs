use ppm_core::config::{SamplingCfg, SensorCfg, TargetLimits};
use ppm_core::error::BuildError;
use ppm_core::{Controller, ControllerSettings, build_controller};
use ppm_hardware::{ConstantShunt, SimulatedOutput};
use ppm_traits::DigitalInput;
use rstest::rstest;

struct Idle;

impl DigitalInput for Idle {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(false)
    }
}

#[rstest]
fn missing_buttons_yields_typed_build_error() {
    let err = Controller::builder()
        .with_shunt(ConstantShunt(0))
        .with_output(SimulatedOutput::new())
        .try_build()
        .expect_err("should fail with MissingButtons");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingButtons) => {}
        other => panic!("expected MissingButtons, got: {other:?}"),
    }
}

#[rstest]
fn missing_sensor_yields_typed_build_error() {
    let err = Controller::builder()
        .with_buttons(Idle, Idle)
        .with_output(SimulatedOutput::new())
        .try_build()
        .expect_err("should fail with MissingSensor");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingSensor)
    ));
}

#[rstest]
fn missing_output_yields_typed_build_error() {
    let err = Controller::builder()
        .with_buttons(Idle, Idle)
        .with_shunt(ConstantShunt(0))
        .try_build()
        .expect_err("should fail with MissingOutput");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingOutput)
    ));
}

#[rstest]
#[case::ppm_range(ControllerSettings { limits: TargetLimits { min_ppm: 60, ..TargetLimits::default() }, ..ControllerSettings::default() }, "min_ppm")]
#[case::ppm_step(ControllerSettings { limits: TargetLimits { step_ppm: 0, ..TargetLimits::default() }, ..ControllerSettings::default() }, "step_ppm")]
#[case::zero_volume(ControllerSettings { limits: TargetLimits { min_volume_ml: 0, ..TargetLimits::default() }, ..ControllerSettings::default() }, "min_volume_ml")]
#[case::volume_step(ControllerSettings { limits: TargetLimits { step_volume_ml: 0, ..TargetLimits::default() }, ..ControllerSettings::default() }, "step_volume_ml")]
#[case::empty_window(ControllerSettings { sampling: SamplingCfg { samples_per_window: 0, ..SamplingCfg::default() }, ..ControllerSettings::default() }, "samples_per_window")]
#[case::zero_interval(ControllerSettings { sampling: SamplingCfg { interval_ms: 0, ..SamplingCfg::default() }, ..ControllerSettings::default() }, "interval_ms")]
#[case::window_overflow(ControllerSettings { sampling: SamplingCfg { interval_ms: u64::MAX / 4, samples_per_window: 6 }, ..ControllerSettings::default() }, "window length overflows")]
#[case::nan_vref(ControllerSettings { sensor: SensorCfg { v_ref: f32::NAN, ..SensorCfg::default() }, ..ControllerSettings::default() }, "v_ref")]
#[case::zero_shunt(ControllerSettings { sensor: SensorCfg { shunt_ohm: 0.0, ..SensorCfg::default() }, ..ControllerSettings::default() }, "shunt_ohm")]
#[case::zero_adc(ControllerSettings { sensor: SensorCfg { adc_full_scale: 0, ..SensorCfg::default() }, ..ControllerSettings::default() }, "adc_full_scale")]
#[case::inf_offset(ControllerSettings { calibration_offset_ma: Some(f32::INFINITY), ..ControllerSettings::default() }, "calibration offset")]
fn invalid_settings_are_rejected(#[case] settings: ControllerSettings, #[case] needle: &str) {
    let err = build_controller(
        Idle,
        Idle,
        ConstantShunt(0),
        SimulatedOutput::new(),
        settings,
        None,
        None,
    )
    .expect_err("invalid settings");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn defaults_build_with_static_dispatch() {
    let ctrl = build_controller(
        Idle,
        Idle,
        ConstantShunt(0),
        SimulatedOutput::new(),
        ControllerSettings::default(),
        None,
        None,
    )
    .unwrap();
    assert!(!ctrl.is_calibrated());
    assert_eq!(ctrl.session().map(|s| s.ppm_target()), Some(5));
}
