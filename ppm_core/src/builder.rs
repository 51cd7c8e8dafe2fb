//! Type-state builder for `Controller` and generic `build_controller` constructor.
//!
//! The builder enforces at compile time that buttons, the shunt input and the
//! power output are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use ppm_traits::{AnalogInput, Clock, DigitalInput, MonotonicClock, PowerOutput};

use crate::bench::BenchStation;
use crate::calibration::Calibration;
use crate::config::{DebounceCfg, OperatingProfile, SamplingCfg, SensorCfg, TargetLimits};
use crate::core::{ControllerCore, Strategy};
use crate::debounce::Debouncer;
use crate::error::{BuildError, Result};
use crate::machine::ModeMachine;
use crate::runner::{RunParams, RunSummary};
use crate::sensor::CurrentSensor;
use crate::session::{Mode, Session};
use crate::status::{StatusSink, TickStatus, TracingSink};

type BoxedCore = ControllerCore<
    Box<dyn DigitalInput>,
    Box<dyn DigitalInput>,
    Box<dyn AnalogInput>,
    Box<dyn PowerOutput>,
>;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Boxed controller used by the CLI, where devices are chosen at runtime.
pub struct Controller {
    pub(crate) inner: BoxedCore,
}

impl core::fmt::Debug for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.inner, f)
    }
}

impl Controller {
    /// Start building a Controller.
    pub fn builder() -> ControllerBuilder<Missing, Missing, Missing> {
        ControllerBuilder::default()
    }

    pub fn profile(&self) -> OperatingProfile {
        self.inner.profile()
    }

    pub fn session(&self) -> Option<&Session> {
        self.inner.session()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.inner.mode()
    }

    pub fn elapsed_ppm(&self) -> f32 {
        self.inner.elapsed_ppm()
    }

    pub fn elapsed_minutes(&self) -> f32 {
        self.inner.elapsed_minutes()
    }

    pub fn output_active(&self) -> bool {
        self.inner.output_active()
    }

    pub fn is_calibrated(&self) -> bool {
        self.inner.is_calibrated()
    }

    pub fn calibration(&self) -> Calibration {
        self.inner.calibration()
    }

    pub fn now_ms(&self) -> u64 {
        self.inner.now_ms()
    }

    pub fn sleep(&self, d: Duration) {
        self.inner.sleep(d);
    }

    /// Measure the leakage baseline; returns the offset in mA.
    pub fn calibrate(&mut self) -> Result<f32> {
        self.inner.calibrate()
    }

    pub fn power_on(&mut self) {
        self.inner.power_on();
    }

    /// One scheduler step.
    pub fn tick(&mut self) -> Result<TickStatus> {
        self.inner.tick()
    }

    /// Switch the output off (best-effort).
    pub fn shutdown(&mut self) {
        self.inner.shutdown();
    }

    /// Calibrate if needed, then tick until finished or stopped.
    pub fn run(
        &mut self,
        params: RunParams,
        shutdown: &std::sync::atomic::AtomicBool,
    ) -> Result<RunSummary> {
        crate::runner::run(&mut self.inner, params, shutdown)
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Controller`. All settings are validated on `build()`.
pub struct ControllerBuilder<B, A, O> {
    change_button: Option<Box<dyn DigitalInput>>,
    advance_button: Option<Box<dyn DigitalInput>>,
    analog: Option<Box<dyn AnalogInput>>,
    output: Option<Box<dyn PowerOutput>>,
    settings: ControllerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    sink: Option<Box<dyn StatusSink>>,
    _b: PhantomData<B>,
    _a: PhantomData<A>,
    _o: PhantomData<O>,
}

impl Default for ControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            change_button: None,
            advance_button: None,
            analog: None,
            output: None,
            settings: ControllerSettings::default(),
            clock: None,
            sink: None,
            _b: PhantomData,
            _a: PhantomData,
            _o: PhantomData,
        }
    }
}

/// Everything besides devices, clock and sink that shapes a controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerSettings {
    pub limits: TargetLimits,
    pub sampling: SamplingCfg,
    pub sensor: SensorCfg,
    pub debounce: DebounceCfg,
    pub profile: OperatingProfile,
    /// Pinned leakage baseline; skips the startup measurement.
    pub calibration_offset_ma: Option<f32>,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate settings and construct a `ControllerCore`.
///
/// Single source of truth for validation and construction, used by both
/// `ControllerBuilder::try_build()` and `build_controller()`.
fn validate_and_build<C, V, A, O>(
    change_button: C,
    advance_button: V,
    analog: A,
    output: O,
    settings: ControllerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    sink: Option<Box<dyn StatusSink>>,
) -> Result<ControllerCore<C, V, A, O>>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    let ControllerSettings {
        limits,
        sampling,
        sensor,
        debounce,
        profile,
        calibration_offset_ma,
    } = settings;

    // ── Validation ───────────────────────────────────────────────────────────
    if limits.min_ppm > limits.max_ppm {
        return Err(invalid("min_ppm must be <= max_ppm"));
    }
    if limits.step_ppm == 0 {
        return Err(invalid("step_ppm must be > 0"));
    }
    if limits.min_volume_ml == 0 {
        return Err(invalid("min_volume_ml must be > 0"));
    }
    if limits.min_volume_ml > limits.max_volume_ml {
        return Err(invalid("min_volume_ml must be <= max_volume_ml"));
    }
    if limits.step_volume_ml == 0 {
        return Err(invalid("step_volume_ml must be > 0"));
    }
    if sampling.samples_per_window == 0 {
        return Err(invalid("samples_per_window must be >= 1"));
    }
    if sampling.interval_ms == 0 {
        return Err(invalid("sample interval_ms must be >= 1"));
    }
    if sampling
        .interval_ms
        .checked_mul(u64::from(sampling.samples_per_window))
        .is_none()
    {
        return Err(invalid("sampling window length overflows"));
    }
    if !(sensor.v_ref.is_finite() && sensor.v_ref > 0.0) {
        return Err(invalid("v_ref must be finite and > 0"));
    }
    if !(sensor.shunt_ohm.is_finite() && sensor.shunt_ohm > 0.0) {
        return Err(invalid("shunt_ohm must be finite and > 0"));
    }
    if sensor.adc_full_scale == 0 {
        return Err(invalid("adc_full_scale must be >= 1"));
    }
    if calibration_offset_ma.is_some_and(|ma| !ma.is_finite()) {
        return Err(invalid("calibration offset must be finite"));
    }

    // ── Assemble ─────────────────────────────────────────────────────────────
    let current = CurrentSensor::new(&sensor);
    let strategy = match profile {
        OperatingProfile::Dosing => {
            Strategy::Dosing(ModeMachine::new(limits, sampling, current))
        }
        OperatingProfile::Bench => {
            Strategy::Bench(BenchStation::new(current, sampling.interval_ms))
        }
    };

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let mut core = ControllerCore {
        change_button,
        advance_button,
        analog,
        output,
        change_db: Debouncer::new(false),
        advance_db: Debouncer::new(false),
        strategy,
        sensor: current,
        debounce,
        calibration: Calibration::Pending,
        clock,
        epoch,
        sink: sink.unwrap_or_else(|| Box::new(TracingSink)),
        powered_on: false,
    };
    if let Some(ma) = calibration_offset_ma {
        tracing::info!(offset_ma = ma, "using pinned calibration offset");
        core.calibration = Calibration::Pinned(ma);
        core.apply_offset(ma);
    }
    Ok(core)
}

impl<B, A, O> ControllerBuilder<B, A, O> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Controller> {
        let (change, advance) = self
            .change_button
            .zip(self.advance_button)
            .ok_or_else(|| eyre::Report::new(BuildError::MissingButtons))?;
        let analog = self
            .analog
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let output = self
            .output
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOutput))?;

        let inner = validate_and_build(
            change,
            advance,
            analog,
            output,
            self.settings,
            self.clock,
            self.sink,
        )?;
        Ok(Controller { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<B, A, O> ControllerBuilder<B, A, O> {
    pub fn with_limits(mut self, limits: TargetLimits) -> Self {
        self.settings.limits = limits;
        self
    }
    pub fn with_sampling(mut self, sampling: SamplingCfg) -> Self {
        self.settings.sampling = sampling;
        self
    }
    pub fn with_sensor(mut self, sensor: SensorCfg) -> Self {
        self.settings.sensor = sensor;
        self
    }
    pub fn with_debounce(mut self, debounce: DebounceCfg) -> Self {
        self.settings.debounce = debounce;
        self
    }
    pub fn with_profile(mut self, profile: OperatingProfile) -> Self {
        self.settings.profile = profile;
        self
    }
    /// Pin the leakage baseline instead of measuring it at startup.
    pub fn with_calibration_offset(mut self, offset_ma: f32) -> Self {
        self.settings.calibration_offset_ma = Some(offset_ma);
        self
    }
    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Status sink; defaults to `TracingSink`.
    pub fn with_sink(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

// Setters that advance type-state
impl<A, O> ControllerBuilder<Missing, A, O> {
    pub fn with_buttons(
        self,
        change_value: impl DigitalInput + 'static,
        advance: impl DigitalInput + 'static,
    ) -> ControllerBuilder<Set, A, O> {
        ControllerBuilder {
            change_button: Some(Box::new(change_value)),
            advance_button: Some(Box::new(advance)),
            analog: self.analog,
            output: self.output,
            settings: self.settings,
            clock: self.clock,
            sink: self.sink,
            _b: PhantomData,
            _a: PhantomData,
            _o: PhantomData,
        }
    }
}

impl<B, O> ControllerBuilder<B, Missing, O> {
    pub fn with_shunt(self, analog: impl AnalogInput + 'static) -> ControllerBuilder<B, Set, O> {
        ControllerBuilder {
            change_button: self.change_button,
            advance_button: self.advance_button,
            analog: Some(Box::new(analog)),
            output: self.output,
            settings: self.settings,
            clock: self.clock,
            sink: self.sink,
            _b: PhantomData,
            _a: PhantomData,
            _o: PhantomData,
        }
    }
}

impl<B, A> ControllerBuilder<B, A, Missing> {
    pub fn with_output(self, output: impl PowerOutput + 'static) -> ControllerBuilder<B, A, Set> {
        ControllerBuilder {
            change_button: self.change_button,
            advance_button: self.advance_button,
            analog: self.analog,
            output: Some(Box::new(output)),
            settings: self.settings,
            clock: self.clock,
            sink: self.sink,
            _b: PhantomData,
            _a: PhantomData,
            _o: PhantomData,
        }
    }
}

impl ControllerBuilder<Set, Set, Set> {
    /// Validate and build the Controller. Only available when all devices are set.
    pub fn build(self) -> Result<Controller> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type ControllerG<C, V, A, O> = ControllerCore<C, V, A, O>;

/// Build a statically-dispatched controller from concrete devices.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_controller<C, V, A, O>(
    change_button: C,
    advance_button: V,
    analog: A,
    output: O,
    settings: ControllerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    sink: Option<Box<dyn StatusSink>>,
) -> Result<ControllerG<C, V, A, O>>
where
    C: DigitalInput,
    V: DigitalInput,
    A: AnalogInput,
    O: PowerOutput,
{
    validate_and_build(
        change_button,
        advance_button,
        analog,
        output,
        settings,
        clock,
        sink,
    )
}
