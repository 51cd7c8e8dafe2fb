use ppm_core::config::{SamplingCfg, SensorCfg, TargetLimits};
use ppm_core::machine::Action;
use ppm_core::{ButtonEdges, CurrentSensor, Edge, Mode, ModeMachine, StatusEvent};
use rstest::rstest;

const INTERVAL: u64 = 10_000;

// 1 count = 1 mV across 2 ohm, so raw 3 reads 1.5 mA
fn half_milliamp_per_count() -> CurrentSensor {
    CurrentSensor::new(&SensorCfg {
        v_ref: 1.024,
        adc_full_scale: 1024,
        shunt_ohm: 2.0,
    })
}

fn edges(change: bool, advance: bool) -> ButtonEdges {
    let e = |on| if on { Edge::RoseToActive } else { Edge::NoChange };
    ButtonEdges {
        change_value: e(change),
        advance: e(advance),
    }
}

fn running_machine() -> ModeMachine {
    let mut m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    for _ in 0..3 {
        m.handle_edges(0, edges(false, true));
    }
    assert_eq!(m.session().mode(), Mode::Running);
    m
}

fn statuses(actions: &[Action]) -> Vec<StatusEvent> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Status(ev) => Some(*ev),
            _ => None,
        })
        .collect()
}

#[test]
fn power_on_shows_ppm_target() {
    let m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    assert_eq!(
        m.power_on(),
        vec![Action::Status(StatusEvent::ShowPpmTarget { ppm: 5 })]
    );
}

#[test]
fn each_advance_moves_exactly_one_mode() {
    let mut m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    let a = m.handle_edges(0, edges(false, true));
    assert_eq!(m.session().mode(), Mode::SettingVolume);
    assert_eq!(
        statuses(&a),
        vec![StatusEvent::ShowVolumeTarget { volume_ml: 50 }]
    );

    let a = m.handle_edges(0, edges(false, true));
    assert_eq!(m.session().mode(), Mode::AskingStart);
    assert_eq!(
        statuses(&a),
        vec![StatusEvent::ShowAskStart {
            ppm: 5,
            volume_ml: 50
        }]
    );

    // releases never act
    let a = m.handle_edges(
        0,
        ButtonEdges {
            change_value: Edge::FellToInactive,
            advance: Edge::FellToInactive,
        },
    );
    assert!(a.is_empty());
    assert_eq!(m.session().mode(), Mode::AskingStart);
}

#[test]
fn change_value_is_handled_before_advance_in_one_tick() {
    let mut m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    m.handle_edges(0, edges(true, true));
    assert_eq!(m.session().ppm_target(), 10);
    assert_eq!(m.session().volume_target_ml(), 50);
    assert_eq!(m.session().mode(), Mode::SettingVolume);
}

#[test]
fn targets_and_mode_are_locked_once_running() {
    let mut m = running_machine();
    for _ in 0..10 {
        let a = m.handle_edges(5, edges(true, true));
        assert!(a.is_empty());
    }
    assert_eq!(m.session().ppm_target(), 5);
    assert_eq!(m.session().volume_target_ml(), 50);
    assert_eq!(m.session().mode(), Mode::Running);
}

#[test]
fn asking_start_ignores_change_value() {
    let mut m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    m.handle_edges(0, edges(false, true));
    m.handle_edges(0, edges(false, true));
    assert!(m.handle_edges(0, edges(true, false)).is_empty());
    assert_eq!(m.session().ppm_target(), 5);
    assert_eq!(m.session().volume_target_ml(), 50);
}

#[test]
fn finishes_at_the_third_window_and_not_before() {
    // ppm 5, 50 mL, 1.5 mA for one minute -> 2 ppm per window
    let mut m = running_machine();
    let mut finished_at = None;
    for i in 1..=18u64 {
        let now = i * INTERVAL;
        assert!(m.sample_due(now), "sample {i} should be due");
        let actions = m.record_sample(now, 3);
        let ev = statuses(&actions);
        match ev.last() {
            Some(StatusEvent::ShowFinished { elapsed_ppm }) => {
                assert!(actions.contains(&Action::DeactivateOutput));
                assert!(*elapsed_ppm >= 5.0);
                finished_at = Some(i);
            }
            _ => {
                assert!(!actions.contains(&Action::DeactivateOutput));
                assert_eq!(m.session().mode(), Mode::Running);
            }
        }
    }
    assert_eq!(finished_at, Some(18));
    assert_eq!(m.session().mode(), Mode::Finished);
    assert!(!m.session().output_active());
    assert_eq!(m.accumulator().windows_completed(), 3);

    // frozen afterwards
    assert!(!m.sample_due(u64::MAX));
    assert!(m.record_sample(u64::MAX, 1000).is_empty());
    assert!(m.handle_edges(0, edges(true, true)).is_empty());
}

#[test]
fn progress_is_reported_only_at_window_boundaries() {
    let mut m = running_machine();
    let mut progress = Vec::new();
    for i in 1..=12u64 {
        for ev in statuses(&m.record_sample(i * INTERVAL, 1)) {
            if let StatusEvent::ShowRunningProgress {
                elapsed_ppm,
                elapsed_minutes,
            } = ev
            {
                progress.push((i, elapsed_ppm, elapsed_minutes));
            }
        }
    }
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].0, 6);
    assert_eq!(progress[1].0, 12);
    assert!(progress[1].1 >= progress[0].1);
    assert!((progress[1].2 - 2.0).abs() < 1e-5);
}

#[rstest]
#[case(0, false)]
#[case(INTERVAL - 1, false)]
#[case(INTERVAL, true)]
#[case(INTERVAL * 3, true)]
fn sampling_clock_starts_when_running(#[case] after: u64, #[case] due: bool) {
    let mut m = ModeMachine::new(
        TargetLimits::default(),
        SamplingCfg::default(),
        half_milliamp_per_count(),
    );
    m.handle_edges(0, edges(false, true));
    m.handle_edges(0, edges(false, true));
    m.handle_edges(70_000, edges(false, true));
    assert_eq!(m.sample_due(70_000 + after), due);
}

#[test]
fn negative_corrected_current_never_lowers_elapsed_ppm() {
    let mut m = running_machine();
    // offset larger than the live reading: every sample goes negative
    m.set_calibration_offset(10.0);
    for i in 1..=6u64 {
        m.record_sample(i * INTERVAL, 3);
    }
    assert!(m.accumulator().elapsed_ppm().abs() < f32::EPSILON);
    assert_eq!(m.session().mode(), Mode::Running);

    m.set_calibration_offset(0.0);
    for i in 7..=12u64 {
        m.record_sample(i * INTERVAL, 3);
    }
    let after_positive = m.accumulator().elapsed_ppm();
    assert!(after_positive > 1.9);

    m.set_calibration_offset(10.0);
    for i in 13..=18u64 {
        m.record_sample(i * INTERVAL, 3);
    }
    assert!((m.accumulator().elapsed_ppm() - after_positive).abs() < f32::EPSILON);
}

#[test]
fn measurement_carries_corrected_current() {
    let mut m = running_machine();
    m.set_calibration_offset(0.5);
    let ev = statuses(&m.record_sample(INTERVAL, 3));
    match ev.first() {
        Some(StatusEvent::Measurement {
            current_ma,
            output_active,
            ..
        }) => {
            assert!(*output_active);
            assert!((current_ma - 1.0).abs() < 1e-4);
        }
        other => panic!("expected measurement, got {other:?}"),
    }
}
