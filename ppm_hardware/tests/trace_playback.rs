use std::sync::Arc;
use std::time::Duration;

use ppm_hardware::{TracePlayback, TraceStep};
use ppm_traits::{AnalogInput, DigitalInput, ManualClock};
use rstest::rstest;

fn step(at_ms: u64, change_value: bool, advance: bool, raw: u16) -> TraceStep {
    TraceStep {
        at_ms,
        change_value,
        advance,
        raw,
    }
}

#[rstest]
#[case(0, false, false, 3)]
#[case(99, false, false, 3)]
#[case(100, true, false, 3)]
#[case(149, true, false, 3)]
#[case(150, false, true, 220)]
#[case(10_000, false, true, 220)]
fn playback_holds_last_step_until_next(
    #[case] at_ms: u64,
    #[case] change: bool,
    #[case] advance: bool,
    #[case] raw: u16,
) {
    let clock = ManualClock::new();
    let playback = TracePlayback::new(
        vec![
            step(150, false, true, 220),
            step(0, false, false, 3),
            step(100, true, false, 3),
        ],
        Arc::new(clock.clone()),
    );
    let mut change_btn = playback.change_value_button();
    let mut advance_btn = playback.advance_button();
    let mut shunt = playback.shunt();

    clock.advance(Duration::from_millis(at_ms));
    assert_eq!(change_btn.is_active().unwrap(), change);
    assert_eq!(advance_btn.is_active().unwrap(), advance);
    assert_eq!(shunt.read_raw().unwrap(), raw);
}

#[test]
fn before_first_step_everything_reads_idle() {
    let clock = ManualClock::new();
    let playback = TracePlayback::new(vec![step(500, true, true, 900)], Arc::new(clock.clone()));
    let mut btn = playback.change_value_button();
    clock.advance(Duration::from_millis(499));
    assert!(!btn.is_active().unwrap());
    clock.advance(Duration::from_millis(1));
    assert!(btn.is_active().unwrap());
}
