use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use ppm_hardware::error::HwError;
use ppm_hardware::util::poll_until_with_timeout;

#[test]
fn poll_until_success_path() {
    let ready = Arc::new(AtomicBool::new(false));
    let ready_bg = ready.clone();
    // Flip ready after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        ready_bg.store(true, Ordering::Relaxed);
    });

    let res = poll_until_with_timeout(
        || Ok(ready.load(Ordering::Relaxed)),
        Duration::from_millis(50),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn poll_until_timeout_path() {
    let err = poll_until_with_timeout(
        || Ok(false),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::ConversionTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn poll_until_propagates_bus_errors_without_retrying() {
    let calls = AtomicU32::new(0);
    let err = poll_until_with_timeout(
        || {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(HwError::I2c("nack".into()))
        },
        Duration::from_millis(50),
        Duration::from_micros(200),
    )
    .expect_err("expected bus error");

    assert!(matches!(err, HwError::I2c(_)));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}
