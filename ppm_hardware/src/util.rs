use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `done` until it reports true, or fail with `ConversionTimeout` once
/// `timeout` expires. Errors from `done` are returned as-is. Sleeps
/// `poll_interval` between polls to avoid spinning.
pub fn poll_until_with_timeout(
    mut done: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !done()? {
        if Instant::now() >= deadline {
            return Err(HwError::ConversionTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
