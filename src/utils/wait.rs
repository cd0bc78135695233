use crate::core::{DriverTrait, Locator};
use crate::errors::Result;
use std::time::{Duration, Instant};

/// Poll for element presence until the timeout elapses.
///
/// Returns `Ok(false)` on timeout; callers decide whether absence is an
/// error for them.
pub async fn wait_for_present<D: DriverTrait>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool> {
    let start_time = Instant::now();

    loop {
        if driver.is_element_present(locator).await? {
            return Ok(true);
        }
        if start_time.elapsed() >= timeout {
            return Ok(false);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Poll a boolean JavaScript condition until it holds or the timeout elapses.
pub async fn wait_for_condition<D: DriverTrait>(
    driver: &D,
    condition: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool> {
    let start_time = Instant::now();

    while start_time.elapsed() < timeout {
        let result = driver.execute_script(condition).await?;
        if result.as_bool().unwrap_or(false) {
            return Ok(true);
        }
        tokio::time::sleep(poll_interval).await;
    }

    Ok(false)
}
