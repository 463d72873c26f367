//! Bounded-attempt retry with jittered backoff.

use std::future::Future;
use std::time::Duration;

use megafarm_core::config::PauseRange;
use megafarm_core::error::Result;
use megafarm_core::types::TaskOutcome;

/// Invoke `op` up to `attempts` times, returning early on the first
/// successful outcome. Between attempts (never after the last) sleeps
/// a uniform duration drawn from `pause`. If every attempt fails, the
/// last outcome is returned as-is — callers inspect it rather than
/// catching anything. An `Err` from `op` is unexpected breakage and
/// propagates immediately.
///
/// The attempt count is honored exactly as configured.
pub async fn with_retry<F, Fut>(
    attempts: u32,
    pause: PauseRange,
    account_index: usize,
    mut op: F,
) -> Result<TaskOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TaskOutcome>>,
{
    let attempts = attempts.max(1);
    let mut last = TaskOutcome::failed();
    for attempt in 1..=attempts {
        let outcome = op().await?;
        if outcome.success {
            return Ok(outcome);
        }
        last = outcome;
        if attempt < attempts {
            let secs = pause.pick(&mut rand::thread_rng());
            tracing::info!(
                "[{account_index}] Sleeping {secs}s before attempt {}/{attempts}...",
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
    Ok(last)
}
