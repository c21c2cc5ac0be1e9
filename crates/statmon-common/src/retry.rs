use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Fixed backoff schedule for transient failures.
///
/// The default schedule is the one used everywhere in statmon: three retries
/// after 1s, 3s, and 5s, i.e. up to four attempts total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// No retries; the operation runs exactly once.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

/// Runs `op` until it succeeds, returns a terminal error, or the schedule is
/// exhausted. Retries are abandoned immediately when `cancel` fires; the last
/// error is returned in that case.
///
/// `is_retryable` classifies errors: transient transport/file failures retry,
/// validation and integrity failures must report `false` and surface at once.
pub async fn retry<T, E, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    is_retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> Fut,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    let mut used = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_retryable(&e) || used >= policy.delays.len() || cancel.is_cancelled() {
                    return Err(e);
                }
                let delay = policy.delays[used];
                used += 1;
                tracing::warn!(
                    attempt = used,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => return Err(e),
                }
            }
        }
    }
}

/// Blocking variant for synchronous file I/O paths (snapshot writes).
pub fn retry_blocking<T, E>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: std::fmt::Display,
{
    let mut used = 0usize;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_retryable(&e) || used >= policy.delays.len() {
                    return Err(e);
                }
                let delay = policy.delays[used];
                used += 1;
                tracing::warn!(
                    attempt = used,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "transient failure, retrying"
                );
                std::thread::sleep(delay);
            }
        }
    }
}
