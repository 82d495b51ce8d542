//! Politeness gate for outbound platform API calls.
//!
//! One gate is shared process-wide across discovery and snapshot activity:
//! a fixed permit count bounds in-flight calls, every call carries a timeout,
//! and transient failures are retried with a fixed backoff. Permanent
//! failures are returned immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::app::{RankError, Result};

pub const DEFAULT_PERMITS: usize = 5;
pub const DEFAULT_ATTEMPTS: usize = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 800;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct RateGate {
    semaphore: Arc<Semaphore>,
    attempts: usize,
    backoff: Duration,
    timeout: Duration,
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(
            DEFAULT_PERMITS,
            DEFAULT_ATTEMPTS,
            Duration::from_millis(DEFAULT_BACKOFF_MS),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }
}

impl RateGate {
    pub fn new(permits: usize, attempts: usize, backoff: Duration, timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            attempts: attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Run one connector call under the gate.
    ///
    /// Holds a permit for the whole retry sequence so a flapping upstream
    /// cannot multiply in-flight calls.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RankError::Other("Rate gate closed".to_string()))?;

        let strategy = FixedInterval::new(self.backoff).take(self.attempts - 1);
        let timeout = self.timeout;

        RetryIf::spawn(
            strategy,
            || async {
                match tokio::time::timeout(timeout, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(RankError::Timeout(timeout.as_secs())),
                }
            },
            |e: &RankError| {
                let transient = e.is_transient();
                if transient {
                    tracing::debug!("Retrying transient connector failure: {}", e);
                }
                transient
            },
        )
        .await
    }
}
