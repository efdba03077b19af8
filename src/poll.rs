//! Poller
//!
//! Bounded retry of a condition against the live page. A condition yields
//! `Ok(Some(value))` when satisfied and `Ok(None)` to be asked again. Stale
//! element and click-intercepted races are swallowed and retried; any other
//! error stops polling immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::report::FailureReporter;

/// What happens when a poll deadline elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Raise a recoverable step failure with message and screenshot
    Recoverable,
    /// Raise a run-aborting failure; the page is unusable
    StopRun,
    /// Yield `None` silently; absence is a valid outcome
    ReturnNull,
}

impl TimeoutPolicy {
    /// Turn an elapsed deadline into this policy's outcome
    pub async fn apply<T>(self, reporter: &FailureReporter<'_>, timeout: Error) -> Result<Option<T>> {
        match self {
            TimeoutPolicy::ReturnNull => {
                tracing::debug!("{}, returning nothing", timeout);
                Ok(None)
            }
            TimeoutPolicy::Recoverable => Err(reporter.timeout_failure(timeout).await),
            TimeoutPolicy::StopRun => Err(reporter.stop_run(timeout).await),
        }
    }
}

/// Bounded-retry evaluator
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    timeout: Duration,
    interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Deadline measured from the first attempt
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate `condition` until it yields a value
    ///
    /// Always makes at least one attempt. Fails with [`Error::Timeout`] once the
    /// deadline has elapsed.
    pub async fn until<T, F, Fut>(&self, mut condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match condition().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    tracing::debug!("attempt {} hit transient error: {}", attempts, e);
                }
                Err(e) => return Err(e),
            }

            if start.elapsed() >= self.timeout {
                tracing::debug!("gave up after {} attempts", attempts);
                return Err(Error::Timeout {
                    after: self.timeout,
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Evaluate `condition` and apply `policy` when the deadline elapses
    pub async fn poll<T, F, Fut>(
        &self,
        policy: TimeoutPolicy,
        reporter: &FailureReporter<'_>,
        condition: F,
    ) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.until(condition).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_timeout() => policy.apply(reporter, e).await,
            Err(e) => Err(e),
        }
    }
}
