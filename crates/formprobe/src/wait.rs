//! Bounded waits for asynchronous UI updates.
//!
//! Every wait is local to one step: it polls until the target settles or the
//! deadline passes, and a missed deadline is a [`FormError::Timeout`], never
//! a retry.

use crate::result::{FormError, FormResult};
use std::future::Future;
use std::time::{Duration, Instant};

/// Default timeout for observation waits (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default limit for a single driver call (10 seconds)
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 10_000;

/// Options for polling waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// A running polling wait.
///
/// ```ignore
/// let deadline = Deadline::start(&options, "success message");
/// let text = loop {
///     if let Some(text) = driver.observe_success().await? {
///         break text;
///     }
///     deadline.tick().await?;
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    options: WaitOptions,
    waited_for: String,
}

impl Deadline {
    /// Start the clock
    #[must_use]
    pub fn start(options: &WaitOptions, waited_for: impl Into<String>) -> Self {
        Self {
            started: Instant::now(),
            options: *options,
            waited_for: waited_for.into(),
        }
    }

    /// Time spent so far
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.options.timeout().saturating_sub(self.elapsed())
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Sleep one poll interval, or fail if the deadline has passed.
    ///
    /// The last sleep is clamped to the remaining time, so the caller gets
    /// one final observation at the deadline.
    pub async fn tick(&self) -> FormResult<()> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(self.timeout_error());
        }
        tokio::time::sleep(self.options.poll_interval().min(remaining)).await;
        Ok(())
    }

    fn timeout_error(&self) -> FormError {
        FormError::Timeout {
            waited_for: self.waited_for.clone(),
            ms: self.options.timeout_ms,
        }
    }
}

/// Run a single driver call under a time limit
pub async fn within<T, F>(limit: Duration, what: &str, call: F) -> FormResult<T>
where
    F: Future<Output = FormResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(FormError::Timeout {
            waited_for: what.to_string(),
            ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
