//! Suite harness for running many scenarios.
//!
//! Every scenario gets its own driver from the factory, so scenarios never
//! share form state and may run concurrently. Results are reported in
//! declaration order regardless of completion order.

use crate::driver::DriverFactory;
use crate::runner::{RunResult, ScenarioRunner};
use crate::scenario::Scenario;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Results from running a suite
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteResults {
    /// Individual results in declaration order
    pub results: Vec<RunResult>,
    /// Total duration
    pub duration: Duration,
    /// Number of scenarios handed to the suite
    pub scheduled: usize,
}

impl SuiteResults {
    /// Check if every scheduled scenario ran and passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.skipped() == 0 && self.results.iter().all(RunResult::passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    /// Number of scenarios that ran
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Scenarios not run because of fail-fast
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.scheduled.saturating_sub(self.results.len())
    }

    /// Get failed results
    #[must_use]
    pub fn failures(&self) -> Vec<&RunResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }
}

/// Runs scenario suites
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    runner: ScenarioRunner,
    parallel: usize,
    fail_fast: bool,
}

impl Default for SuiteRunner {
    fn default() -> Self {
        Self::new(ScenarioRunner::default())
    }
}

impl SuiteRunner {
    /// Create a sequential suite runner
    #[must_use]
    pub const fn new(runner: ScenarioRunner) -> Self {
        Self {
            runner,
            parallel: 1,
            fail_fast: false,
        }
    }

    /// Run up to `n` scenarios at once (0 is treated as 1)
    #[must_use]
    pub const fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = if n == 0 { 1 } else { n };
        self
    }

    /// Stop scheduling new scenarios after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Concurrency limit
    #[must_use]
    pub const fn parallel(&self) -> usize {
        self.parallel
    }

    /// Run a suite
    pub async fn run<F>(&self, scenarios: &[Scenario], factory: &F) -> SuiteResults
    where
        F: DriverFactory + ?Sized,
    {
        self.run_with(scenarios, factory, |_| {}).await
    }

    /// Run a suite, calling `observer` as each result is reported.
    ///
    /// With fail-fast, scenarios already in flight finish (and release their
    /// drivers); only scenarios not yet started are skipped.
    pub async fn run_with<F, O>(&self, scenarios: &[Scenario], factory: &F, mut observer: O) -> SuiteResults
    where
        F: DriverFactory + ?Sized,
        O: FnMut(&RunResult),
    {
        let started = Instant::now();
        info!(scenarios = scenarios.len(), parallel = self.parallel, "suite started");

        let stop = AtomicBool::new(false);
        let stop = &stop;
        let runner = &self.runner;
        let mut stream = stream::iter(scenarios)
            .map(|scenario| async move {
                if stop.load(Ordering::SeqCst) {
                    debug!(scenario = scenario.name(), "skipped after failure");
                    return None;
                }
                Some(runner.run_scoped(scenario, factory).await)
            })
            .buffered(self.parallel);

        let mut results = Vec::with_capacity(scenarios.len());
        while let Some(outcome) = stream.next().await {
            let Some(result) = outcome else {
                continue;
            };
            observer(&result);
            if self.fail_fast && !result.passed() {
                stop.store(true, Ordering::SeqCst);
            }
            results.push(result);
        }

        let suite = SuiteResults {
            results,
            duration: started.elapsed(),
            scheduled: scenarios.len(),
        };
        info!(
            passed = suite.passed_count(),
            failed = suite.failed_count(),
            skipped = suite.skipped(),
            "suite finished"
        );
        suite
    }
}

/// Scenarios whose name contains `filter`, in their original order
#[must_use]
pub fn select<'a>(scenarios: &'a [Scenario], filter: Option<&str>) -> Vec<&'a Scenario> {
    match filter {
        Some(pattern) => scenarios
            .iter()
            .filter(|s| s.name().contains(pattern))
            .collect(),
        None => scenarios.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FieldId;
    use crate::driver::{MockBehavior, MockFactory};
    use crate::runner::{FailureKind, RunnerConfig};
    use crate::wait::WaitOptions;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(
            RunnerConfig::new().with_wait(WaitOptions::new().with_timeout(100).with_poll_interval(2)),
        )
    }

    fn passing(name: &str) -> Scenario {
        Scenario::builder(name).submit().expect_invalid(FieldId::Name).build()
    }

    fn failing(name: &str) -> Scenario {
        Scenario::builder(name).submit().expect_invalid(FieldId::Phone).build()
    }

    mod results_tests {
        use super::*;

        #[test]
        fn test_empty_results() {
            let results = SuiteResults::default();
            assert!(results.all_passed());
            assert_eq!(results.total(), 0);
            assert_eq!(results.skipped(), 0);
        }

        #[test]
        fn test_parallel_zero_is_one() {
            assert_eq!(SuiteRunner::default().with_parallel(0).parallel(), 1);
            assert_eq!(SuiteRunner::default().with_parallel(4).parallel(), 4);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_runs_all_in_order() {
            let scenarios = vec![passing("a"), failing("b"), passing("c")];
            let factory = MockFactory::default();
            let suite = SuiteRunner::new(runner()).run(&scenarios, &factory).await;

            let names: Vec<_> = suite.results.iter().map(|r| r.scenario.as_str()).collect();
            assert_eq!(names, ["a", "b", "c"]);
            assert_eq!(suite.passed_count(), 2);
            assert_eq!(suite.failed_count(), 1);
            assert!(!suite.all_passed());
            assert_eq!(suite.failures()[0].scenario, "b");
            assert_eq!(factory.acquired_count(), 3);
            assert_eq!(factory.released_count(), 3);
        }

        #[tokio::test]
        async fn test_parallel_preserves_order() {
            let scenarios: Vec<_> = (0..8).map(|i| passing(&format!("s{i}"))).collect();
            let factory = MockFactory::new(MockBehavior::new().with_settle_polls(3));
            let suite = SuiteRunner::new(runner())
                .with_parallel(4)
                .run(&scenarios, &factory)
                .await;

            assert!(suite.all_passed());
            let names: Vec<_> = suite.results.iter().map(|r| r.scenario.clone()).collect();
            let expected: Vec<_> = (0..8).map(|i| format!("s{i}")).collect();
            assert_eq!(names, expected);
            assert_eq!(factory.released_count(), 8);
        }

        #[tokio::test]
        async fn test_fail_fast_skips_remaining() {
            let scenarios = vec![passing("a"), failing("b"), passing("c"), passing("d")];
            let factory = MockFactory::default();
            let suite = SuiteRunner::new(runner())
                .with_fail_fast()
                .run(&scenarios, &factory)
                .await;

            assert_eq!(suite.total(), 2);
            assert_eq!(suite.skipped(), 2);
            assert!(!suite.all_passed());
            assert_eq!(factory.acquired_count(), factory.released_count());
        }

        #[tokio::test]
        async fn test_observer_sees_every_result() {
            let scenarios = vec![passing("a"), failing("b")];
            let factory = MockFactory::default();
            let mut seen = Vec::new();
            let _ = SuiteRunner::new(runner())
                .run_with(&scenarios, &factory, |r| seen.push((r.scenario.clone(), r.passed())))
                .await;
            assert_eq!(seen, [("a".to_string(), true), ("b".to_string(), false)]);
        }

        #[tokio::test]
        async fn test_acquire_failures_reported_per_scenario() {
            let scenarios = vec![passing("a"), passing("b")];
            let factory = MockFactory::default().failing_acquire();
            let suite = SuiteRunner::new(runner()).run(&scenarios, &factory).await;
            assert_eq!(suite.failed_count(), 2);
            assert!(suite
                .results
                .iter()
                .all(|r| r.failure_kind() == Some(FailureKind::DriverUnavailable)));
        }
    }

    mod select_tests {
        use super::*;

        #[test]
        fn test_select_by_substring() {
            let scenarios = vec![passing("name_rejects_latin"), passing("phone_rejects_space")];
            let picked = select(&scenarios, Some("name"));
            assert_eq!(picked.len(), 1);
            assert_eq!(picked[0].name(), "name_rejects_latin");
            assert_eq!(select(&scenarios, None).len(), 2);
            assert!(select(&scenarios, Some("nothing")).is_empty());
        }
    }
}
