//! Scenario runner.
//!
//! Replays a [`Scenario`] against a [`FormDriver`], mirroring every mutation
//! into a [`FormState`] so each assertion step can be checked against the
//! contract's prediction for the same state.
//!
//! Per run: `NotStarted -> Running -> {Passed, Failed}`. The first failure is
//! terminal; nothing is retried.

use crate::contract::{FieldId, ValidationContract, ValidationOutcome, SUCCESS_MESSAGE};
use crate::driver::{DriverFactory, FormDriver};
use crate::result::{FormError, FormResult};
use crate::scenario::{Scenario, Step};
use crate::state::FormState;
use crate::wait::{self, Deadline, WaitOptions, DEFAULT_STEP_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Polling for observation steps
    pub wait: WaitOptions,
    /// Limit for each individual driver call
    pub step_timeout_ms: u64,
    /// Exact text expected on success
    pub success_message: String,
    /// Rules used to predict outcomes
    pub contract: ValidationContract,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            success_message: SUCCESS_MESSAGE.to_string(),
            contract: ValidationContract::standard(),
        }
    }
}

impl RunnerConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set observation wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set the per-call limit
    #[must_use]
    pub const fn with_step_timeout(mut self, ms: u64) -> Self {
        self.step_timeout_ms = ms;
        self
    }

    /// Set the expected success message
    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    /// Set the contract
    #[must_use]
    pub fn with_contract(mut self, contract: ValidationContract) -> Self {
        self.contract = contract;
        self
    }

    /// Per-call limit as Duration
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

/// Lifecycle of one scenario execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started yet
    NotStarted,
    /// Executing steps
    Running,
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed,
}

impl RunState {
    /// Check if the state is terminal
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    fn start(self) -> Self {
        debug_assert_eq!(self, Self::NotStarted);
        Self::Running
    }

    fn finish(self, passed: bool) -> Self {
        debug_assert!(!self.is_terminal());
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Observed outcome differs from the contract's prediction
    AssertionMismatch,
    /// The target flagged more than one field at once
    MultipleInvalid,
    /// An observation or driver call exceeded its bound
    DriverTimeout,
    /// The driver could not be acquired or released
    DriverUnavailable,
    /// A driver call failed
    DriverError,
    /// The scenario's declared expectation contradicts the contract
    ExpectationConflict,
    /// The scenario is malformed
    InvalidScenario,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AssertionMismatch => "assertion mismatch",
            Self::MultipleInvalid => "multiple invalid fields",
            Self::DriverTimeout => "driver timeout",
            Self::DriverUnavailable => "driver unavailable",
            Self::DriverError => "driver error",
            Self::ExpectationConflict => "expectation conflicts with contract",
            Self::InvalidScenario => "invalid scenario",
        };
        f.write_str(s)
    }
}

/// Details of the failure that ended a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Failure category
    pub kind: FailureKind,
    /// Index of the failing step, if the failure belongs to a step
    pub step_index: Option<usize>,
    /// Failing step description
    pub step: Option<String>,
    /// Expected value, for mismatches
    pub expected: Option<String>,
    /// Actual value, for mismatches
    pub actual: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl RunFailure {
    /// Create a failure without expected/actual values
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            step_index: None,
            step: None,
            expected: None,
            actual: None,
            message: message.into(),
        }
    }

    /// Create an expected-vs-actual failure
    #[must_use]
    pub fn mismatch(kind: FailureKind, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        let expected = expected.to_string();
        let actual = actual.to_string();
        Self {
            message: format!("expected {expected}, got {actual}"),
            expected: Some(expected),
            actual: Some(actual),
            ..Self::new(kind, String::new())
        }
    }

    /// Classify a driver error
    #[must_use]
    pub fn from_driver_error(error: FormError) -> Self {
        let kind = match error {
            FormError::Timeout { .. } => FailureKind::DriverTimeout,
            FormError::DriverUnavailable { .. } => FailureKind::DriverUnavailable,
            _ => FailureKind::DriverError,
        };
        Self::new(kind, error.to_string())
    }

    /// Attach the failing step
    #[must_use]
    pub fn at(mut self, index: usize, step: &Step) -> Self {
        self.step_index = Some(index);
        self.step = Some(step.to_string());
        self
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.step_index, &self.step) {
            (Some(index), Some(step)) => {
                write!(f, "step {} ({step}): {}: {}", index + 1, self.kind, self.message)
            }
            _ => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Outcome of one scenario execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Scenario name
    pub scenario: String,
    /// Terminal state
    pub state: RunState,
    /// Steps completed successfully
    pub steps_executed: usize,
    /// Wall-clock duration
    pub duration: Duration,
    /// Failure details when failed
    pub failure: Option<RunFailure>,
}

impl RunResult {
    fn passed_run(scenario: &Scenario, duration: Duration) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            state: RunState::Passed,
            steps_executed: scenario.steps().len(),
            duration,
            failure: None,
        }
    }

    fn failed_run(
        scenario: &Scenario,
        steps_executed: usize,
        duration: Duration,
        failure: RunFailure,
    ) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            state: RunState::Failed,
            steps_executed,
            duration,
            failure: Some(failure),
        }
    }

    /// Check if the run passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }

    /// Failure category, if failed
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}

/// Replays scenarios against form drivers
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a scenario on a driver the caller owns. The driver is not released.
    pub async fn run<D>(&self, scenario: &Scenario, driver: &mut D) -> RunResult
    where
        D: FormDriver + ?Sized,
    {
        let started = Instant::now();
        let mut state = RunState::NotStarted;

        if let Err(e) = scenario.validate() {
            warn!(scenario = scenario.name(), error = %e, "rejecting malformed scenario");
            let failure = RunFailure::new(FailureKind::InvalidScenario, e.to_string());
            return RunResult::failed_run(scenario, 0, started.elapsed(), failure);
        }

        state = state.start();
        info!(
            scenario = scenario.name(),
            backend = driver.backend(),
            steps = scenario.steps().len(),
            "scenario started"
        );

        let mut mirror = FormState::new();
        for (index, step) in scenario.steps().iter().enumerate() {
            debug!(scenario = scenario.name(), step = index + 1, "{step}");
            if let Err(failure) = self.execute(step, &mut mirror, driver).await {
                let failure = failure.at(index, step);
                state = state.finish(false);
                warn!(scenario = scenario.name(), %state, "{failure}");
                return RunResult::failed_run(scenario, index, started.elapsed(), failure);
            }
        }

        state = state.finish(true);
        info!(scenario = scenario.name(), %state, elapsed = ?started.elapsed(), "scenario finished");
        RunResult::passed_run(scenario, started.elapsed())
    }

    /// Acquire a driver, run the scenario, and release the driver on every
    /// exit path.
    ///
    /// A release failure after an otherwise passing run fails the run with
    /// [`FailureKind::DriverUnavailable`].
    pub async fn run_scoped<F>(&self, scenario: &Scenario, factory: &F) -> RunResult
    where
        F: DriverFactory + ?Sized,
    {
        let started = Instant::now();
        let limit = self.config.step_timeout();
        let acquired = wait::within(limit, "driver acquire", factory.acquire()).await;
        let mut driver = match acquired {
            Ok(driver) => driver,
            Err(e) => {
                warn!(scenario = scenario.name(), error = %e, "could not acquire driver");
                let failure = RunFailure::new(FailureKind::DriverUnavailable, e.to_string());
                return RunResult::failed_run(scenario, 0, started.elapsed(), failure);
            }
        };

        let mut result = self.run(scenario, &mut driver).await;

        let released = wait::within(limit, "driver release", driver.release()).await;
        if let Err(e) = released {
            warn!(scenario = scenario.name(), error = %e, "could not release driver");
            if result.passed() {
                result.state = RunState::Failed;
                result.failure = Some(RunFailure::new(FailureKind::DriverUnavailable, e.to_string()));
            }
        }

        result.duration = started.elapsed();
        result
    }

    async fn execute<D>(&self, step: &Step, mirror: &mut FormState, driver: &mut D) -> Result<(), RunFailure>
    where
        D: FormDriver + ?Sized,
    {
        match step {
            Step::SetField { field, value } => {
                mirror.set_field(*field, value.as_str());
                self.call("set_field_value", driver.set_field_value(*field, value)).await
            }
            Step::SetAgreement { checked } => {
                mirror.set_agreement(*checked);
                self.call("set_agreement", driver.set_agreement(*checked)).await
            }
            Step::Submit => self.call("submit", driver.submit()).await,
            Step::ExpectInvalid { field } => self.expect_invalid(*field, mirror, driver).await,
            Step::ExpectSuccess => self.expect_success(mirror, driver).await,
        }
    }

    async fn expect_invalid<D>(&self, field: FieldId, mirror: &FormState, driver: &mut D) -> Result<(), RunFailure>
    where
        D: FormDriver + ?Sized,
    {
        let expected = ValidationOutcome::FirstInvalid(field);
        self.check_prediction(expected, mirror)?;

        match self.observe_settled(driver, format!("field '{field}' to be flagged")).await? {
            Settled::Flagged(flagged) if flagged.len() > 1 => Err(RunFailure::mismatch(
                FailureKind::MultipleInvalid,
                expected,
                format_fields(&flagged),
            )),
            Settled::Flagged(flagged) => {
                let actual = flagged
                    .iter()
                    .next()
                    .copied()
                    .map_or(ValidationOutcome::AllValid, ValidationOutcome::FirstInvalid);
                if actual == expected {
                    Ok(())
                } else {
                    Err(RunFailure::mismatch(FailureKind::AssertionMismatch, expected, actual))
                }
            }
            Settled::Success(_) => Err(RunFailure::mismatch(
                FailureKind::AssertionMismatch,
                expected,
                ValidationOutcome::AllValid,
            )),
        }
    }

    async fn expect_success<D>(&self, mirror: &FormState, driver: &mut D) -> Result<(), RunFailure>
    where
        D: FormDriver + ?Sized,
    {
        self.check_prediction(ValidationOutcome::AllValid, mirror)?;

        match self.observe_settled(driver, "success message").await? {
            Settled::Flagged(flagged) => {
                let kind = if flagged.len() > 1 {
                    FailureKind::MultipleInvalid
                } else {
                    FailureKind::AssertionMismatch
                };
                Err(RunFailure::mismatch(kind, ValidationOutcome::AllValid, format_fields(&flagged)))
            }
            Settled::Success(text) => {
                let text = text.trim();
                if text == self.config.success_message {
                    Ok(())
                } else {
                    Err(RunFailure::mismatch(
                        FailureKind::AssertionMismatch,
                        format!("{:?}", self.config.success_message),
                        format!("{text:?}"),
                    ))
                }
            }
        }
    }

    /// Poll until the target shows either a flagged field or the success
    /// indicator. Flagged fields win when both are visible.
    async fn observe_settled<D>(&self, driver: &mut D, waited_for: impl Into<String>) -> Result<Settled, RunFailure>
    where
        D: FormDriver + ?Sized,
    {
        let deadline = Deadline::start(&self.config.wait, waited_for);
        loop {
            let flagged = self.observe_invalid(driver).await?;
            if !flagged.is_empty() {
                return Ok(Settled::Flagged(flagged));
            }
            if let Some(text) = self.call("observe_success", driver.observe_success()).await? {
                return Ok(Settled::Success(text));
            }
            deadline.tick().await.map_err(RunFailure::from_driver_error)?;
        }
    }

    /// The declared expectation must agree with the contract for the mirrored state
    fn check_prediction(&self, expected: ValidationOutcome, mirror: &FormState) -> Result<(), RunFailure> {
        let predicted = self.config.contract.first_invalid(mirror);
        if predicted == expected {
            Ok(())
        } else {
            let mut failure = RunFailure::mismatch(FailureKind::ExpectationConflict, expected, predicted);
            failure.message = format!("scenario expects {expected} but the contract predicts {predicted}");
            Err(failure)
        }
    }

    async fn observe_invalid<D>(&self, driver: &mut D) -> Result<BTreeSet<FieldId>, RunFailure>
    where
        D: FormDriver + ?Sized,
    {
        self.call("observe_invalid_fields", driver.observe_invalid_fields()).await
    }

    async fn call<T>(&self, what: &str, call: impl Future<Output = FormResult<T>>) -> Result<T, RunFailure> {
        wait::within(self.config.step_timeout(), what, call)
            .await
            .map_err(RunFailure::from_driver_error)
    }
}

/// What the target rendered once it settled after a submit
enum Settled {
    Flagged(BTreeSet<FieldId>),
    Success(String),
}

fn format_fields(fields: &BTreeSet<FieldId>) -> String {
    let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
    format!("flagged [{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{VALID_NAME, VALID_PHONE};
    use crate::driver::{MockBehavior, MockFactory, MockFormDriver};
    use async_trait::async_trait;

    fn fast_runner() -> ScenarioRunner {
        ScenarioRunner::new(
            RunnerConfig::new()
                .with_wait(WaitOptions::new().with_timeout(100).with_poll_interval(2))
                .with_step_timeout(500),
        )
    }

    /// Rules the simulated target applies, differing from the runner's contract
    fn target_contract(name: &str, phone: &str) -> ValidationContract {
        ValidationContract::new(vec![
            crate::contract::Field::pattern(FieldId::Name, 0, name).unwrap(),
            crate::contract::Field::pattern(FieldId::Phone, 1, phone).unwrap(),
            crate::contract::Field::checked(FieldId::Agreement, 2),
        ])
        .unwrap()
    }

    fn progressive_fix() -> Scenario {
        Scenario::builder("error_moves_to_next_field")
            .submit()
            .expect_invalid(FieldId::Name)
            .set_field(FieldId::Name, VALID_NAME)
            .submit()
            .expect_invalid(FieldId::Phone)
            .set_field(FieldId::Phone, VALID_PHONE)
            .submit()
            .expect_invalid(FieldId::Agreement)
            .set_agreement(true)
            .submit()
            .expect_success()
            .build()
    }

    /// Driver whose observations never return
    #[derive(Debug, Default)]
    struct HangingDriver;

    #[async_trait]
    impl FormDriver for HangingDriver {
        async fn set_field_value(&mut self, _field: FieldId, _value: &str) -> FormResult<()> {
            Ok(())
        }
        async fn set_agreement(&mut self, _checked: bool) -> FormResult<()> {
            Ok(())
        }
        async fn submit(&mut self) -> FormResult<()> {
            Ok(())
        }
        async fn observe_invalid_fields(&mut self) -> FormResult<BTreeSet<FieldId>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(BTreeSet::new())
        }
        async fn observe_success(&mut self) -> FormResult<Option<String>> {
            Ok(None)
        }
        async fn release(&mut self) -> FormResult<()> {
            Ok(())
        }
        fn backend(&self) -> &'static str {
            "hanging"
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_state_transitions() {
            let running = RunState::NotStarted.start();
            assert_eq!(running, RunState::Running);
            assert!(!running.is_terminal());
            assert_eq!(running.finish(true), RunState::Passed);
            assert_eq!(running.finish(false), RunState::Failed);
            assert!(RunState::Passed.is_terminal());
            assert!(RunState::Failed.is_terminal());
        }

        #[test]
        fn test_failure_display_includes_step() {
            let failure = RunFailure::mismatch(
                FailureKind::AssertionMismatch,
                ValidationOutcome::FirstInvalid(FieldId::Name),
                ValidationOutcome::FirstInvalid(FieldId::Phone),
            )
            .at(1, &Step::ExpectInvalid { field: FieldId::Name });
            assert_eq!(
                failure.to_string(),
                "step 2 (expect name invalid): assertion mismatch: expected field 'name' invalid, got field 'phone' invalid"
            );
        }

        #[test]
        fn test_driver_error_classification() {
            let timeout = RunFailure::from_driver_error(FormError::Timeout {
                waited_for: "x".to_string(),
                ms: 1,
            });
            assert_eq!(timeout.kind, FailureKind::DriverTimeout);
            let gone = RunFailure::from_driver_error(FormError::unavailable("gone"));
            assert_eq!(gone.kind, FailureKind::DriverUnavailable);
            let other = RunFailure::from_driver_error(FormError::driver("click failed"));
            assert_eq!(other.kind, FailureKind::DriverError);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_empty_form_flags_name() {
            let scenario = Scenario::builder("empty").submit().expect_invalid(FieldId::Name).build();
            let mut driver = MockFormDriver::default();
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert!(result.passed(), "{:?}", result.failure);
            assert_eq!(result.steps_executed, 2);
            assert!(!driver.is_released());
        }

        #[tokio::test]
        async fn test_progressive_fix_passes() {
            let mut driver = MockFormDriver::default();
            let result = fast_runner().run(&progressive_fix(), &mut driver).await;
            assert!(result.passed(), "{:?}", result.failure);
            assert_eq!(result.state, RunState::Passed);
            assert_eq!(result.steps_executed, 11);
        }

        #[tokio::test]
        async fn test_waits_for_slow_target() {
            let mut driver = MockFormDriver::new(MockBehavior::new().with_settle_polls(5));
            let result = fast_runner().run(&progressive_fix(), &mut driver).await;
            assert!(result.passed(), "{:?}", result.failure);
        }

        #[tokio::test]
        async fn test_never_settling_target_times_out() {
            let scenario = Scenario::builder("empty").submit().expect_invalid(FieldId::Name).build();
            let mut driver = MockFormDriver::new(MockBehavior::new().never_settling());
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert_eq!(result.state, RunState::Failed);
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverTimeout));
            assert_eq!(result.failure.unwrap().step_index, Some(1));
        }

        #[tokio::test]
        async fn test_success_never_shown_times_out() {
            let scenario = Scenario::builder("success")
                .fill_valid()
                .set_agreement(true)
                .submit()
                .expect_success()
                .build();
            let mut driver = MockFormDriver::new(MockBehavior::new().never_settling());
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverTimeout));
        }

        #[tokio::test]
        async fn test_hanging_driver_call_times_out() {
            let scenario = Scenario::builder("empty").submit().expect_invalid(FieldId::Name).build();
            let runner = ScenarioRunner::new(RunnerConfig::new().with_step_timeout(20));
            let result = runner.run(&scenario, &mut HangingDriver).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverTimeout));
        }

        #[tokio::test]
        async fn test_multiple_invalid_is_distinct_failure() {
            let scenario = Scenario::builder("empty").submit().expect_invalid(FieldId::Name).build();
            let mut driver = MockFormDriver::new(MockBehavior::new().flagging_every_invalid());
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::MultipleInvalid);
            assert_eq!(failure.actual.as_deref(), Some("flagged [name, phone, agreement]"));
        }

        #[tokio::test]
        async fn test_lenient_target_is_assertion_mismatch() {
            // Target accepts any name; the contract still expects a rejection.
            let lenient = target_contract(".*", crate::contract::PHONE_PATTERN);
            let scenario = Scenario::builder("latin_name")
                .set_field(FieldId::Name, "Ivan Petrov")
                .set_field(FieldId::Phone, "")
                .submit()
                .expect_invalid(FieldId::Name)
                .build();
            let mut driver = MockFormDriver::new(MockBehavior::new().with_contract(lenient));
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::AssertionMismatch);
            assert_eq!(failure.expected.as_deref(), Some("field 'name' invalid"));
            assert_eq!(failure.actual.as_deref(), Some("field 'phone' invalid"));
        }

        #[tokio::test]
        async fn test_success_where_rejection_expected_is_mismatch() {
            let target = target_contract(".*", crate::contract::PHONE_PATTERN);
            let scenario = Scenario::builder("name_rejects_latin")
                .set_field(FieldId::Name, "Ivan Petrov")
                .set_field(FieldId::Phone, VALID_PHONE)
                .set_agreement(true)
                .submit()
                .expect_invalid(FieldId::Name)
                .build();
            let mut driver = MockFormDriver::new(MockBehavior::new().with_contract(target));
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::AssertionMismatch);
            assert_eq!(failure.step_index, Some(4));
            assert_eq!(failure.expected.as_deref(), Some("field 'name' invalid"));
            assert_eq!(failure.actual.as_deref(), Some("all fields valid"));
        }

        #[tokio::test]
        async fn test_field_flagged_after_settling_is_mismatch() {
            let target = target_contract(crate::contract::NAME_PATTERN, r"^\+1[0-9]{10}$");
            let scenario = Scenario::builder("success")
                .fill_valid()
                .set_agreement(true)
                .submit()
                .expect_success()
                .build();
            let mut driver = MockFormDriver::new(
                MockBehavior::new().with_contract(target).with_settle_polls(1),
            );
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::AssertionMismatch);
            assert_eq!(failure.actual.as_deref(), Some("flagged [phone]"));
        }

        #[tokio::test]
        async fn test_several_flagged_after_settling_is_multiple_invalid() {
            let target = target_contract(r"^[a-z]+$", r"^\+1[0-9]{10}$");
            let scenario = Scenario::builder("success")
                .fill_valid()
                .set_agreement(true)
                .submit()
                .expect_success()
                .build();
            let mut driver = MockFormDriver::new(
                MockBehavior::new()
                    .with_contract(target)
                    .with_settle_polls(2)
                    .flagging_every_invalid(),
            );
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::MultipleInvalid));
        }

        #[tokio::test]
        async fn test_wrong_success_message() {
            let scenario = Scenario::builder("success")
                .fill_valid()
                .set_agreement(true)
                .submit()
                .expect_success()
                .build();
            let mut driver =
                MockFormDriver::new(MockBehavior::new().with_success_message("Спасибо!"));
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::AssertionMismatch);
            assert_eq!(failure.actual.as_deref(), Some("\"Спасибо!\""));
        }

        #[tokio::test]
        async fn test_success_message_is_trimmed() {
            let scenario = Scenario::builder("success")
                .fill_valid()
                .set_agreement(true)
                .submit()
                .expect_success()
                .build();
            let padded = format!("\n  {SUCCESS_MESSAGE}  \n");
            let mut driver = MockFormDriver::new(MockBehavior::new().with_success_message(padded));
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert!(result.passed(), "{:?}", result.failure);
        }

        #[tokio::test]
        async fn test_expectation_conflict() {
            // Agreement is unticked, so expecting success contradicts the contract.
            let scenario = Scenario::builder("bad_expectation")
                .fill_valid()
                .submit()
                .expect_success()
                .build();
            let mut driver = MockFormDriver::default();
            let result = fast_runner().run(&scenario, &mut driver).await;
            let failure = result.failure.unwrap();
            assert_eq!(failure.kind, FailureKind::ExpectationConflict);
            assert_eq!(failure.step_index, Some(3));
            assert!(!driver.was_called("observe"));
        }

        #[tokio::test]
        async fn test_fails_fast() {
            let scenario = Scenario::builder("fail_fast")
                .submit()
                .expect_invalid(FieldId::Phone)
                .set_field(FieldId::Name, VALID_NAME)
                .build();
            let mut driver = MockFormDriver::default();
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert_eq!(result.state, RunState::Failed);
            assert_eq!(result.steps_executed, 1);
            assert!(!driver.was_called("set_field_value"));
        }

        #[tokio::test]
        async fn test_malformed_scenario_rejected_before_driver_use() {
            let scenario = Scenario::builder("empty_steps").build();
            let mut driver = MockFormDriver::default();
            let result = fast_runner().run(&scenario, &mut driver).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::InvalidScenario));
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_run_through_trait_object() {
            let scenario = Scenario::builder("empty").submit().expect_invalid(FieldId::Name).build();
            let mut driver: Box<dyn FormDriver> = Box::new(MockFormDriver::default());
            let result = fast_runner().run(&scenario, driver.as_mut()).await;
            assert!(result.passed());
        }
    }

    mod scoped_tests {
        use super::*;

        #[tokio::test]
        async fn test_releases_after_pass() {
            let factory = MockFactory::default();
            let result = fast_runner().run_scoped(&progressive_fix(), &factory).await;
            assert!(result.passed());
            assert_eq!(factory.acquired_count(), 1);
            assert_eq!(factory.released_count(), 1);
        }

        #[tokio::test]
        async fn test_releases_after_failure() {
            let scenario = Scenario::builder("wrong").submit().expect_invalid(FieldId::Phone).build();
            let factory = MockFactory::default();
            let result = fast_runner().run_scoped(&scenario, &factory).await;
            assert!(!result.passed());
            assert_eq!(factory.released_count(), 1);
        }

        #[tokio::test]
        async fn test_releases_after_timeout() {
            let scenario = Scenario::builder("slow").submit().expect_invalid(FieldId::Name).build();
            let factory = MockFactory::new(MockBehavior::new().never_settling());
            let result = fast_runner().run_scoped(&scenario, &factory).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverTimeout));
            assert_eq!(factory.released_count(), 1);
        }

        #[tokio::test]
        async fn test_acquire_failure_is_driver_unavailable() {
            let factory = MockFactory::default().failing_acquire();
            let result = fast_runner().run_scoped(&progressive_fix(), &factory).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverUnavailable));
            assert_eq!(result.steps_executed, 0);
            assert_eq!(factory.released_count(), 0);
        }

        #[tokio::test]
        async fn test_release_failure_fails_passing_run() {
            let factory = MockFactory::new(MockBehavior::new().failing_release());
            let result = fast_runner().run_scoped(&progressive_fix(), &factory).await;
            assert_eq!(result.state, RunState::Failed);
            assert_eq!(result.failure_kind(), Some(FailureKind::DriverUnavailable));
        }

        #[tokio::test]
        async fn test_release_failure_keeps_original_failure() {
            let scenario = Scenario::builder("wrong").submit().expect_invalid(FieldId::Phone).build();
            let factory = MockFactory::new(MockBehavior::new().failing_release());
            let result = fast_runner().run_scoped(&scenario, &factory).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::ExpectationConflict));
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_failure_kind_serializes_snake_case() {
            assert_eq!(
                serde_json::to_string(&FailureKind::DriverTimeout).unwrap(),
                "\"driver_timeout\""
            );
            assert_eq!(serde_json::to_string(&RunState::Passed).unwrap(), "\"passed\"");
        }
    }
}
