//! Scenario execution for the `run`, `list` and `check` commands

use crate::commands::{DriverKind, MockFault, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_json, OutputFormat, ProgressReporter};
use formprobe::{
    select, DriverFactory, Field, FieldId, FieldValue, FormError, MockBehavior, MockFactory,
    RunnerConfig, Scenario, ScenarioRunner, SuiteResults, SuiteRunner, ValidationContract,
    WaitOptions, PHONE_PATTERN,
};
use std::path::Path;
use tracing::debug;

/// Scenarios from a YAML file, or the built-in catalog
pub fn load_scenarios(path: Option<&Path>) -> CliResult<Vec<Scenario>> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading scenarios");
            Ok(formprobe::load_scenarios(path)?)
        }
        None => Ok(formprobe::standard_scenarios()),
    }
}

/// Scenarios matching `filter`; an empty selection is an error
pub fn selected(scenarios: &[Scenario], filter: Option<&str>) -> CliResult<Vec<Scenario>> {
    let picked: Vec<Scenario> = select(scenarios, filter).into_iter().cloned().collect();
    if picked.is_empty() {
        return Err(CliError::invalid_argument(match filter {
            Some(pattern) => format!("no scenarios match '{pattern}'"),
            None => "no scenarios to run".to_string(),
        }));
    }
    Ok(picked)
}

/// Evaluate one value against the standard contract
pub fn check_value(field: &str, value: &str) -> CliResult<bool> {
    let field: FieldId = field.parse()?;
    let contract = ValidationContract::standard();
    let valid = if field.is_text() {
        contract.is_valid(field, FieldValue::Text(value))
    } else {
        let checked: bool = value.parse().map_err(|_| {
            CliError::invalid_argument(format!("'{field}' takes true or false, got '{value}'"))
        })?;
        contract.is_valid(field, FieldValue::Checked(checked))
    };
    Ok(valid)
}

/// Mock target behaviour for `--mock-fault`
pub fn mock_behavior(fault: Option<MockFault>) -> CliResult<MockBehavior> {
    let behavior = MockBehavior::new();
    Ok(match fault {
        None => behavior,
        Some(MockFault::AcceptAnyName) => {
            let lenient = ValidationContract::new(vec![
                Field::pattern(FieldId::Name, 0, ".*").map_err(FormError::from)?,
                Field::pattern(FieldId::Phone, 1, PHONE_PATTERN).map_err(FormError::from)?,
                Field::checked(FieldId::Agreement, 2),
            ])
            .map_err(FormError::from)?;
            behavior.with_contract(lenient)
        }
        Some(MockFault::FlagEveryInvalid) => behavior.flagging_every_invalid(),
        Some(MockFault::NeverSettle) => behavior.never_settling(),
    })
}

/// Runs scenario suites for the CLI
#[derive(Debug)]
pub struct FormRunner {
    config: CliConfig,
    format: OutputFormat,
    reporter: ProgressReporter,
}

impl FormRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig, format: OutputFormat) -> Self {
        let quiet = config.verbosity.is_quiet() || format == OutputFormat::Json;
        let reporter = ProgressReporter::new(config.color.should_color(), quiet)
            .with_verbose(config.verbosity.is_verbose());
        Self {
            config,
            format,
            reporter,
        }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    fn suite(&self, args: &RunArgs) -> SuiteRunner {
        let wait = WaitOptions::new()
            .with_timeout(args.timeout_ms)
            .with_poll_interval(args.poll_ms);
        let runner = ScenarioRunner::new(
            RunnerConfig::new()
                .with_wait(wait)
                .with_step_timeout(args.step_timeout_ms),
        );
        let suite = SuiteRunner::new(runner).with_parallel(self.config.effective_jobs());
        if self.config.fail_fast {
            suite.with_fail_fast()
        } else {
            suite
        }
    }

    /// Run the selected scenarios and report them
    pub fn run(&mut self, args: &RunArgs) -> CliResult<SuiteResults> {
        if args.mock_fault.is_some() && args.driver != DriverKind::Mock {
            return Err(CliError::invalid_argument("--mock-fault requires --driver mock"));
        }
        let scenarios = load_scenarios(args.scenarios.as_deref())?;
        let scenarios = selected(&scenarios, args.filter.as_deref())?;
        let suite = self.suite(args);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        self.reporter
            .start_progress(scenarios.len() as u64, "Running scenarios");

        let results = match args.driver {
            DriverKind::Mock => {
                let factory = MockFactory::new(mock_behavior(args.mock_fault)?);
                runtime.block_on(self.execute(&suite, &scenarios, &factory))
            }
            DriverKind::Chromium => self.run_chromium(&runtime, &suite, &scenarios, args)?,
        };

        self.reporter.finish();
        match self.format {
            OutputFormat::Text => {
                self.reporter.skipped(results.skipped());
                self.reporter.summary(
                    results.passed_count(),
                    results.failed_count(),
                    results.skipped(),
                    results.duration,
                );
            }
            OutputFormat::Json => println!("{}", render_json(&results)?),
        }
        Ok(results)
    }

    #[cfg(feature = "browser")]
    fn run_chromium(
        &self,
        runtime: &tokio::runtime::Runtime,
        suite: &SuiteRunner,
        scenarios: &[Scenario],
        args: &RunArgs,
    ) -> CliResult<SuiteResults> {
        let mut config = formprobe::ChromiumConfig::new(args.base_url.as_str()).with_headless(!args.headed);
        if args.no_sandbox {
            config = config.with_no_sandbox();
        }
        if let Some(ref path) = args.chromium_path {
            config = config.with_chromium_path(path);
        }
        let factory = formprobe::ChromiumFactory::new(config);
        Ok(runtime.block_on(self.execute(suite, scenarios, &factory)))
    }

    #[cfg(not(feature = "browser"))]
    #[allow(clippy::unused_self)]
    fn run_chromium(
        &self,
        _runtime: &tokio::runtime::Runtime,
        _suite: &SuiteRunner,
        _scenarios: &[Scenario],
        _args: &RunArgs,
    ) -> CliResult<SuiteResults> {
        Err(CliError::config(
            "chromium driver not enabled. Rebuild with --features browser",
        ))
    }

    async fn execute<F>(&self, suite: &SuiteRunner, scenarios: &[Scenario], factory: &F) -> SuiteResults
    where
        F: DriverFactory,
    {
        let text = self.format == OutputFormat::Text;
        suite
            .run_with(scenarios, factory, |result| {
                if text {
                    self.reporter.scenario(result);
                }
            })
            .await
    }
}
