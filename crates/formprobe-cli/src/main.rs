//! Formprobe CLI: run order-form validation scenarios
//!
//! ## Usage
//!
//! ```bash
//! formprobe run                          # Built-in scenarios against http://localhost:9999
//! formprobe run --driver mock            # Same scenarios against the in-memory target
//! formprobe run --scenarios form.yaml    # Scenarios from a file
//! formprobe list --filter phone          # Show scenarios
//! formprobe check phone +79001234567     # Evaluate one value
//! ```

use clap::Parser;
use formprobe_cli::{
    check_value, load_scenarios, selected, CheckArgs, Cli, CliConfig, CliError, CliResult,
    ColorChoice, Commands, FormRunner, ListArgs, RunArgs, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Run(ref args) => run_scenarios(config, args),
        Commands::List(ref args) => list_scenarios(args),
        Commands::Check(ref args) => run_check(&config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    let config = CliConfig::new().with_verbosity(verbosity).with_color(color);

    match cli.command {
        Commands::Run(ref args) => config
            .with_parallel_jobs(args.parallel)
            .with_fail_fast(args.fail_fast),
        _ => config,
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_scenarios(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let mut runner = FormRunner::new(config, args.format.into());
    let results = runner.run(args)?;
    if results.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: results.failed_count() + results.skipped(),
            scheduled: results.scheduled,
        })
    }
}

fn list_scenarios(args: &ListArgs) -> CliResult<()> {
    let scenarios = load_scenarios(args.scenarios.as_deref())?;
    for scenario in selected(&scenarios, args.filter.as_deref())? {
        let steps = scenario.steps().len();
        if scenario.description().is_empty() {
            println!("{} ({steps} steps)", scenario.name());
        } else {
            println!("{} ({steps} steps) - {}", scenario.name(), scenario.description());
        }
    }
    Ok(())
}

fn run_check(config: &CliConfig, args: &CheckArgs) -> CliResult<()> {
    if check_value(&args.field, &args.value)? {
        if !config.verbosity.is_quiet() {
            println!("valid");
        }
        Ok(())
    } else {
        Err(CliError::Rejected {
            field: args.field.clone(),
            value: args.value.clone(),
        })
    }
}
