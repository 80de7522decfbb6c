//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use formprobe::wait::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_STEP_TIMEOUT_MS, DEFAULT_WAIT_TIMEOUT_MS};
use std::path::PathBuf;

/// Formprobe: run order-form validation scenarios against a browser or mock target
#[derive(Parser, Debug)]
#[command(name = "formprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the form
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),

    /// Check a single value against the validation contract
    Check(CheckArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Form driver backend
    #[arg(long, default_value = "chromium")]
    pub driver: DriverKind,

    /// URL of the order form
    #[arg(long, env = "FORMPROBE_BASE_URL", default_value = formprobe::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// YAML scenario file (default: built-in scenarios)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Only run scenarios whose name contains this pattern
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop scheduling scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Number of scenarios to run at once (0 = number of CPUs)
    #[arg(short = 'j', long, default_value = "1")]
    pub parallel: usize,

    /// Wait for an observation in milliseconds
    #[arg(long, default_value_t = DEFAULT_WAIT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_ms: u64,

    /// Limit for a single driver call in milliseconds
    #[arg(long, default_value_t = DEFAULT_STEP_TIMEOUT_MS)]
    pub step_timeout_ms: u64,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Path to chromium binary
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Make the mock target misbehave (requires --driver mock)
    #[arg(long)]
    pub mock_fault: Option<MockFault>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// YAML scenario file (default: built-in scenarios)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Only list scenarios whose name contains this pattern
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Field to check (name, phone, agreement)
    pub field: String,

    /// Value to check (`true`/`false` for agreement)
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

/// Form driver backend
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverKind {
    /// Real browser via CDP
    #[default]
    Chromium,
    /// In-memory target that follows the contract
    Mock,
}

/// Deliberate defect of the mock target
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFault {
    /// Accept any text as a name
    AcceptAnyName,
    /// Flag every invalid field instead of only the first
    FlagEveryInvalid,
    /// Never render a result after submit
    NeverSettle,
}

/// Report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = Cli::try_parse_from(["formprobe", "run"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.driver, DriverKind::Chromium);
            assert_eq!(args.parallel, 1);
            assert_eq!(args.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(args.format, FormatArg::Text);
            assert!(!args.fail_fast);
            assert_eq!(args.mock_fault, None);
        }

        #[test]
        fn test_run_options() {
            let cli = Cli::try_parse_from([
                "formprobe",
                "-vv",
                "run",
                "--driver",
                "mock",
                "--filter",
                "phone",
                "-j",
                "4",
                "--fail-fast",
                "--format",
                "json",
                "--base-url",
                "http://127.0.0.1:3000",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.driver, DriverKind::Mock);
            assert_eq!(args.filter.as_deref(), Some("phone"));
            assert_eq!(args.parallel, 4);
            assert!(args.fail_fast);
            assert_eq!(args.format, FormatArg::Json);
            assert_eq!(args.base_url, "http://127.0.0.1:3000");
        }

        #[test]
        fn test_check_accepts_leading_plus_and_hyphen() {
            let cli = Cli::try_parse_from(["formprobe", "check", "name", "-Иван"]).unwrap();
            let Commands::Check(args) = cli.command else {
                panic!("expected check");
            };
            assert_eq!(args.value, "-Иван");
        }

        #[test]
        fn test_mock_fault_parses() {
            let cli = Cli::try_parse_from([
                "formprobe",
                "run",
                "--driver",
                "mock",
                "--mock-fault",
                "accept-any-name",
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.mock_fault, Some(MockFault::AcceptAnyName));
        }

        #[test]
        fn test_unknown_driver_rejected() {
            assert!(Cli::try_parse_from(["formprobe", "run", "--driver", "firefox"]).is_err());
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["formprobe"]).is_err());
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_color_arg_conversion() {
            assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
            assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
        }
    }
}
