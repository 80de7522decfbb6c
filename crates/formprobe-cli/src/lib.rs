//! Formprobe CLI Library
//!
//! Command-line interface for the formprobe scenario runner.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{
    CheckArgs, Cli, ColorArg, Commands, DriverKind, FormatArg, ListArgs, MockFault, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_json, OutputFormat, ProgressReporter};
pub use runner::{check_value, load_scenarios, mock_behavior, selected, FormRunner};
