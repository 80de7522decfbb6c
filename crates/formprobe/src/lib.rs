//! Formprobe: Form-Validation Contract and Scenario Runner
//!
//! Encodes an order form's client-side validation rules as data and replays
//! scripted scenarios against any target that implements [`FormDriver`],
//! asserting that what the target renders matches what the contract predicts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    FORMPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Scenario   │    │ FormDriver │            │
//! │   │ (YAML /    │───►│ Runner     │───►│ (chromium  │            │
//! │   │  catalog)  │    │            │    │  / mock)   │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │ predicts                            │
//! │                     ┌─────▼──────┐                              │
//! │                     │ Validation │                              │
//! │                     │ Contract   │                              │
//! │                     └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use formprobe::{FieldId, MockFactory, Scenario, ScenarioRunner};
//!
//! let scenario = Scenario::builder("empty_form_flags_name")
//!     .submit()
//!     .expect_invalid(FieldId::Name)
//!     .build();
//! let result = ScenarioRunner::default()
//!     .run_scoped(&scenario, &MockFactory::default())
//!     .await;
//! assert!(result.passed());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Chromium-backed form driver (CDP, feature `browser`)
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod browser;

/// Built-in order-form scenarios
pub mod catalog;

/// Validation contract: fields, rules, first-invalid evaluation
#[allow(clippy::missing_errors_doc)]
pub mod contract;

/// `FormDriver` / `DriverFactory` traits and the in-memory mock target
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod driver;

/// Suite runner with bounded parallelism
pub mod harness;

mod result;

/// Scenario runner and run results
pub mod runner;

/// Scenario definitions and YAML loading
#[allow(clippy::missing_errors_doc)]
pub mod scenario;

/// Form state snapshot
pub mod state;

/// Proptest strategies (feature `proptest`)
#[cfg(any(test, feature = "proptest"))]
pub mod strategies;

/// Bounded polling and per-call time limits
#[allow(clippy::missing_errors_doc)]
pub mod wait;

pub use browser::{ChromiumConfig, FormSelectors, DEFAULT_BASE_URL};
#[cfg(feature = "browser")]
pub use browser::{ChromiumFactory, ChromiumFormDriver};
pub use catalog::standard_scenarios;
pub use contract::{
    ContractError, Field, FieldId, FieldRule, FieldValue, ValidationContract, ValidationOutcome,
    NAME_PATTERN, PHONE_PATTERN, SUCCESS_MESSAGE,
};
pub use driver::{DriverFactory, FormDriver, MockBehavior, MockFactory, MockFormDriver};
pub use harness::{select, SuiteResults, SuiteRunner};
pub use result::{FormError, FormResult};
pub use runner::{
    FailureKind, RunFailure, RunResult, RunState, RunnerConfig, ScenarioRunner,
};
pub use scenario::{load_scenarios, Scenario, ScenarioBuilder, ScenarioError, ScenarioFile, Step};
pub use state::FormState;
pub use wait::{Deadline, WaitOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        DriverFactory, FailureKind, FieldId, FormDriver, FormError, FormResult, FormState,
        MockFactory, MockFormDriver, RunResult, RunnerConfig, Scenario, ScenarioRunner,
        SuiteRunner, ValidationContract, ValidationOutcome, WaitOptions,
    };
}
