//! Scenario definitions and YAML loading.
//!
//! A scenario is an ordered script of form mutations and assertions:
//!
//! ```yaml
//! version: "1.0"
//! scenarios:
//!   - name: agreement_must_be_checked
//!     steps:
//!       - type: set_field
//!         field: name
//!         value: "Иван Петров"
//!       - type: set_field
//!         field: phone
//!         value: "+79990001122"
//!       - type: set_agreement
//!         checked: false
//!       - type: submit
//!       - type: expect_invalid
//!         field: agreement
//! ```

use crate::contract::{FieldId, VALID_NAME, VALID_PHONE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Supported scenario file version
pub const SCENARIO_FILE_VERSION: &str = "1.0";

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Step {
    /// Replace a text field's content
    SetField { field: FieldId, value: String },
    /// Tick or untick the agreement checkbox
    SetAgreement { checked: bool },
    /// Submit the form
    Submit,
    /// Exactly this field must be flagged invalid
    ExpectInvalid { field: FieldId },
    /// No field is flagged and the success message is shown
    ExpectSuccess,
}

impl Step {
    /// Whether this step observes the target rather than mutating it
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::ExpectInvalid { .. } | Self::ExpectSuccess)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetField { field, value } => write!(f, "set {field} = {value:?}"),
            Self::SetAgreement { checked } => write!(f, "set agreement = {checked}"),
            Self::Submit => f.write_str("submit"),
            Self::ExpectInvalid { field } => write!(f, "expect {field} invalid"),
            Self::ExpectSuccess => f.write_str("expect success"),
        }
    }
}

/// An immutable, named sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    steps: Vec<Step>,
}

impl Scenario {
    /// Start building a scenario
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Steps in execution order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of assertion steps
    #[must_use]
    pub fn assertion_count(&self) -> usize {
        self.steps.iter().filter(|step| step.is_assertion()).count()
    }

    /// Parse and validate a single scenario
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the scenario is well formed
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::EmptyName);
        }

        if self.steps.is_empty() {
            return Err(ScenarioError::EmptySteps(self.name.clone()));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if let Step::SetField { field, .. } = step {
                if !field.is_text() {
                    return Err(ScenarioError::NotATextField {
                        scenario: self.name.clone(),
                        step: index,
                        field: *field,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`Scenario`]
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    description: String,
    steps: Vec<Step>,
}

impl ScenarioBuilder {
    /// Create a builder
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append an arbitrary step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Replace a text field's content
    #[must_use]
    pub fn set_field(self, field: FieldId, value: impl Into<String>) -> Self {
        self.step(Step::SetField {
            field,
            value: value.into(),
        })
    }

    /// Fill name and phone with the canonical valid values
    #[must_use]
    pub fn fill_valid(self) -> Self {
        self.set_field(FieldId::Name, VALID_NAME)
            .set_field(FieldId::Phone, VALID_PHONE)
    }

    /// Tick or untick the agreement checkbox
    #[must_use]
    pub fn set_agreement(self, checked: bool) -> Self {
        self.step(Step::SetAgreement { checked })
    }

    /// Submit the form
    #[must_use]
    pub fn submit(self) -> Self {
        self.step(Step::Submit)
    }

    /// Expect exactly this field to be flagged
    #[must_use]
    pub fn expect_invalid(self, field: FieldId) -> Self {
        self.step(Step::ExpectInvalid { field })
    }

    /// Expect a successful submission
    #[must_use]
    pub fn expect_success(self) -> Self {
        self.step(Step::ExpectSuccess)
    }

    /// Finish the scenario
    #[must_use]
    pub fn build(self) -> Scenario {
        Scenario {
            name: self.name,
            description: self.description,
            steps: self.steps,
        }
    }
}

/// A versioned file holding several scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Schema version (must be "1.0")
    pub version: String,
    /// Scenarios in declaration order
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    /// Parse and validate a scenario file
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let file: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, ScenarioError> {
        serde_yaml_ng::to_string(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.version != SCENARIO_FILE_VERSION {
            return Err(ScenarioError::InvalidVersion(self.version.clone()));
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(ScenarioError::DuplicateName(scenario.name.clone()));
            }
        }

        Ok(())
    }
}

/// Read and validate scenarios from a YAML file
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<Scenario>, ScenarioError> {
    let yaml = std::fs::read_to_string(path)?;
    Ok(ScenarioFile::from_yaml(&yaml)?.scenarios)
}

/// Errors in scenario definitions
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ScenarioError {
    #[error("Failed to parse YAML: {0}")]
    Parse(String),

    #[error("Invalid version '{0}', expected '1.0'")]
    InvalidVersion(String),

    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Scenario '{0}' has no steps")]
    EmptySteps(String),

    #[error("Duplicate scenario name '{0}'")]
    DuplicateName(String),

    #[error("Scenario '{scenario}' step {step} sets '{field}', which is not a text field")]
    NotATextField {
        scenario: String,
        step: usize,
        field: FieldId,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
