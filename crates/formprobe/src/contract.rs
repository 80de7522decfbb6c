//! Validation contract for the order form.
//!
//! The contract lists the form's fields in validation order. Each field owns
//! one rule; submitting the form reports only the first field whose rule
//! fails, so fixing field N reveals the invalidity of field N+1 and two
//! fields are never flagged at once.
//!
//! ```text
//!   name ──► phone ──► agreement ──► AllValid
//!    │         │          │
//!    ▼         ▼          ▼
//!  FirstInvalid(name) / FirstInvalid(phone) / FirstInvalid(agreement)
//! ```

use crate::result::FormError;
use crate::state::FormState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

macro_rules! name_letter {
    () => {
        r"[\p{Cyrillic}&&\p{L}]"
    };
}

/// Character class of a single letter allowed in the name field
pub const NAME_LETTER: &str = name_letter!();

/// Name: Cyrillic words separated by single spaces or single hyphens
pub const NAME_PATTERN: &str = concat!("^", name_letter!(), "+(?:[ -]", name_letter!(), "+)*$");

/// Phone: `+` followed by exactly eleven ASCII digits
pub const PHONE_PATTERN: &str = r"^\+[0-9]{11}$";

/// Number of digits after the leading `+` in a valid phone
pub const PHONE_DIGITS: usize = 11;

/// Text shown by the target after a successful submission
pub const SUCCESS_MESSAGE: &str =
    "Ваша заявка успешно отправлена! Наш менеджер свяжется с вами в ближайшее время.";

/// Canonical valid name
pub const VALID_NAME: &str = "Иван Петров";

/// Canonical valid phone
pub const VALID_PHONE: &str = "+79990001122";

/// Identifier of a form field.
///
/// The serialized form (`name`, `phone`, `agreement`) matches the
/// `data-test-id` attribute rendered by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    /// Full name text input
    Name,
    /// Phone text input
    Phone,
    /// Agreement checkbox
    Agreement,
}

impl FieldId {
    /// All fields in declaration order
    pub const ALL: [Self; 3] = [Self::Name, Self::Phone, Self::Agreement];

    /// Get the identifier string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Agreement => "agreement",
        }
    }

    /// Whether the field holds text (as opposed to a checkbox flag)
    #[must_use]
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::Agreement)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

/// Current value of a field as seen by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Text input content
    Text(&'a str),
    /// Checkbox state
    Checked(bool),
}

/// Validity rule of a single field
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Text must match the whole pattern
    Pattern(Regex),
    /// Checkbox must be ticked
    Checked,
}

impl FieldRule {
    /// Evaluate the rule. A value of the wrong kind never satisfies it.
    #[must_use]
    pub fn accepts(&self, value: FieldValue<'_>) -> bool {
        match (self, value) {
            (Self::Pattern(pattern), FieldValue::Text(text)) => pattern.is_match(text),
            (Self::Checked, FieldValue::Checked(checked)) => checked,
            _ => false,
        }
    }
}

/// A field governed by one rule at one position in the validation order
#[derive(Debug, Clone)]
pub struct Field {
    id: FieldId,
    order: u32,
    rule: FieldRule,
}

impl Field {
    /// Create a text field validated by a regular expression
    pub fn pattern(id: FieldId, order: u32, pattern: &str) -> Result<Self, ContractError> {
        let regex = Regex::new(pattern).map_err(|e| ContractError::InvalidPattern {
            field: id,
            message: e.to_string(),
        })?;
        Ok(Self {
            id,
            order,
            rule: FieldRule::Pattern(regex),
        })
    }

    /// Create a checkbox field that must be ticked
    #[must_use]
    pub const fn checked(id: FieldId, order: u32) -> Self {
        Self {
            id,
            order,
            rule: FieldRule::Checked,
        }
    }

    /// Field identifier
    #[must_use]
    pub const fn id(&self) -> FieldId {
        self.id
    }

    /// Position in the validation order
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }

    /// Validity rule
    #[must_use]
    pub const fn rule(&self) -> &FieldRule {
        &self.rule
    }
}

/// Result of validating a whole form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "field", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Every field passes; the form may be submitted
    AllValid,
    /// The earliest failing field in validation order
    FirstInvalid(FieldId),
}

impl ValidationOutcome {
    /// Check if the form is submittable
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::AllValid)
    }

    /// The flagged field, if any
    #[must_use]
    pub const fn invalid_field(self) -> Option<FieldId> {
        match self {
            Self::AllValid => None,
            Self::FirstInvalid(field) => Some(field),
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllValid => f.write_str("all fields valid"),
            Self::FirstInvalid(field) => write!(f, "field '{field}' invalid"),
        }
    }
}

/// Errors building a contract from a field list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ContractError {
    #[error("Contract must declare at least one field")]
    NoFields,

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(FieldId),

    #[error("Field '{field}' has order {order}, not greater than previous order {previous}")]
    OrderNotIncreasing {
        field: FieldId,
        order: u32,
        previous: u32,
    },

    #[error("Invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: FieldId, message: String },
}

/// Ordered set of field rules describing when the form may be submitted
#[derive(Debug, Clone)]
pub struct ValidationContract {
    fields: Vec<Field>,
}

impl ValidationContract {
    /// Build a contract, checking identifiers are unique and orders strictly increase
    pub fn new(fields: Vec<Field>) -> Result<Self, ContractError> {
        if fields.is_empty() {
            return Err(ContractError::NoFields);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.id) {
                return Err(ContractError::DuplicateField(field.id));
            }
        }

        for pair in fields.windows(2) {
            if pair[1].order <= pair[0].order {
                return Err(ContractError::OrderNotIncreasing {
                    field: pair[1].id,
                    order: pair[1].order,
                    previous: pair[0].order,
                });
            }
        }

        Ok(Self { fields })
    }

    /// The order form contract: name, phone, agreement
    #[must_use]
    pub fn standard() -> Self {
        static STANDARD: OnceLock<ValidationContract> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                let fields = vec![
                    Field::pattern(FieldId::Name, 0, NAME_PATTERN).expect("name pattern compiles"),
                    Field::pattern(FieldId::Phone, 1, PHONE_PATTERN)
                        .expect("phone pattern compiles"),
                    Field::checked(FieldId::Agreement, 2),
                ];
                Self::new(fields).expect("standard fields are unique and ordered")
            })
            .clone()
    }

    /// Fields in validation order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field
    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Evaluate one field's rule. Fields the contract does not declare are
    /// unconstrained.
    #[must_use]
    pub fn is_valid(&self, id: FieldId, value: FieldValue<'_>) -> bool {
        self.field(id).map_or(true, |field| field.rule.accepts(value))
    }

    /// The first failing field in validation order, or `AllValid`
    #[must_use]
    pub fn first_invalid(&self, state: &FormState) -> ValidationOutcome {
        self.fields
            .iter()
            .find(|field| !field.rule.accepts(state.value_of(field.id)))
            .map_or(ValidationOutcome::AllValid, |field| {
                ValidationOutcome::FirstInvalid(field.id)
            })
    }

    /// Every failing field in validation order
    #[must_use]
    pub fn invalid_fields(&self, state: &FormState) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|field| !field.rule.accepts(state.value_of(field.id)))
            .map(|field| field.id)
            .collect()
    }
}

impl Default for ValidationContract {
    fn default() -> Self {
        Self::standard()
    }
}
