//! Snapshot of form field values during a scenario run.

use crate::contract::{FieldId, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current values of all fields plus the agreement flag.
///
/// Created fresh for each scenario run and mutated only through
/// [`FormState::set_field`] and [`FormState::set_agreement`]. Text fields
/// that were never set read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    values: BTreeMap<FieldId, String>,
    agreement_checked: bool,
}

impl FormState {
    /// Create an empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a text field's content
    pub fn set_field(&mut self, field: FieldId, value: impl Into<String>) {
        let _ = self.values.insert(field, value.into());
    }

    /// Set the agreement checkbox
    pub fn set_agreement(&mut self, checked: bool) {
        self.agreement_checked = checked;
    }

    /// Current text of a field
    #[must_use]
    pub fn text(&self, field: FieldId) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    /// Whether the agreement checkbox is ticked
    #[must_use]
    pub const fn agreement_checked(&self) -> bool {
        self.agreement_checked
    }

    /// Value of a field in the shape its rule expects
    #[must_use]
    pub fn value_of(&self, field: FieldId) -> FieldValue<'_> {
        if field.is_text() {
            FieldValue::Text(self.text(field))
        } else {
            FieldValue::Checked(self.agreement_checked)
        }
    }
}
