//! Built-in scenarios for the order form.

use crate::contract::{FieldId, VALID_NAME, VALID_PHONE};
use crate::scenario::Scenario;

/// Names the form must reject, with the suffix used in scenario names
pub const REJECTED_NAMES: [(&str, &str); 6] = [
    ("latin", "Ivan Petrov"),
    ("digit", "Иван1"),
    ("at_sign", "Иван@"),
    ("underscore", "Иван_"),
    ("hash", "Петр#"),
    ("blank", " "),
];

/// Phones the form must reject, with the suffix used in scenario names
pub const REJECTED_PHONES: [(&str, &str); 6] = [
    ("missing_plus", "79001234567"),
    ("10_digits", "+7900123456"),
    ("12_digits", "+790012345678"),
    ("punctuation", "+7(900)123-45-67"),
    ("space", "+7 9001234567"),
    ("letters", "+7abcdefghij"),
];

fn accepted(scenario: &str, description: &str, name: &str, phone: &str) -> Scenario {
    Scenario::builder(scenario)
        .describe(description)
        .set_field(FieldId::Name, name)
        .set_field(FieldId::Phone, phone)
        .set_agreement(true)
        .submit()
        .expect_success()
        .build()
}

/// The standard order-form suite
#[must_use]
pub fn standard_scenarios() -> Vec<Scenario> {
    let mut scenarios = vec![
        Scenario::builder("empty_form_flags_name")
            .describe("submitting an empty form flags the name field")
            .submit()
            .expect_invalid(FieldId::Name)
            .build(),
        Scenario::builder("error_moves_to_next_field")
            .describe("fixing each field reveals the next invalid one")
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
            .build(),
        accepted(
            "name_allows_cyrillic_hyphen_space",
            "hyphen and space are allowed in names",
            "Анна-Мария Иванова",
            VALID_PHONE,
        ),
    ];

    scenarios.extend(REJECTED_NAMES.iter().map(|(case, name)| {
        Scenario::builder(format!("name_rejects_{case}"))
            .describe(format!("name {name:?} is rejected"))
            .set_field(FieldId::Name, *name)
            .set_field(FieldId::Phone, VALID_PHONE)
            .set_agreement(true)
            .submit()
            .expect_invalid(FieldId::Name)
            .build()
    }));

    scenarios.push(accepted(
        "phone_allows_plus_and_11_digits",
        "plus and eleven digits is a valid phone",
        VALID_NAME,
        "+79001234567",
    ));

    scenarios.extend(REJECTED_PHONES.iter().map(|(case, phone)| {
        Scenario::builder(format!("phone_rejects_{case}"))
            .describe(format!("phone {phone:?} is rejected"))
            .set_field(FieldId::Name, VALID_NAME)
            .set_field(FieldId::Phone, *phone)
            .set_agreement(true)
            .submit()
            .expect_invalid(FieldId::Phone)
            .build()
    }));

    scenarios.push(
        Scenario::builder("agreement_must_be_checked")
            .describe("the agreement checkbox is required")
            .fill_valid()
            .set_agreement(false)
            .submit()
            .expect_invalid(FieldId::Agreement)
            .build(),
    );
    scenarios.push(accepted(
        "submit_success_with_valid_data",
        "a complete form is accepted",
        VALID_NAME,
        VALID_PHONE,
    ));
    scenarios.push(accepted(
        "card_order_success",
        "card order shows the success message",
        "Иван-Петров Иван",
        "+79991234567",
    ));

    scenarios
}
