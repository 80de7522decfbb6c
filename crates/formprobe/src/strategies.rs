//! Proptest strategies for the order form.
//!
//! Generators for names, phones and whole form states, used to check the
//! contract's rules against independent reference predicates.
//!
//! ```rust,ignore
//! proptest! {
//!     #[test]
//!     fn prop_first_invalid_is_first(state in form_state()) {
//!         let contract = ValidationContract::standard();
//!         let failures = contract.invalid_fields(&state);
//!         prop_assert_eq!(contract.first_invalid(&state).invalid_field(), failures.first().copied());
//!     }
//! }
//! ```

use crate::contract::FieldId;
use crate::state::FormState;
use proptest::prelude::*;

/// Characters that never appear in a valid name
pub const FORBIDDEN_NAME_CHARS: &[char] = &[
    'A', 'z', 'Q', 'a', '0', '7', '9', '_', '@', '#', '!', '.', ',', '\t', '+', '$',
];

fn cyrillic_letter() -> impl Strategy<Value = char> {
    let letters: Vec<char> = ('А'..='я').chain(['Ё', 'ё']).collect();
    prop::sample::select(letters)
}

fn cyrillic_word() -> impl Strategy<Value = String> {
    prop::collection::vec(cyrillic_letter(), 1..8).prop_map(|chars| chars.into_iter().collect())
}

/// Cyrillic words joined by single spaces or hyphens
pub fn valid_name() -> impl Strategy<Value = String> {
    (
        cyrillic_word(),
        prop::collection::vec((prop::sample::select(vec![' ', '-']), cyrillic_word()), 0..4),
    )
        .prop_map(|(first, rest)| {
            let mut name = first;
            for (separator, word) in rest {
                name.push(separator);
                name.push_str(&word);
            }
            name
        })
}

/// A valid name with one forbidden character spliced in
pub fn invalid_name() -> impl Strategy<Value = String> {
    (
        valid_name(),
        prop::sample::select(FORBIDDEN_NAME_CHARS.to_vec()),
        any::<prop::sample::Index>(),
    )
        .prop_map(|(name, bad, at)| {
            let chars: Vec<char> = name.chars().collect();
            let split = at.index(chars.len() + 1);
            let mut out: String = chars[..split].iter().collect();
            out.push(bad);
            out.extend(&chars[split..]);
            out
        })
}

/// `+` followed by eleven ASCII digits
pub fn valid_phone() -> impl Strategy<Value = String> {
    "\\+[0-9]{11}"
}

/// Near misses around the phone format: optional `+`, wrong lengths,
/// punctuation, spaces and letters
pub fn phone_like() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\+?[0-9]{9,13}",
        "\\+[0-9 ()a-z-]{11}",
        "[0-9]{11}",
        valid_phone(),
    ]
}

/// Form states mixing valid and invalid values for every field
pub fn form_state() -> impl Strategy<Value = FormState> {
    (
        prop_oneof![valid_name(), invalid_name(), Just(String::new())],
        prop_oneof![valid_phone(), phone_like(), Just(String::new())],
        any::<bool>(),
    )
        .prop_map(|(name, phone, agreement)| {
            let mut state = FormState::new();
            state.set_field(FieldId::Name, name);
            state.set_field(FieldId::Phone, phone);
            state.set_agreement(agreement);
            state
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_valid_names_have_no_edge_separators(name in valid_name()) {
            prop_assert!(!name.starts_with([' ', '-']));
            prop_assert!(!name.ends_with([' ', '-']));
            prop_assert!(!name.contains("  "));
        }

        #[test]
        fn prop_invalid_names_contain_forbidden_char(name in invalid_name()) {
            prop_assert!(name.chars().any(|c| FORBIDDEN_NAME_CHARS.contains(&c)));
        }

        #[test]
        fn prop_valid_phone_shape(phone in valid_phone()) {
            prop_assert_eq!(phone.len(), 12);
            prop_assert!(phone.starts_with('+'));
        }

        #[test]
        fn prop_form_state_phone_length_bounded(state in form_state()) {
            prop_assert!(state.text(FieldId::Phone).chars().count() <= 14);
        }
    }
}
