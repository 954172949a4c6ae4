//! Property tests for deriving a personal stage from a username.

use proptest::prelude::*;

use stagehand::application::guess_stage;
use stagehand::application::stage::USERNAME_DENYLIST;

fn username() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_-]{0,15}").unwrap()
}

/// Denylisted name with random letter case
fn denylisted() -> impl Strategy<Value = String> {
    (
        prop::sample::select(USERNAME_DENYLIST.to_vec()),
        proptest::collection::vec(any::<bool>(), 16),
    )
        .prop_map(|(name, upper)| {
            name.chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: shared account names never become a personal stage.
    #[test]
    fn property_denylisted_names_are_rejected(name in denylisted()) {
        prop_assert_eq!(guess_stage(&name), None);
    }

    /// PROPERTY: any other valid username is used as-is.
    #[test]
    fn property_other_usernames_are_literal(name in username()) {
        prop_assume!(!USERNAME_DENYLIST.contains(&name.as_str()));
        prop_assert_eq!(guess_stage(&name), Some(name.clone()));
    }

    /// PROPERTY: the guess is already lowercase and stable.
    #[test]
    fn property_guess_is_idempotent(name in "[A-Za-z][A-Za-z0-9]{0,12}") {
        if let Some(stage) = guess_stage(&name) {
            prop_assert_eq!(stage.clone(), stage.to_lowercase());
            prop_assert_eq!(guess_stage(&stage), Some(stage));
        }
    }
}
