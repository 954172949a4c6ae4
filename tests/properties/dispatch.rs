//! Property tests for argv dispatch.

use proptest::prelude::*;

use stagehand::presentation::tree;
use stagehand::presentation::{Dispatch, FlagValue};

fn word() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_.]{1,12}").unwrap()
}

fn stage() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9-]{0,10}").unwrap()
}

/// Known command words, flags and noise mixed together
fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "deploy", "remove", "secret", "set", "list", "state", "edit", "shell", "dev",
            "unlock", "version", "--stage", "--verbose", "--verbose=false", "--help", "--",
            "-x", "--bogus",
        ])
        .prop_map(str::to_string),
        word(),
        any::<String>(),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: dispatch is total; any argv yields a run or help, never a panic.
    #[test]
    fn property_dispatch_never_panics(args in proptest::collection::vec(token(), 0..8)) {
        let registry = tree::registry().unwrap();
        match registry.dispatch(args) {
            Dispatch::Run(invocation) => {
                let leaf = registry.find(&invocation.path);
                prop_assert!(leaf.is_some());
                let leaf = leaf.unwrap();
                prop_assert!(leaf.handler.is_some());
                prop_assert!(invocation.positionals.len() >= leaf.required_arguments());
            }
            Dispatch::Help { path, .. } => {
                prop_assert!(registry.find(&path).is_some());
            }
        }
    }

    /// PROPERTY: a flag resolves the same invocation wherever it appears.
    #[test]
    fn property_flag_position_is_irrelevant(
        name in word(),
        value in word(),
        stage in stage(),
        at in 0usize..=4,
    ) {
        let registry = tree::registry().unwrap();
        let baseline = vec![
            "secret".to_string(),
            "set".to_string(),
            name.clone(),
            value.clone(),
            format!("--stage={}", stage),
        ];
        let mut moved: Vec<String> = baseline[..4].to_vec();
        moved.insert(at, format!("--stage={}", stage));

        let expected = registry.dispatch(baseline);
        let actual = registry.dispatch(moved);
        prop_assert_eq!(&expected, &actual);

        match actual {
            Dispatch::Run(invocation) => {
                prop_assert_eq!(invocation.path, vec!["stagehand", "secret", "set"]);
                prop_assert_eq!(invocation.positionals, vec![name, value]);
                prop_assert_eq!(invocation.flags.get("stage"), Some(&FlagValue::String(stage)));
            }
            other => prop_assert!(false, "expected a run, got {:?}", other),
        }
    }

    /// PROPERTY: `--help` anywhere turns a runnable command into help for it.
    #[test]
    fn property_help_flag_always_wins(at in 0usize..=2) {
        let registry = tree::registry().unwrap();
        let mut args = vec!["secret".to_string(), "list".to_string()];
        args.insert(at, "--help".to_string());
        match registry.dispatch(args) {
            Dispatch::Help { path, .. } => {
                prop_assert_eq!(path, vec!["stagehand", "secret", "list"]);
            }
            other => prop_assert!(false, "expected help, got {:?}", other),
        }
    }
}
