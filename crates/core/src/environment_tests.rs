// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn add_inserts_key_value_entry() {
    let mut env = Environment::new();
    env.add("FOO=bar", true);
    assert_eq!(env.lookup("FOO"), Some("bar"));
}

#[test]
fn add_replace_overwrites_existing_value() {
    let mut env = Environment::from_entries(["FOO=bar"]);
    env.add("FOO=baz", true);
    assert_eq!(env.lookup("FOO"), Some("baz"));
}

#[test]
fn add_non_replace_preserves_existing_value() {
    let mut env = Environment::from_entries(["FOO=bar"]);
    env.add("FOO=baz", false);
    assert_eq!(env.lookup("FOO"), Some("bar"));
}

#[test]
fn add_bare_key_resolves_from_process_environment() {
    std::env::set_var("UPSTART_CORE_TEST_VAR", "from-process");
    let mut env = Environment::new();
    env.add("UPSTART_CORE_TEST_VAR", true);
    assert_eq!(env.lookup("UPSTART_CORE_TEST_VAR"), Some("from-process"));
    std::env::remove_var("UPSTART_CORE_TEST_VAR");
}

#[test]
fn add_bare_key_absent_from_process_environment_is_dropped() {
    let mut env = Environment::new();
    env.add("UPSTART_CORE_TEST_VAR_ABSENT", true);
    assert_eq!(env.lookup("UPSTART_CORE_TEST_VAR_ABSENT"), None);
    assert!(env.is_empty());
}

#[test]
fn add_replace_with_absent_bare_key_removes_existing_entry() {
    let mut env = Environment::from_entries(["UPSTART_CORE_TEST_VAR_ABSENT=old"]);
    env.add("UPSTART_CORE_TEST_VAR_ABSENT", true);
    assert_eq!(env.lookup("UPSTART_CORE_TEST_VAR_ABSENT"), None);
}

#[test]
fn add_non_replace_with_absent_bare_key_preserves_existing_entry() {
    let mut env = Environment::from_entries(["UPSTART_CORE_TEST_VAR_ABSENT=old"]);
    env.add("UPSTART_CORE_TEST_VAR_ABSENT", false);
    assert_eq!(env.lookup("UPSTART_CORE_TEST_VAR_ABSENT"), Some("old"));
}

#[test]
fn append_merges_entries_with_replace_policy() {
    let mut env = Environment::from_entries(["A=1", "B=2"]);
    let other = Environment::from_entries(["B=9", "C=3"]);
    env.append(&other, true);
    assert_eq!(env.lookup("A"), Some("1"));
    assert_eq!(env.lookup("B"), Some("9"));
    assert_eq!(env.lookup("C"), Some("3"));
}

#[test]
fn set_overwrites_unconditionally() {
    let mut env = Environment::from_entries(["A=1"]);
    env.set("A", "2");
    assert_eq!(env.lookup("A"), Some("2"));
}

#[test]
fn get_returns_raw_entry_by_position() {
    let env = Environment::from_entries(["A=1", "B=2"]);
    assert_eq!(env.get(0), Some("A=1"));
    assert_eq!(env.get(1), Some("B=2"));
    assert_eq!(env.get(2), None);
}

#[test]
fn getn_matches_prefix_of_a_larger_string() {
    let env = Environment::from_entries(["FOO=bar"]);
    assert_eq!(env.getn("FOO_SUFFIX", 3), Some("bar"));
    assert_eq!(env.getn("FOO_SUFFIX", 10), None);
}

#[test]
fn valid_accepts_identifiers_and_rejects_the_rest() {
    assert!(Environment::valid("FOO"));
    assert!(Environment::valid("_foo9"));
    assert!(!Environment::valid("9FOO"));
    assert!(!Environment::valid("FOO-BAR"));
    assert!(!Environment::valid(""));
}

#[test]
fn all_valid_checks_every_entry() {
    let good = Environment::from_entries(["FOO=1", "BAR=2"]);
    assert!(good.all_valid());
}

#[test]
fn expand_plain_dollar_name() {
    let env = Environment::from_entries(["FOO=bar"]);
    assert_eq!(env.expand("x=$FOO!").unwrap(), "x=bar!");
}

#[test]
fn expand_braced_name() {
    let env = Environment::from_entries(["FOO=bar"]);
    assert_eq!(env.expand("${FOO}baz").unwrap(), "barbaz");
}

#[test]
fn expand_dollar_brace_brace_is_literal_dollar() {
    let env = Environment::new();
    assert_eq!(env.expand("${}").unwrap(), "$");
}

#[test]
fn expand_unknown_plain_name_fails() {
    let env = Environment::new();
    assert_eq!(
        env.expand("$FOO"),
        Err(EnvError::UnknownParam("FOO".to_string()))
    );
}

#[test]
fn expand_unknown_braced_name_fails() {
    let env = Environment::new();
    assert_eq!(
        env.expand("${FOO}"),
        Err(EnvError::UnknownParam("FOO".to_string()))
    );
}

#[test]
fn expand_braced_name_itself_expanded_then_validated() {
    // ${X} where X is itself a template resolving to an invalid identifier.
    let env = Environment::from_entries(["X=1BAD"]);
    assert_eq!(
        env.expand("${${X}}"),
        Err(EnvError::IllegalParam("1BAD".to_string()))
    );
}

#[test]
fn expand_dash_operator_uses_alt_when_unset() {
    let env = Environment::new();
    assert_eq!(env.expand("${FOO-alt}").unwrap(), "alt");
}

#[test]
fn expand_dash_operator_keeps_empty_value_when_set() {
    let env = Environment::from_entries(["FOO="]);
    assert_eq!(env.expand("${FOO-alt}").unwrap(), "");
}

#[test]
fn expand_colon_dash_operator_uses_alt_when_empty_or_unset() {
    let unset = Environment::new();
    assert_eq!(unset.expand("${FOO:-alt}").unwrap(), "alt");

    let empty = Environment::from_entries(["FOO="]);
    assert_eq!(empty.expand("${FOO:-alt}").unwrap(), "alt");

    let set = Environment::from_entries(["FOO=bar"]);
    assert_eq!(set.expand("${FOO:-alt}").unwrap(), "bar");
}

#[test]
fn expand_plus_operator_emits_alt_only_when_set() {
    let set = Environment::from_entries(["FOO=bar"]);
    assert_eq!(set.expand("${FOO+alt}").unwrap(), "alt");

    let unset = Environment::new();
    assert_eq!(unset.expand("${FOO+alt}").unwrap(), "");
}

#[test]
fn expand_colon_plus_operator_requires_non_empty_value() {
    let set = Environment::from_entries(["FOO=bar"]);
    assert_eq!(set.expand("${FOO:+alt}").unwrap(), "alt");

    let empty = Environment::from_entries(["FOO="]);
    assert_eq!(empty.expand("${FOO:+alt}").unwrap(), "");
}

#[test]
fn expand_colon_without_operator_char_is_an_error() {
    let env = Environment::new();
    assert_eq!(env.expand("${FOO:x}"), Err(EnvError::ExpectedOperator));
}

#[test]
fn expand_unterminated_brace_is_mismatched_braces() {
    let env = Environment::new();
    assert_eq!(env.expand("${FOO"), Err(EnvError::MismatchedBraces));
}

#[test]
fn expand_nested_default_values() {
    let env = Environment::new();
    assert_eq!(env.expand("a${FOO:-b${BAR:-c}}d").unwrap(), "abcd");
}

#[test]
fn expand_alt_text_can_reference_another_unset_param_and_fail() {
    // Alt text is itself expanded, so an UnknownParam inside it still
    // propagates even though the outer parameter took the default branch.
    let env = Environment::new();
    assert_eq!(
        env.expand("${FOO-$BAR}"),
        Err(EnvError::UnknownParam("BAR".to_string()))
    );
}

#[test]
fn expand_is_idempotent_on_a_fully_resolved_string() {
    let env = Environment::from_entries(["FOO=bar"]);
    let once = env.expand("a${FOO:-x}b").unwrap();
    let twice = env.expand(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn expand_indirect_name_resolution() {
    let env = Environment::from_entries(["X=Y", "Y=z"]);
    assert_eq!(
        env.expand("${X}"),
        Ok("Y".to_string()),
        "braced form does not resolve Y -> z, it resolves the literal name X"
    );
}
