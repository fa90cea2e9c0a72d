//! Parameter and shape assertions shared by the factories, the store and the
//! orchestrator.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AssemblyError, AssemblyResult};

static DEFINITION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(\.[A-Za-z][A-Za-z0-9]*)*$").expect("definition key regex")
});

static PATTERN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z*][A-Za-z0-9*]*(\.[A-Za-z*][A-Za-z0-9*]*)*$").expect("pattern key regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier regex"));

/// Feature vocabulary owned by featkit itself. Aspects may not claim these.
pub const BUILTIN_FEATURE_KEYS: &[&str] = &[
    "name",
    "enabled",
    "public_face",
    "resources",
    "before_start",
    "after_init",
    "after_start",
];

/// Root names taken by the resource map's own accessors.
pub const RESERVED_RESOURCE_ROOTS: &[&str] = &["get", "hasFeature", "isFeatureActive"];

pub fn is_builtin_feature_key(key: &str) -> bool {
    BUILTIN_FEATURE_KEYS.contains(&key)
}

/// Fails with a [`AssemblyError::ParameterViolation`] when `value` is blank.
pub fn ensure_non_empty(func: &'static str, what: &str, value: &str) -> AssemblyResult<()> {
    if value.trim().is_empty() {
        return Err(AssemblyError::parameter(
            func,
            format!("{what} is required (non-empty string)"),
        ));
    }
    Ok(())
}

/// Aspect names and feature vocabulary keys: `[A-Za-z][A-Za-z0-9_]*`.
pub fn ensure_identifier(func: &'static str, what: &str, value: &str) -> AssemblyResult<()> {
    ensure_non_empty(func, what, value)?;
    if !IDENTIFIER.is_match(value) {
        return Err(AssemblyError::parameter(
            func,
            format!("{what} '{value}' must be an identifier ([A-Za-z][A-Za-z0-9_]*)"),
        ));
    }
    Ok(())
}

/// Config payloads must be plain key/value objects.
pub fn ensure_object(
    func: &'static str,
    what: &str,
    value: &serde_json::Value,
) -> AssemblyResult<()> {
    if !value.is_object() {
        return Err(AssemblyError::parameter(
            func,
            format!("{what} must be a plain key/value object"),
        ));
    }
    Ok(())
}

/// Validates a resource definition key (no wildcards).
pub fn validate_resource_key(key: &str) -> AssemblyResult<()> {
    validate_segments(key, false)?;
    let root = key.split('.').next().unwrap_or_default();
    if RESERVED_RESOURCE_ROOTS.contains(&root) {
        return Err(AssemblyError::ReservedWord {
            word: root.to_string(),
            context: "the root segment of a resource key",
        });
    }
    Ok(())
}

/// Validates a lookup / usage pattern (`*` allowed anywhere in a segment).
pub fn validate_resource_pattern(pattern: &str) -> AssemblyResult<()> {
    validate_segments(pattern, true)
}

pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*')
}

fn validate_segments(key: &str, wildcards: bool) -> AssemblyResult<()> {
    let grammar = if wildcards { &PATTERN_KEY } else { &DEFINITION_KEY };
    if grammar.is_match(key) {
        return Ok(());
    }
    Err(AssemblyError::InvalidKey {
        key: key.to_string(),
        reason: diagnose(key, wildcards).to_string(),
    })
}

/// Names the first rule a rejected key breaks.
fn diagnose(key: &str, wildcards: bool) -> &'static str {
    if key.is_empty() {
        return "key is empty";
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return "whitespace and control characters (CR/LF) are not allowed";
    }
    if !wildcards && key.contains('*') {
        return "wildcards are only allowed in lookup/usage patterns";
    }

    for segment in key.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            None => return "empty segment (leading, trailing or double dot)",
            Some(c) if c.is_ascii_alphabetic() || (wildcards && c == '*') => {}
            Some(c) if c.is_ascii_digit() => return "segments may not start with a digit",
            Some(_) => return "segments must start with a letter",
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || (wildcards && c == '*')) {
            return "segments may only contain letters and digits";
        }
    }
    "key does not match the dotted segment grammar"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind_of(r: AssemblyResult<()>) -> ErrorKind {
        r.unwrap_err().kind()
    }

    #[test]
    fn accepts_well_formed_keys() {
        for key in ["a", "MainPage.cart.link", "x1.y2Z.z3"] {
            assert!(validate_resource_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in [
            "", "a..b", ".a", "a.", "1a", "a.2b", "a b", "a.b\n", "a\r.b", "a-b", "a.*",
        ] {
            assert_eq!(kind_of(validate_resource_key(key)), ErrorKind::InvalidKey, "{key:?}");
        }
    }

    #[test]
    fn patterns_allow_wildcards_anywhere_in_a_segment() {
        for p in ["*", "MainPage.*.link", "a*.b", "a.*x*", "*.*"] {
            assert!(validate_resource_pattern(p).is_ok(), "{p}");
        }
        for p in ["a..*", "a.1*", "a.* b"] {
            assert_eq!(kind_of(validate_resource_pattern(p)), ErrorKind::InvalidKey, "{p}");
        }
    }

    #[test]
    fn rejections_name_the_broken_rule() {
        let cases = [
            ("", false, "key is empty"),
            ("a b", false, "whitespace"),
            ("a.*", false, "wildcards are only allowed"),
            ("a..b", false, "empty segment"),
            ("a.2b", false, "may not start with a digit"),
            ("a._b", false, "must start with a letter"),
            ("a.b_c", false, "only contain letters and digits"),
            ("a.1*", true, "may not start with a digit"),
            ("a.b-*", true, "only contain letters and digits"),
        ];
        for (key, wildcards, reason) in cases {
            match validate_segments(key, wildcards) {
                Err(AssemblyError::InvalidKey { reason: got, .. }) => {
                    assert!(got.contains(reason), "{key:?}: {got}")
                }
                other => panic!("{key:?}: expected InvalidKey, got {other:?}"),
            }
        }
    }

    #[test]
    fn grammar_and_diagnosis_agree() {
        let samples = [
            "a", "a.b", "A1.b2", "*", "a*.*b", "a.", ".a", "a..b", "1a", "a.1", "a_b", "a-b",
            "a b", "a\n", "é", "a.é", "**.x", "x.**", "a.b.c.d",
        ];
        for key in samples {
            for wildcards in [false, true] {
                let grammar = if wildcards { &PATTERN_KEY } else { &DEFINITION_KEY };
                let reason = diagnose(key, wildcards);
                let clean = reason == "key does not match the dotted segment grammar";
                assert_eq!(grammar.is_match(key), clean, "{key:?} wildcards={wildcards}: {reason}");
            }
        }
    }

    #[test]
    fn reserved_roots_are_rejected_for_definitions_only() {
        assert_eq!(kind_of(validate_resource_key("get.x")), ErrorKind::ReservedWord);
        assert!(validate_resource_key("x.get").is_ok());
        assert!(validate_resource_pattern("get.*").is_ok());
    }

    #[test]
    fn identifiers_and_objects() {
        assert!(ensure_identifier("create_aspect", "name", "state_store").is_ok());
        assert!(ensure_identifier("create_aspect", "name", "").is_err());
        assert!(ensure_identifier("create_aspect", "name", "9lives").is_err());
        assert!(ensure_object("create_aspect", "config", &serde_json::json!({})).is_ok());
        let err = ensure_object("create_aspect", "config", &serde_json::json!([1])).unwrap_err();
        assert!(err.to_string().starts_with("create_aspect()"));
    }
}
