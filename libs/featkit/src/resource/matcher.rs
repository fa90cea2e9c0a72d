use regex::Regex;

use crate::error::{AssemblyError, AssemblyResult};
use crate::validation::{has_wildcard, validate_resource_pattern};

/// Compiled lookup pattern.
///
/// Dots and every other literal are escaped; `*` matches zero or more
/// non-newline characters; the expression is anchored to the whole key.
/// `Regex::is_match` keeps no cursor between calls, so a matcher can be shared
/// and reused freely.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    regex: Option<Regex>,
}

impl Matcher {
    pub fn compile(pattern: &str) -> AssemblyResult<Self> {
        validate_resource_pattern(pattern)?;

        let regex = if has_wildcard(pattern) {
            let body = regex::escape(pattern).replace(r"\*", "[^\n]*");
            let re = Regex::new(&format!("^{body}$")).map_err(|e| AssemblyError::InvalidKey {
                key: pattern.to_string(),
                reason: format!("cannot compile matcher: {e}"),
            })?;
            Some(re)
        } else {
            None
        };

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_wildcard(&self) -> bool {
        self.regex.is_some()
    }

    pub fn matches(&self, key: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(key),
            None => self.pattern == key,
        }
    }
}
