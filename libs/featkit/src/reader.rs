//! Reader sugar over an assembled [`ResourceMap`].

use std::collections::BTreeMap;

use crate::error::{AssemblyError, AssemblyResult};
use crate::resource::{Resolved, ResourceMap};

/// What to read: one pattern, or several patterns under local prop names.
#[derive(Debug, Clone)]
pub enum Selector {
    Pattern(String),
    Props(Vec<(String, String)>),
}

impl Selector {
    pub fn pattern(pattern: &str) -> Self {
        Selector::Pattern(pattern.to_string())
    }

    pub fn props<'a>(props: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Selector::Props(
            props
                .into_iter()
                .map(|(p, pat)| (p.to_string(), pat.to_string()))
                .collect(),
        )
    }
}

impl From<&str> for Selector {
    fn from(pattern: &str) -> Self {
        Selector::pattern(pattern)
    }
}

#[derive(Debug, Clone)]
pub enum ReadOutput {
    Single(Resolved),
    Props(BTreeMap<String, Resolved>),
}

impl ReadOutput {
    pub fn single(&self) -> Option<&Resolved> {
        match self {
            ReadOutput::Single(r) => Some(r),
            ReadOutput::Props(_) => None,
        }
    }

    pub fn prop(&self, name: &str) -> Option<&Resolved> {
        match self {
            ReadOutput::Props(m) => m.get(name),
            ReadOutput::Single(_) => None,
        }
    }
}

/// Resolves `selector` against `map`. Patterns may carry `@withKeys`.
pub fn read(map: &ResourceMap, selector: impl Into<Selector>) -> AssemblyResult<ReadOutput> {
    match selector.into() {
        Selector::Pattern(p) => Ok(ReadOutput::Single(map.get(&p)?)),
        Selector::Props(props) => {
            if props.is_empty() {
                return Err(AssemblyError::parameter("read", "selector has no props"));
            }
            let mut out = BTreeMap::new();
            for (prop, pattern) in props {
                let resolved = map.get(&pattern)?;
                if out.insert(prop.clone(), resolved).is_some() {
                    return Err(AssemblyError::parameter(
                        "read",
                        format!("prop '{prop}' is listed more than once"),
                    ));
                }
            }
            Ok(ReadOutput::Props(out))
        }
    }
}
