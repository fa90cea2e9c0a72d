//! Literal vs. deferred feature content.

use std::sync::Arc;

use crate::resource::ResourceMap;

/// Produces real content once the resource map exists.
pub type Expander<T> = Arc<dyn Fn(&ResourceMap) -> anyhow::Result<T> + Send + Sync>;

/// Feature content that is either known at declaration time or expanded by
/// the orchestrator with the assembled resource map.
///
/// Deferring breaks the cycle between features that both publish and consume
/// cross-feature resources.
#[derive(Clone)]
pub enum Content<T> {
    Literal(T),
    Deferred(Expander<T>),
}

impl<T> Content<T> {
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&ResourceMap) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Content::Deferred(Arc::new(f))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Content::Deferred(_))
    }

    pub fn as_literal(&self) -> Option<&T> {
        match self {
            Content::Literal(v) => Some(v),
            Content::Deferred(_) => None,
        }
    }
}

impl<T> std::fmt::Debug for Content<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Literal(_) => f.write_str("Content::Literal"),
            Content::Deferred(_) => f.write_str("Content::Deferred"),
        }
    }
}

impl<T> From<T> for Content<T> {
    fn from(value: T) -> Self {
        Content::Literal(value)
    }
}
