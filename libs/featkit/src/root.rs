//! The opaque UI root threaded through root composition.

use std::any::Any;

use crate::resource::Resource;

/// Opaque root value. featkit never looks inside: aspects and features may
/// only replace it, typically with a new node that wraps the previous one.
#[derive(Clone, Default)]
pub struct RootNode(Option<Resource>);

impl RootNode {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Resource::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|r| r.downcast_ref::<T>())
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for RootNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(r) => write!(f, "RootNode({})", r.type_name()),
            None => f.write_str("RootNode(empty)"),
        }
    }
}
