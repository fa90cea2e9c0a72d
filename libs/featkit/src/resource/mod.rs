//! Resource namespace: dotted keys, wildcard matchers, the nested projection
//! and the per-run store behind the public [`ResourceMap`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

mod map;
mod matcher;
mod store;
mod tree;

pub use map::{EmptyFace, ResourceMap, WITH_KEYS_SUFFIX};
pub use matcher::Matcher;
pub use store::{Resolved, ResourceEntry, ResourceStore, UsageContract, UsageOptions};
pub use tree::{Node, ResourceTree};

/// An opaque, cheaply cloneable resource value.
#[derive(Clone)]
pub struct Resource {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Resource {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Shared handle to the concrete value.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn value_type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(a: &Resource, b: &Resource) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource<{}>", self.type_name)
    }
}

/// Declared value type of a usage contract. Two constraints are the same
/// validator iff they name the same Rust type.
#[derive(Clone, Copy)]
pub struct TypeConstraint {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeConstraint {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn admits(&self, value: &Resource) -> bool {
        value.value_type_id() == self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeConstraint {}

impl fmt::Debug for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
