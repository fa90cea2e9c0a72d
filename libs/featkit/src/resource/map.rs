use std::any::Any;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Resolved, Resource, ResourceStore};
use crate::error::AssemblyResult;

/// Suffix asking the reader for `(key, value)` pairs instead of bare values.
pub const WITH_KEYS_SUFFIX: &str = "@withKeys";

/// Public face published for an active feature that declares none.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmptyFace;

/// The assembled, read-only view handed to hooks and readers:
/// every active feature's public face plus the resolved resource namespace.
pub struct ResourceMap {
    faces: RwLock<Vec<(String, Resource)>>,
    store: RwLock<ResourceStore>,
}

impl std::fmt::Debug for ResourceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMap")
            .field("features", &self.feature_names())
            .field("store", &*self.store.read())
            .finish()
    }
}

impl Default for ResourceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMap {
    pub fn new() -> Self {
        Self {
            faces: RwLock::new(Vec::new()),
            store: RwLock::new(ResourceStore::new()),
        }
    }

    /// Resolves `pattern`; a trailing `@withKeys` yields `(key, value)` pairs.
    pub fn get(&self, pattern: &str) -> AssemblyResult<Resolved> {
        let store = self.store.read();
        match pattern.strip_suffix(WITH_KEYS_SUFFIX) {
            Some(bare) => store.resolve_with_keys(bare),
            None => store.resolve(pattern),
        }
    }

    /// Typed single-key lookup. `None` when absent or of another type.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.store
            .read()
            .resolve(key)
            .ok()?
            .one()
            .and_then(Resource::downcast::<T>)
    }

    pub fn is_feature_active(&self, name: &str) -> bool {
        self.faces.read().iter().any(|(n, _)| n == name)
    }

    /// The public face of an active feature ([`EmptyFace`] when it has none).
    pub fn public_face(&self, feature: &str) -> Option<Resource> {
        self.faces
            .read()
            .iter()
            .find(|(n, _)| n == feature)
            .map(|(_, face)| face.clone())
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.faces.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Read access to the underlying store (entries, contracts, tree).
    pub fn store(&self) -> RwLockReadGuard<'_, ResourceStore> {
        self.store.read()
    }

    pub(crate) fn store_mut(&self) -> RwLockWriteGuard<'_, ResourceStore> {
        self.store.write()
    }

    pub(crate) fn publish_face(&self, feature: &str, face: Option<Resource>) {
        let face = face.unwrap_or_else(|| Resource::new(EmptyFace));
        self.faces.write().push((feature.to_string(), face));
    }
}
