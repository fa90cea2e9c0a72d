//! Registry of recognised feature keys and their owners.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{AssemblyError, AssemblyResult};
use crate::validation::{ensure_identifier, is_builtin_feature_key};

/// Feature vocabulary shared by the aspect and feature factories and the
/// orchestrator.
///
/// Registration is additive and keyed by owner: the same owner may register a
/// key any number of times, a different owner may not take it over.
#[derive(Debug, Default)]
pub struct Vocabulary {
    feature_keys: DashMap<String, String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_feature_key(&self, key: &str, owner: &str) -> AssemblyResult<()> {
        ensure_identifier("register_feature_key", "key", key)?;
        ensure_identifier("register_feature_key", "owner", owner)?;
        if is_builtin_feature_key(key) {
            return Err(AssemblyError::ReservedWord {
                word: key.to_string(),
                context: "a feature extension key",
            });
        }

        match self.feature_keys.entry(key.to_string()) {
            Entry::Occupied(existing) if existing.get() == owner => Ok(()),
            Entry::Occupied(existing) => Err(AssemblyError::ExtensionConflict {
                key: key.to_string(),
                owner: owner.to_string(),
                existing_owner: existing.get().clone(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(key, owner, "feature key registered");
                slot.insert(owner.to_string());
                Ok(())
            }
        }
    }

    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.feature_keys.get(key).map(|o| o.value().clone())
    }

    /// Built-in or registered by some owner.
    pub fn is_known(&self, key: &str) -> bool {
        is_builtin_feature_key(key) || self.feature_keys.contains_key(key)
    }

    pub fn keys_owned_by(&self, owner: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .feature_keys
            .iter()
            .filter(|e| e.value() == owner)
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Forgets every registration.
    pub fn reset(&self) {
        self.feature_keys.clear();
    }
}
