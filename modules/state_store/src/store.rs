//! In-memory application state: one JSON subtree per feature, updated by
//! feature reducers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::StateStoreConfig;

/// A dispatched state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: &str, payload: Value) -> Self {
        Self {
            kind: kind.to_string(),
            payload,
        }
    }
}

/// Pure reducer over a feature's own subtree.
pub type Reducer = Arc<dyn Fn(&Value, &Action) -> Value + Send + Sync>;

/// Content a feature supplies under the `state` key.
#[derive(Clone)]
pub struct StateSlice {
    pub initial: Value,
    pub reducer: Option<Reducer>,
}

impl StateSlice {
    pub fn new(initial: Value) -> Self {
        Self {
            initial,
            reducer: None,
        }
    }

    pub fn with_reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        self.reducer = Some(Arc::new(reducer));
        self
    }
}

impl std::fmt::Debug for StateSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSlice")
            .field("initial", &self.initial)
            .field("has_reducer", &self.reducer.is_some())
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct StoreInner {
    pub(crate) config: RwLock<StateStoreConfig>,
    state: RwLock<Map<String, Value>>,
    reducers: RwLock<Vec<(String, Reducer)>>,
}

impl StoreInner {
    /// Drops every slice and reducer from a previous assembly.
    pub(crate) fn reset(&self) {
        self.state.write().clear();
        self.reducers.write().clear();
    }

    pub(crate) fn install(&self, feature: &str, slice: &StateSlice) {
        self.state
            .write()
            .insert(feature.to_string(), slice.initial.clone());
        if let Some(reducer) = &slice.reducer {
            self.reducers
                .write()
                .push((feature.to_string(), Arc::clone(reducer)));
        }
    }
}

/// Cloneable handle onto the store.
#[derive(Clone, Default)]
pub struct StoreHandle {
    pub(crate) inner: Arc<StoreInner>,
}

impl StoreHandle {
    /// The whole state tree, keyed by feature name.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.state.read().clone())
    }

    /// One feature's subtree.
    pub fn select(&self, feature: &str) -> Option<Value> {
        self.inner.state.read().get(feature).cloned()
    }

    /// Runs `action` through every reducer, in registration order.
    pub fn dispatch(&self, action: &Action) -> anyhow::Result<()> {
        let config = self.inner.config.read().clone();
        if config.log_actions {
            tracing::debug!(kind = %action.kind, "dispatching action");
        }

        let reducers = self.inner.reducers.read().clone();
        let mut state = self.inner.state.write();
        let mut changed = false;
        for (feature, reducer) in &reducers {
            let current = state.get(feature).cloned().unwrap_or(Value::Null);
            let next = reducer(&current, action);
            if next != current {
                changed = true;
                state.insert(feature.clone(), next);
            }
        }

        if config.strict && !changed {
            anyhow::bail!("action '{}' was not handled by any reducer", action.kind);
        }
        Ok(())
    }

    pub fn features(&self) -> Vec<String> {
        self.inner.state.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("features", &self.features())
            .finish()
    }
}
