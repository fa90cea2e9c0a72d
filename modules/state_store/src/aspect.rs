use std::sync::Arc;

use featkit::{
    Aspect, AspectHandler, AssemblyResult, Feature, HookParams, Resource, ResourceMap, RootNode,
    StateAccess, Vocabulary, STATE_ACCESS_CAPABILITY,
};
use tracing::{debug, info};

use crate::config::StateStoreConfig;
use crate::store::{Action, StateSlice, StoreHandle};

/// Feature key owned by this aspect.
pub const STATE_KEY: &str = "state";

/// Root wrapper that makes the store reachable from the composed root.
#[derive(Debug, Clone)]
pub struct StateProvider {
    pub child: RootNode,
    pub store: StoreHandle,
}

/// Owner of one application's state. Build its aspect once per run.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    handle: StoreHandle,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// The `state` aspect. It publishes [`StateAccess`] under
    /// [`STATE_ACCESS_CAPABILITY`] and injects the `store` hook param.
    pub fn aspect(
        &self,
        vocabulary: &Vocabulary,
        config: Option<serde_json::Value>,
    ) -> AssemblyResult<Aspect> {
        let snapshot_handle = self.handle.clone();
        let dispatch_handle = self.handle.clone();
        let access = StateAccess::new(
            move || Resource::new(snapshot_handle.snapshot()),
            move |action: Resource| {
                let action = action
                    .downcast_ref::<Action>()
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "expected a state_store::Action, got {}",
                            action.type_name()
                        )
                    })?;
                dispatch_handle.dispatch(action)
            },
        );

        let handler = StateAspect {
            handle: self.handle.clone(),
            raw_config: config.clone(),
        };
        let mut builder = Aspect::builder(STATE_KEY, handler)
            .capability(STATE_ACCESS_CAPABILITY, Arc::new(access));
        if let Some(config) = config {
            builder = builder.config(config);
        }
        builder.build(vocabulary)
    }
}

struct StateAspect {
    handle: StoreHandle,
    raw_config: Option<serde_json::Value>,
}

impl StateAspect {
    fn parsed_config(&self) -> Result<StateStoreConfig, serde_json::Error> {
        match &self.raw_config {
            Some(raw) => serde_json::from_value(raw.clone()),
            None => Ok(StateStoreConfig::default()),
        }
    }
}

impl AspectHandler for StateAspect {
    fn validate_own_config(&self, config: Option<&serde_json::Value>) -> Option<String> {
        let raw = config?;
        serde_json::from_value::<StateStoreConfig>(raw.clone())
            .err()
            .map(|e| format!("invalid state config: {e}"))
    }

    fn validate_feature_slice(&self, _feature: &Feature, content: &Resource) -> Option<String> {
        let Some(slice) = content.downcast_ref::<StateSlice>() else {
            return Some(format!(
                "expected a state_store::StateSlice, got {}",
                content.type_name()
            ));
        };
        slice
            .initial
            .is_null()
            .then(|| "initial state must not be null".to_string())
    }

    fn gather_across_features(
        &self,
        _resources: &ResourceMap,
        features: &[Feature],
    ) -> anyhow::Result<()> {
        *self.handle.inner.config.write() = self.parsed_config()?;
        self.handle.inner.reset();

        for feature in features {
            if let Some(slice) = feature.slice_as::<StateSlice>(STATE_KEY) {
                debug!(feature = feature.name(), "installing state slice");
                self.handle.inner.install(feature.name(), slice);
            }
        }
        info!(features = ?self.handle.features(), "state assembled");
        Ok(())
    }

    fn compose_root_after(
        &self,
        _resources: &ResourceMap,
        root: RootNode,
    ) -> anyhow::Result<RootNode> {
        Ok(RootNode::new(StateProvider {
            child: root,
            store: self.handle.clone(),
        }))
    }

    fn inject_hook_params(&self, _resources: &ResourceMap) -> HookParams {
        HookParams::new().with("store", self.handle.clone())
    }
}
