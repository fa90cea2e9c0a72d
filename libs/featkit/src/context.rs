//! What lifecycle hooks get to see: the resource map, per-feature config,
//! aspect-injected parameters and the optional state collaborator.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::resource::{Resource, ResourceMap};

/// Provider of per-feature config bags (raw JSON by feature name).
pub trait ConfigProvider: Send + Sync {
    /// The feature's `config` object, if any.
    fn get_feature_config(&self, feature: &str) -> Option<&serde_json::Value>;

    /// Host-side override of the feature's `enabled` flag.
    fn feature_enabled(&self, _feature: &str) -> Option<bool> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("feature '{feature}' config is invalid")]
    InvalidFeatureConfig {
        feature: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Deserializes the feature's config bag, falling back to `T::default()` when
/// the provider has nothing for it.
pub fn feature_config_typed<T: DeserializeOwned + Default>(
    provider: &dyn ConfigProvider,
    feature: &str,
) -> Result<T, ConfigError> {
    match provider.get_feature_config(feature) {
        Some(raw) => {
            serde_json::from_value(raw.clone()).map_err(|source| ConfigError::InvalidFeatureConfig {
                feature: feature.to_string(),
                source,
            })
        }
        None => Ok(T::default()),
    }
}

/// Named parameters aspects inject into feature hooks.
#[derive(Debug, Clone, Default)]
pub struct HookParams(BTreeMap<String, Resource>);

impl HookParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        self.0.insert(name.to_string(), Resource::new(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges `other` in; on a name clash the first injector wins.
    pub(crate) fn absorb(&mut self, source: &str, other: HookParams) {
        for (name, value) in other.0 {
            if self.0.contains_key(&name) {
                tracing::warn!(
                    aspect = source,
                    param = %name,
                    "hook param already injected; ignoring"
                );
                continue;
            }
            self.0.insert(name, value);
        }
    }
}

/// Capability name under which a state-management aspect publishes
/// [`StateAccess`].
pub const STATE_ACCESS_CAPABILITY: &str = "state.access";

type SnapshotFn = Arc<dyn Fn() -> Resource + Send + Sync>;
type DispatchFn = Arc<dyn Fn(Resource) -> anyhow::Result<()> + Send + Sync>;

/// Read/dispatch handle onto an external state store.
#[derive(Clone)]
pub struct StateAccess {
    snapshot: SnapshotFn,
    dispatch: DispatchFn,
}

impl StateAccess {
    pub fn new<S, D>(snapshot: S, dispatch: D) -> Self
    where
        S: Fn() -> Resource + Send + Sync + 'static,
        D: Fn(Resource) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            snapshot: Arc::new(snapshot),
            dispatch: Arc::new(dispatch),
        }
    }

    pub fn snapshot(&self) -> Resource {
        (self.snapshot)()
    }

    pub fn dispatch<A: Any + Send + Sync>(&self, action: A) -> anyhow::Result<()> {
        (self.dispatch)(Resource::new(action))
    }
}

impl std::fmt::Debug for StateAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StateAccess")
    }
}

/// Status sink for early initialization: `(message, error)`.
pub type StatusFn = Arc<dyn Fn(Option<&str>, Option<&anyhow::Error>) + Send + Sync>;

/// Default status sink: structured log lines.
pub fn tracing_status() -> StatusFn {
    Arc::new(|msg: Option<&str>, err: Option<&anyhow::Error>| match (msg, err) {
        (_, Some(e)) => tracing::error!(error = %e, "{}", msg.unwrap_or("initialization failed")),
        (Some(m), None) if !m.is_empty() => tracing::info!("{m}"),
        _ => {}
    })
}

/// Per-feature handle onto the status sink.
#[derive(Clone)]
pub struct StatusReporter {
    feature: String,
    sink: StatusFn,
}

impl StatusReporter {
    pub(crate) fn new(feature: &str, sink: StatusFn) -> Self {
        Self {
            feature: feature.to_string(),
            sink,
        }
    }

    pub fn show(&self, message: &str) {
        (self.sink)(Some(message), None);
    }

    pub(crate) fn fail(&self, error: &anyhow::Error) {
        let message = format!("feature '{}' failed to initialize", self.feature);
        (self.sink)(Some(&message), Some(error));
    }
}

/// Context handed to every feature lifecycle hook.
#[derive(Clone)]
pub struct FeatureCtx {
    feature: String,
    resources: Arc<ResourceMap>,
    config: Option<Arc<dyn ConfigProvider>>,
    params: Arc<HookParams>,
    state: Option<StateAccess>,
}

impl FeatureCtx {
    pub fn new(
        feature: &str,
        resources: Arc<ResourceMap>,
        config: Option<Arc<dyn ConfigProvider>>,
        params: Arc<HookParams>,
        state: Option<StateAccess>,
    ) -> Self {
        Self {
            feature: feature.to_string(),
            resources,
            config,
            params,
            state,
        }
    }

    pub fn feature_name(&self) -> &str {
        &self.feature
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn resources_arc(&self) -> Arc<ResourceMap> {
        Arc::clone(&self.resources)
    }

    /// Typed view of this feature's config bag.
    pub fn config<T: DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        match &self.config {
            Some(provider) => feature_config_typed(provider.as_ref(), &self.feature),
            None => Ok(T::default()),
        }
    }

    pub fn param(&self, name: &str) -> Option<&Resource> {
        self.params.get(name)
    }

    /// Present when an aspect publishes [`STATE_ACCESS_CAPABILITY`].
    pub fn state(&self) -> Option<&StateAccess> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct OneFeature(serde_json::Value);
    impl ConfigProvider for OneFeature {
        fn get_feature_config(&self, feature: &str) -> Option<&serde_json::Value> {
            (feature == "cart").then_some(&self.0)
        }
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct CartCfg {
        #[serde(default)]
        max_items: u32,
    }

    #[test]
    fn typed_config_with_default_fallback() {
        let p = OneFeature(serde_json::json!({ "max_items": 3 }));
        let cfg: CartCfg = feature_config_typed(&p, "cart").unwrap();
        assert_eq!(cfg.max_items, 3);
        let other: CartCfg = feature_config_typed(&p, "search").unwrap();
        assert_eq!(other, CartCfg::default());
    }

    #[test]
    fn bad_config_names_the_feature() {
        let p = OneFeature(serde_json::json!({ "max_items": "many" }));
        let err = feature_config_typed::<CartCfg>(&p, "cart").unwrap_err();
        assert!(err.to_string().contains("cart"));
    }

    #[test]
    fn first_injected_param_wins() {
        let mut params = HookParams::new().with("store", 1u8);
        params.absorb("late", HookParams::new().with("store", 2u8).with("log", "x"));
        assert_eq!(params.get("store").unwrap().downcast_ref::<u8>(), Some(&1));
        assert!(params.get("log").is_some());
    }
}
