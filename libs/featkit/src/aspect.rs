//! Aspects: pluggable handlers that own a piece of feature vocabulary and take
//! part in every assembly phase.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::content::Expander;
use crate::context::HookParams;
use crate::error::{AssemblyError, AssemblyResult};
use crate::feature::Feature;
use crate::resource::{Resource, ResourceMap};
use crate::root::RootNode;
use crate::validation::{ensure_identifier, ensure_object, is_builtin_feature_key};
use crate::vocabulary::Vocabulary;

/// Lifecycle methods of an aspect. Only the slice validator and the gatherer
/// are mandatory.
pub trait AspectHandler: Send + Sync + 'static {
    /// Genesis-time self check. `Some(non-empty)` aborts the run.
    fn validate_own_config(&self, _config: Option<&serde_json::Value>) -> Option<String> {
        None
    }

    /// Turns deferred feature content into real content.
    fn expand_deferred_content(
        &self,
        resources: &ResourceMap,
        _feature: &Feature,
        deferred: &Expander<Resource>,
    ) -> anyhow::Result<Resource> {
        deferred(resources)
    }

    /// `None` or an empty string accepts the content; any other message
    /// rejects it verbatim.
    fn validate_feature_slice(&self, feature: &Feature, content: &Resource) -> Option<String>;

    /// Called once with every active feature.
    fn gather_across_features(
        &self,
        resources: &ResourceMap,
        features: &[Feature],
    ) -> anyhow::Result<()>;

    fn cross_link_across_aspects(
        &self,
        _resources: &ResourceMap,
        _aspects: &AspectSet,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn compose_root_before(
        &self,
        _resources: &ResourceMap,
        root: RootNode,
    ) -> anyhow::Result<RootNode> {
        Ok(root)
    }

    fn compose_root_after(
        &self,
        _resources: &ResourceMap,
        root: RootNode,
    ) -> anyhow::Result<RootNode> {
        Ok(root)
    }

    /// Extra named parameters for feature lifecycle hooks.
    fn inject_hook_params(&self, _resources: &ResourceMap) -> HookParams {
        HookParams::default()
    }
}

/// Named side-channel handlers an aspect publishes for its peers.
#[derive(Clone, Default)]
pub struct Capabilities(BTreeMap<String, Arc<dyn Any + Send + Sync>>);

impl Capabilities {
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let handler = self.0.get(name)?;
        Arc::clone(handler).downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Validated aspect descriptor.
#[derive(Clone)]
pub struct Aspect {
    name: String,
    config: Option<serde_json::Value>,
    handler: Arc<dyn AspectHandler>,
    capabilities: Capabilities,
    feature_extensions: Vec<String>,
}

impl std::fmt::Debug for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aspect")
            .field("name", &self.name)
            .field("has_config", &self.config.is_some())
            .field("capabilities", &self.capabilities.names().collect::<Vec<_>>())
            .field("feature_extensions", &self.feature_extensions)
            .finish()
    }
}

impl Aspect {
    pub fn builder(name: impl Into<String>, handler: impl AspectHandler) -> AspectBuilder {
        Self::builder_arc(name, Arc::new(handler))
    }

    /// Like [`Aspect::builder`] for handlers the caller keeps a handle to.
    pub fn builder_arc(name: impl Into<String>, handler: Arc<dyn AspectHandler>) -> AspectBuilder {
        AspectBuilder {
            name: name.into(),
            config: None,
            handler,
            capabilities: BTreeMap::new(),
            feature_extensions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }

    pub fn handler(&self) -> &dyn AspectHandler {
        self.handler.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.capabilities.get(name)
    }

    /// Feature keys this aspect owns besides its own name.
    pub fn feature_extensions(&self) -> &[String] {
        &self.feature_extensions
    }
}

pub struct AspectBuilder {
    name: String,
    config: Option<serde_json::Value>,
    handler: Arc<dyn AspectHandler>,
    capabilities: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
    feature_extensions: Vec<String>,
}

impl AspectBuilder {
    /// Aspect-level config; must be a JSON object.
    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn capability<T: Any + Send + Sync>(mut self, name: &str, handler: Arc<T>) -> Self {
        self.capabilities.insert(name.to_string(), handler);
        self
    }

    /// Claims an additional feature key for this aspect.
    pub fn feature_extension(mut self, key: &str) -> Self {
        self.feature_extensions.push(key.to_string());
        self
    }

    /// Validates the descriptor and registers its vocabulary.
    pub fn build(self, vocabulary: &Vocabulary) -> AssemblyResult<Aspect> {
        const FUNC: &str = "create_aspect";
        ensure_identifier(FUNC, "name", &self.name)?;
        if is_builtin_feature_key(&self.name) {
            return Err(AssemblyError::ReservedWord {
                word: self.name,
                context: "an aspect name",
            });
        }
        if let Some(config) = &self.config {
            ensure_object(FUNC, "config", config)?;
        }
        for key in &self.feature_extensions {
            ensure_identifier(FUNC, "feature extension", key)?;
        }

        vocabulary.register_feature_key(&self.name, &self.name)?;
        for key in &self.feature_extensions {
            vocabulary.register_feature_key(key, &self.name)?;
        }

        Ok(Aspect {
            name: self.name,
            config: self.config,
            handler: self.handler,
            capabilities: Capabilities(self.capabilities),
            feature_extensions: self.feature_extensions,
        })
    }
}

/// The aspects of one run, in caller order, addressable by name.
#[derive(Clone, Default)]
pub struct AspectSet {
    aspects: Vec<Aspect>,
    by_name: HashMap<String, usize>,
}

impl AspectSet {
    /// Fails on the first duplicated name.
    pub fn new(aspects: Vec<Aspect>) -> AssemblyResult<Self> {
        let mut by_name = HashMap::with_capacity(aspects.len());
        for (i, a) in aspects.iter().enumerate() {
            if by_name.insert(a.name.clone(), i).is_some() {
                return Err(AssemblyError::DuplicateAspectName(a.name.clone()));
            }
        }
        Ok(Self { aspects, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Aspect> {
        self.by_name.get(name).map(|&i| &self.aspects[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Aspect> {
        self.aspects.iter()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// First capability published under `name`, with its aspect's name.
    pub fn find_capability<T: Any + Send + Sync>(&self, name: &str) -> Option<(&str, Arc<T>)> {
        self.aspects
            .iter()
            .find_map(|a| a.capability::<T>(name).map(|c| (a.name(), c)))
    }
}

impl std::fmt::Debug for AspectSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.aspects.iter().map(|a| a.name()))
            .finish()
    }
}
