//! Feature descriptors and their factory.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::content::Content;
use crate::context::{FeatureCtx, StatusReporter};
use crate::error::{AssemblyError, AssemblyResult};
use crate::resource::{Resource, ResourceMap, UsageOptions};
use crate::root::RootNode;
use crate::validation::{ensure_non_empty, is_builtin_feature_key};
use crate::vocabulary::Vocabulary;

/// Folds the root during composition; `None` keeps the current root.
pub type BeforeStartFn =
    Arc<dyn Fn(&FeatureCtx, &RootNode) -> anyhow::Result<Option<RootNode>> + Send + Sync>;

pub type AfterStartFn = Arc<dyn Fn(&FeatureCtx) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous early initialization, awaited before `after_start`.
#[async_trait]
pub trait FeatureInit: Send + Sync {
    async fn init(&self, ctx: FeatureCtx, status: StatusReporter) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> FeatureInit for F
where
    F: Fn(FeatureCtx, StatusReporter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn init(&self, ctx: FeatureCtx, status: StatusReporter) -> anyhow::Result<()> {
        (self)(ctx, status).await
    }
}

#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub before_start: Option<BeforeStartFn>,
    pub after_init: Option<Arc<dyn FeatureInit>>,
    pub after_start: Option<AfterStartFn>,
}

#[derive(Debug, Clone)]
pub(crate) struct Definition {
    pub key: String,
    pub value: Resource,
    pub fulfils_contract: bool,
}

/// A feature's resource directives: definitions (in call order) and usage
/// contracts.
#[derive(Debug, Clone, Default)]
pub struct ResourceDecl {
    pub(crate) definitions: Vec<Definition>,
    pub(crate) usages: Vec<(String, UsageOptions)>,
}

impl ResourceDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a resource.
    pub fn define<T: Any + Send + Sync>(mut self, key: &str, value: T) -> Self {
        self.definitions.push(Definition {
            key: key.to_string(),
            value: Resource::new(value),
            fulfils_contract: false,
        });
        self
    }

    /// Publishes a resource that fulfils another feature's usage contract.
    pub fn define_use<T: Any + Send + Sync>(mut self, key: &str, value: T) -> Self {
        self.definitions.push(Definition {
            key: key.to_string(),
            value: Resource::new(value),
            fulfils_contract: true,
        });
        self
    }

    /// Declares the intent to consume resources matching `pattern`.
    pub fn uses(mut self, pattern: &str, options: UsageOptions) -> Self {
        self.usages.push((pattern.to_string(), options));
        self
    }

    pub fn definition_keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.key.as_str())
    }

    pub fn usage_patterns(&self) -> impl Iterator<Item = &str> {
        self.usages.iter().map(|(p, _)| p.as_str())
    }
}

/// A named, independently authored unit of the application.
#[derive(Clone)]
pub struct Feature {
    name: String,
    enabled: bool,
    public_face: Option<Resource>,
    resources: Option<Content<ResourceDecl>>,
    slices: Vec<(String, Content<Resource>)>,
    hooks: LifecycleHooks,
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slices: Vec<&str> = self.slices.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("has_public_face", &self.public_face.is_some())
            .field("resources", &self.resources)
            .field("slices", &slices)
            .field("has_before_start", &self.hooks.before_start.is_some())
            .field("has_after_init", &self.hooks.after_init.is_some())
            .field("has_after_start", &self.hooks.after_start.is_some())
            .finish()
    }
}

impl Feature {
    pub fn builder(name: impl Into<String>) -> FeatureBuilder {
        FeatureBuilder {
            name: name.into(),
            enabled: true,
            public_face: None,
            resources: None,
            slices: Vec::new(),
            hooks: LifecycleHooks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn public_face(&self) -> Option<&Resource> {
        self.public_face.as_ref()
    }

    pub fn resources(&self) -> Option<&Content<ResourceDecl>> {
        self.resources.as_ref()
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    pub fn slice(&self, key: &str) -> Option<&Content<Resource>> {
        self.slices.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    /// Literal slice content downcast to `T`. Deferred slices read as `None`
    /// until the orchestrator has expanded them.
    pub fn slice_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.slice(key)?.as_literal()?.downcast_ref::<T>()
    }

    pub fn slice_keys(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|(k, _)| k.as_str())
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn store_expanded(&mut self, key: &str, value: Resource) {
        if let Some((_, slot)) = self.slices.iter_mut().find(|(k, _)| k == key) {
            *slot = Content::Literal(value);
        }
    }
}

/// Collects a feature's payload; [`FeatureBuilder::build`] validates it.
pub struct FeatureBuilder {
    name: String,
    enabled: bool,
    public_face: Option<Resource>,
    resources: Option<Content<ResourceDecl>>,
    slices: Vec<(String, Content<Resource>)>,
    hooks: LifecycleHooks,
}

impl FeatureBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn public_face<T: Any + Send + Sync>(mut self, face: T) -> Self {
        self.public_face = Some(Resource::new(face));
        self
    }

    pub fn resources(mut self, decl: ResourceDecl) -> Self {
        self.resources = Some(Content::Literal(decl));
        self
    }

    /// Resource directives computed from the resource map during expansion.
    pub fn deferred_resources<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceMap) -> anyhow::Result<ResourceDecl> + Send + Sync + 'static,
    {
        self.resources = Some(Content::deferred(f));
        self
    }

    /// Aspect-owned content under `key`.
    pub fn slice<T: Any + Send + Sync>(mut self, key: &str, value: T) -> Self {
        self.slices
            .push((key.to_string(), Content::Literal(Resource::new(value))));
        self
    }

    pub fn deferred_slice<T, F>(mut self, key: &str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResourceMap) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.slices.push((
            key.to_string(),
            Content::deferred(move |map| f(map).map(Resource::new)),
        ));
        self
    }

    pub fn before_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&FeatureCtx, &RootNode) -> anyhow::Result<Option<RootNode>> + Send + Sync + 'static,
    {
        self.hooks.before_start = Some(Arc::new(f));
        self
    }

    pub fn after_init(mut self, init: impl FeatureInit + 'static) -> Self {
        self.hooks.after_init = Some(Arc::new(init));
        self
    }

    pub fn after_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&FeatureCtx) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.after_start = Some(Arc::new(f));
        self
    }

    /// Shape checks only; cross-feature validation happens during assembly.
    pub fn build(self, vocabulary: &Vocabulary) -> AssemblyResult<Feature> {
        const FUNC: &str = "create_feature";
        ensure_non_empty(FUNC, "name", &self.name)?;

        for (i, (key, _)) in self.slices.iter().enumerate() {
            if is_builtin_feature_key(key) {
                return Err(AssemblyError::ReservedWord {
                    word: key.clone(),
                    context: "an aspect content key",
                });
            }
            if !vocabulary.is_known(key) {
                return Err(AssemblyError::parameter(
                    FUNC,
                    format!(
                        "feature '{}' uses unrecognized key '{key}' (no aspect registered it)",
                        self.name
                    ),
                ));
            }
            if self.slices[..i].iter().any(|(k, _)| k == key) {
                return Err(AssemblyError::parameter(
                    FUNC,
                    format!("feature '{}' supplies key '{key}' more than once", self.name),
                ));
            }
        }

        Ok(Feature {
            name: self.name,
            enabled: self.enabled,
            public_face: self.public_face,
            resources: self.resources,
            slices: self.slices,
            hooks: self.hooks,
        })
    }
}
