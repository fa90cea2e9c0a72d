//! Assembly - drives features and aspects through the fixed lifecycle
//!
//! genesis → content validation → pruning → map seed → deferred expansion →
//! gather → cross-link → root composition → registration → early init →
//! after start.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::aspect::{Aspect, AspectSet};
use crate::content::Content;
use crate::context::{
    ConfigProvider, FeatureCtx, HookParams, StateAccess, StatusFn, StatusReporter,
    STATE_ACCESS_CAPABILITY,
};
use crate::error::{AssemblyError, AssemblyResult};
use crate::feature::{Feature, ResourceDecl};
use crate::resource::{Resource, ResourceMap};
use crate::root::RootNode;
use crate::vocabulary::Vocabulary;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct App {
    resources: Arc<ResourceMap>,
    active_features: Vec<String>,
}

impl App {
    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn resources_arc(&self) -> Arc<ResourceMap> {
        Arc::clone(&self.resources)
    }

    /// Names of the features that survived pruning, in caller order.
    pub fn active_features(&self) -> &[String] {
        &self.active_features
    }
}

/// One assembly run. Phase methods must be called in order; use
/// [`Assembly::run_full_cycle`] unless a test needs to stop in between.
pub struct Assembly {
    vocabulary: Arc<Vocabulary>,
    supplied_aspects: Vec<Aspect>,
    aspects: AspectSet,
    features: Vec<Feature>,
    active: Vec<Feature>,
    resources: Arc<ResourceMap>,
    config: Option<Arc<dyn ConfigProvider>>,
    status: StatusFn,
    params: Arc<HookParams>,
    state: Option<StateAccess>,
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let features: Vec<&str> = self.features.iter().map(Feature::name).collect();
        let active: Vec<&str> = self.active.iter().map(Feature::name).collect();
        f.debug_struct("Assembly")
            .field("aspects", &self.aspects)
            .field("features", &features)
            .field("active", &active)
            .field("has_config", &self.config.is_some())
            .finish()
    }
}

impl Assembly {
    /// Prepares a run without executing any phase.
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        features: Vec<Feature>,
        aspects: Vec<Aspect>,
        config: Option<Arc<dyn ConfigProvider>>,
        status: StatusFn,
    ) -> Self {
        Self {
            vocabulary,
            supplied_aspects: aspects,
            aspects: AspectSet::default(),
            features,
            active: Vec::new(),
            resources: Arc::new(ResourceMap::new()),
            config,
            status,
            params: Arc::new(HookParams::default()),
            state: None,
        }
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn aspects(&self) -> &AspectSet {
        &self.aspects
    }

    /// Working copies of the active features (expanded slices included).
    pub fn active_features(&self) -> &[Feature] {
        &self.active
    }

    /// GENESIS: aspects check their own config, the by-name lookup is built
    /// and config-driven enablement overrides are applied.
    pub fn run_genesis_phase(&mut self) -> AssemblyResult<()> {
        tracing::info!("Phase: genesis");

        for aspect in &self.supplied_aspects {
            if let Some(message) = aspect.handler().validate_own_config(aspect.config()) {
                if !message.is_empty() {
                    return Err(AssemblyError::AspectConfigInvalid {
                        aspect: aspect.name().to_string(),
                        message,
                    });
                }
            }
        }
        self.aspects = AspectSet::new(std::mem::take(&mut self.supplied_aspects))?;

        if let Some(provider) = &self.config {
            for feature in &mut self.features {
                if let Some(enabled) = provider.feature_enabled(feature.name()) {
                    if enabled != feature.enabled() {
                        tracing::info!(
                            feature = feature.name(),
                            enabled,
                            "enablement overridden by config"
                        );
                        feature.set_enabled(enabled);
                    }
                }
            }
        }

        Ok(())
    }

    /// CONTENT VALIDATION: every slice key must belong to a supplied aspect;
    /// literal aspect content is checked by its aspect.
    pub fn run_content_validation_phase(&self) -> AssemblyResult<()> {
        tracing::info!("Phase: feature_content_validation");

        for feature in self.features.iter().filter(|f| f.enabled()) {
            for key in feature.slice_keys() {
                if self.owning_aspect(key).is_none() {
                    return Err(AssemblyError::UnknownAspectKey {
                        feature: feature.name().to_string(),
                        key: key.to_string(),
                    });
                }
            }
            for aspect in self.aspects.iter() {
                if let Some(Content::Literal(content)) = feature.slice(aspect.name()) {
                    check_slice(aspect, feature, content)?;
                }
            }
        }

        Ok(())
    }

    /// PRUNING: names must be unique across every supplied feature; only
    /// enabled ones stay.
    pub fn run_pruning_phase(&mut self) -> AssemblyResult<()> {
        tracing::info!("Phase: feature_pruning");

        let mut seen = HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature.name()) {
                return Err(AssemblyError::DuplicateFeatureName(feature.name().to_string()));
            }
        }

        self.active = self.features.iter().filter(|f| f.enabled()).cloned().collect();
        for feature in self.features.iter().filter(|f| !f.enabled()) {
            tracing::debug!(feature = feature.name(), "feature disabled; pruned");
        }
        Ok(())
    }

    /// MAP SEED: public faces, then every literal resource payload.
    pub fn run_seed_phase(&self) -> AssemblyResult<()> {
        tracing::info!("Phase: resource_map_seed");

        for feature in &self.active {
            self.resources
                .publish_face(feature.name(), feature.public_face().cloned());
        }
        self.resources
            .store_mut()
            .rank_features(self.active.iter().map(|f| f.name()));
        for feature in &self.active {
            if let Some(Content::Literal(decl)) = feature.resources() {
                tracing::debug!(feature = feature.name(), "defining resources");
                self.apply_decl(feature.name(), decl)?;
            }
        }
        Ok(())
    }

    /// DEFERRED EXPANSION: deferred resource payloads, then deferred aspect
    /// content (re-validated as it lands), then late contract validation.
    pub fn run_expansion_phase(&mut self) -> AssemblyResult<()> {
        tracing::info!("Phase: deferred_expansion");

        for feature in &self.active {
            if let Some(Content::Deferred(expand)) = feature.resources() {
                tracing::debug!(feature = feature.name(), "expanding deferred resources");
                let decl =
                    expand(self.resources.as_ref()).map_err(|source| AssemblyError::Expansion {
                        feature: feature.name().to_string(),
                        aspect: "resources".to_string(),
                        source,
                    })?;
                self.apply_decl(feature.name(), &decl)?;
            }
        }

        for aspect in self.aspects.iter() {
            let mut keys = vec![aspect.name().to_string()];
            keys.extend(aspect.feature_extensions().iter().cloned());

            for key in &keys {
                for i in 0..self.active.len() {
                    let expand = match self.active[i].slice(key) {
                        Some(Content::Deferred(expand)) => Arc::clone(expand),
                        _ => continue,
                    };
                    let feature = &self.active[i];
                    tracing::debug!(
                        feature = feature.name(),
                        aspect = aspect.name(),
                        key = %key,
                        "expanding deferred content"
                    );
                    let value = aspect
                        .handler()
                        .expand_deferred_content(&self.resources, feature, &expand)
                        .map_err(|source| AssemblyError::Expansion {
                            feature: feature.name().to_string(),
                            aspect: aspect.name().to_string(),
                            source,
                        })?;

                    self.active[i].store_expanded(key, value.clone());
                    if key == aspect.name() {
                        check_slice(aspect, &self.active[i], &value)?;
                    }
                }
            }
        }

        self.resources.store().validate_contracts()?;
        Ok(())
    }

    /// GATHER: each aspect sees every active feature once.
    pub fn run_gather_phase(&self) -> AssemblyResult<()> {
        tracing::info!("Phase: feature_content_gathering");

        for aspect in self.aspects.iter() {
            tracing::debug!(aspect = aspect.name(), "gathering feature content");
            aspect
                .handler()
                .gather_across_features(&self.resources, &self.active)
                .map_err(|source| AssemblyError::Gather {
                    aspect: aspect.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// CROSS-LINK: aspects may consult each other's capabilities.
    pub fn run_cross_link_phase(&mut self) -> AssemblyResult<()> {
        tracing::info!("Phase: aspect_cross_linking");

        for aspect in self.aspects.iter() {
            aspect
                .handler()
                .cross_link_across_aspects(&self.resources, &self.aspects)
                .map_err(|source| AssemblyError::CrossLink {
                    aspect: aspect.name().to_string(),
                    source,
                })?;
        }

        let mut params = HookParams::new();
        for aspect in self.aspects.iter() {
            params.absorb(aspect.name(), aspect.handler().inject_hook_params(&self.resources));
        }
        self.params = Arc::new(params);

        self.state = self
            .aspects
            .find_capability::<StateAccess>(STATE_ACCESS_CAPABILITY)
            .map(|(owner, access)| {
                tracing::debug!(aspect = owner, "state access published");
                StateAccess::clone(&access)
            });
        Ok(())
    }

    /// ROOT COMPOSITION: aspects before, features, aspects after.
    pub fn run_root_composition_phase(&self) -> AssemblyResult<RootNode> {
        tracing::info!("Phase: root_composition");

        let mut root = RootNode::empty();
        for aspect in self.aspects.iter() {
            root = aspect
                .handler()
                .compose_root_before(&self.resources, root)
                .map_err(|source| AssemblyError::Compose {
                    name: aspect.name().to_string(),
                    source,
                })?;
        }

        for feature in &self.active {
            let Some(before_start) = &feature.hooks().before_start else {
                continue;
            };
            let ctx = self.ctx_for(feature);
            if let Some(next) = before_start(&ctx, &root).map_err(|source| AssemblyError::Compose {
                name: feature.name().to_string(),
                source,
            })? {
                root = next;
            }
        }

        for aspect in self.aspects.iter() {
            root = aspect
                .handler()
                .compose_root_after(&self.resources, root)
                .map_err(|source| AssemblyError::Compose {
                    name: aspect.name().to_string(),
                    source,
                })?;
        }

        tracing::debug!(root = ?root, "root composed");
        Ok(root)
    }

    /// REGISTRATION: the host gets the root exactly once.
    pub fn run_registration_phase<R>(&self, root: RootNode, register: R)
    where
        R: FnOnce(RootNode),
    {
        tracing::info!("Phase: registration");
        register(root);
    }

    /// EARLY INIT: every `after_init` runs concurrently; once all have
    /// settled the first failure, in feature order, aborts the run.
    pub async fn run_early_init_phase(&self) -> AssemblyResult<()> {
        tracing::info!("Phase: early_init");

        let mut pending = Vec::new();
        for feature in &self.active {
            if let Some(init) = &feature.hooks().after_init {
                let reporter = StatusReporter::new(feature.name(), Arc::clone(&self.status));
                let fut = init.init(self.ctx_for(feature), reporter.clone());
                pending.push((feature.name(), reporter, fut));
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let (names, reporters): (Vec<&str>, Vec<StatusReporter>) =
            pending.iter().map(|(n, r, _)| (*n, r.clone())).unzip();
        let results = join_all(pending.into_iter().map(|(_, _, fut)| fut)).await;

        let mut first_failure = None;
        for ((name, reporter), result) in names.into_iter().zip(reporters).zip(results) {
            if let Err(err) = result {
                reporter.fail(&err);
                if first_failure.is_none() {
                    first_failure = Some((name, err));
                }
            }
        }

        match first_failure {
            Some((feature, source)) => Err(AssemblyError::Init {
                feature: feature.to_string(),
                source,
            }),
            None => {
                (self.status)(None, None);
                Ok(())
            }
        }
    }

    /// AFTER START: the application is up.
    pub fn run_after_start_phase(&self) -> AssemblyResult<()> {
        tracing::info!("Phase: after_start");

        for feature in &self.active {
            if let Some(after_start) = &feature.hooks().after_start {
                tracing::debug!(feature = feature.name(), "after_start");
                after_start(&self.ctx_for(feature)).map_err(|source| AssemblyError::AfterStart {
                    feature: feature.name().to_string(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Runs every phase in order and hands the composed root to `register`.
    pub async fn run_full_cycle<R>(mut self, register: R) -> AssemblyResult<App>
    where
        R: FnOnce(RootNode),
    {
        // 1. Genesis
        self.run_genesis_phase()?;

        // 2. Content validation (enabled features)
        self.run_content_validation_phase()?;

        // 3. Pruning
        self.run_pruning_phase()?;

        // 4. Map seed
        self.run_seed_phase()?;

        // 5. Deferred expansion + late contract validation
        self.run_expansion_phase()?;

        // 6. Gather
        self.run_gather_phase()?;

        // 7. Cross-link
        self.run_cross_link_phase()?;

        // 8. Root composition
        let root = self.run_root_composition_phase()?;

        // 9. Registration
        self.run_registration_phase(root, register);

        // 10. Early init
        self.run_early_init_phase().await?;

        // 11. After start
        self.run_after_start_phase()?;

        Ok(App {
            resources: Arc::clone(&self.resources),
            active_features: self.active.iter().map(|f| f.name().to_string()).collect(),
        })
    }

    fn owning_aspect(&self, key: &str) -> Option<&Aspect> {
        if let Some(aspect) = self.aspects.get(key) {
            return Some(aspect);
        }
        let owner = self.vocabulary.owner_of(key)?;
        self.aspects
            .get(&owner)
            .filter(|a| a.feature_extensions().iter().any(|k| k == key))
    }

    fn apply_decl(&self, feature: &str, decl: &ResourceDecl) -> AssemblyResult<()> {
        let mut store = self.resources.store_mut();
        for def in &decl.definitions {
            store.define_resource(&def.key, def.value.clone(), feature, def.fulfils_contract)?;
        }
        for (pattern, options) in &decl.usages {
            store.declare_usage(pattern, *options, feature)?;
        }
        Ok(())
    }

    fn ctx_for(&self, feature: &Feature) -> FeatureCtx {
        FeatureCtx::new(
            feature.name(),
            Arc::clone(&self.resources),
            self.config.clone(),
            Arc::clone(&self.params),
            self.state.clone(),
        )
    }
}

fn check_slice(aspect: &Aspect, feature: &Feature, content: &Resource) -> AssemblyResult<()> {
    match aspect.handler().validate_feature_slice(feature, content) {
        Some(message) if !message.is_empty() => Err(AssemblyError::FeatureContentInvalid {
            feature: feature.name().to_string(),
            aspect: aspect.name().to_string(),
            message,
        }),
        _ => Ok(()),
    }
}
