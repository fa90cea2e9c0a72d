//! featkit launcher.
//!
//! Design notes:
//! - The launcher only wires options into an [`Assembly`]; all lifecycle
//!   ordering lives there.
//! - Phase order: **genesis → validate → prune → seed → expand → gather →
//!   cross-link → compose → register → early init → after start**.
//! - The status sink defaults to structured `tracing` output.

use std::sync::Arc;

use crate::aspect::Aspect;
use crate::context::{tracing_status, ConfigProvider, StatusFn};
use crate::error::AssemblyResult;
use crate::feature::Feature;
use crate::root::RootNode;
use crate::runtime::{App, Assembly};
use crate::vocabulary::Vocabulary;

/// Host callback that receives the composed root exactly once.
pub type RegisterRootFn = Box<dyn FnOnce(RootNode) + Send>;

/// Options for launching an application.
pub struct LaunchOptions {
    /// Vocabulary the supplied features and aspects were built against.
    pub vocabulary: Arc<Vocabulary>,
    pub features: Vec<Feature>,
    pub aspects: Vec<Aspect>,
    /// Provider of per-feature config bags (raw JSON by feature name).
    pub config: Option<Arc<dyn ConfigProvider>>,
    /// Early-init status sink; `None` logs through `tracing`.
    pub status: Option<StatusFn>,
    pub register_root: RegisterRootFn,
}

impl LaunchOptions {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        register_root: impl FnOnce(RootNode) + Send + 'static,
    ) -> Self {
        Self {
            vocabulary,
            features: Vec::new(),
            aspects: Vec::new(),
            config: None,
            status: None,
            register_root: Box::new(register_root),
        }
    }

    pub fn features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn aspects(mut self, aspects: Vec<Aspect>) -> Self {
        self.aspects = aspects;
        self
    }

    pub fn config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn status(mut self, status: StatusFn) -> Self {
        self.status = Some(status);
        self
    }
}

impl std::fmt::Debug for LaunchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let features: Vec<&str> = self.features.iter().map(Feature::name).collect();
        let aspects: Vec<&str> = self.aspects.iter().map(Aspect::name).collect();
        f.debug_struct("LaunchOptions")
            .field("features", &features)
            .field("aspects", &aspects)
            .field("has_config", &self.config.is_some())
            .field("has_status", &self.status.is_some())
            .finish()
    }
}

/// Assembles and starts the application described by `opts`.
pub async fn launch(opts: LaunchOptions) -> AssemblyResult<App> {
    tracing::info!(
        features = opts.features.len(),
        aspects = opts.aspects.len(),
        "launching application"
    );

    let assembly = Assembly::new(
        opts.vocabulary,
        opts.features,
        opts.aspects,
        opts.config,
        opts.status.unwrap_or_else(tracing_status),
    );

    let app = assembly.run_full_cycle(opts.register_root).await?;
    tracing::info!(active = ?app.active_features(), "application started");
    Ok(app)
}
