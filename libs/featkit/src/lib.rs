//! # featkit - Feature-Oriented Application Assembly
//!
//! Independently authored **features** publish namespaced resources, declare
//! usage contracts on resources other features publish, and register
//! lifecycle hooks. Pluggable **aspects** own extra feature vocabulary and
//! take part in every phase. The launcher runs a fixed multi-pass pipeline
//! that turns these declarations into a started application.
//!
//! ## Features
//!
//! - **Namespaced resources**: dotted keys, wildcard lookups in definition order
//! - **Usage contracts**: required/optional, typed, merged across features
//! - **Deferred content**: expanded once the resource map exists
//! - **Phase-based lifecycle**: validate → expand → gather → compose → start
//!
//! ## Example
//!
//! ```rust,ignore
//! use featkit::{launch, Feature, LaunchOptions, ResourceDecl, UsageOptions, Vocabulary};
//! use std::sync::Arc;
//!
//! let vocabulary = Arc::new(Vocabulary::new());
//! let cart = Feature::builder("cart")
//!     .resources(ResourceDecl::new().define("MainPage.cart.link", "cartLink"))
//!     .build(&vocabulary)?;
//! let search = Feature::builder("search")
//!     .resources(ResourceDecl::new().uses("MainPage.*.link", UsageOptions::optional()))
//!     .build(&vocabulary)?;
//!
//! let app = launch(
//!     LaunchOptions::new(vocabulary, |_root| {}).features(vec![cart, search]),
//! )
//! .await?;
//! let links = app.resources().get("MainPage.*.link@withKeys")?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod aspect;
pub mod content;
pub mod context;
pub mod error;
pub mod feature;
pub mod reader;
pub mod resource;
pub mod root;
pub mod runtime;
pub mod validation;
pub mod vocabulary;

pub use aspect::{Aspect, AspectBuilder, AspectHandler, AspectSet, Capabilities};
pub use content::{Content, Expander};
pub use context::{
    feature_config_typed, tracing_status, ConfigError, ConfigProvider, FeatureCtx, HookParams,
    StateAccess, StatusFn, StatusReporter, STATE_ACCESS_CAPABILITY,
};
pub use error::{AssemblyError, AssemblyResult, ErrorKind};
pub use feature::{Feature, FeatureBuilder, FeatureInit, LifecycleHooks, ResourceDecl};
pub use reader::{read, ReadOutput, Selector};
pub use resource::{
    EmptyFace, Resolved, Resource, ResourceEntry, ResourceMap, TypeConstraint, UsageContract,
    UsageOptions, WITH_KEYS_SUFFIX,
};
pub use root::RootNode;
pub use runtime::{launch, App, Assembly, LaunchOptions, RegisterRootFn};
pub use vocabulary::Vocabulary;
