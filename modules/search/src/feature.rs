use featkit::{
    AssemblyResult, Feature, ResourceDecl, RootNode, UsageOptions, Vocabulary,
};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::view::{MainPageView, Section};

pub const FEATURE_NAME: &str = "search";

/// Public face of search: case-insensitive lookup over main page sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchApi;

impl SearchApi {
    pub fn find<'a>(&self, view: &'a MainPageView, query: &str) -> Vec<&'a Section> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        view.sections
            .iter()
            .filter(|s| {
                s.link.to_lowercase().contains(&needle)
                    || s.body
                        .as_deref()
                        .is_some_and(|b| b.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// The search feature. Its body counts the links other features publish, so
/// its resources are computed once literal resources are in place. It
/// composes the [`MainPageView`] root.
pub fn feature(vocabulary: &Vocabulary) -> AssemblyResult<Feature> {
    Feature::builder(FEATURE_NAME)
        .public_face(SearchApi)
        .deferred_resources(|map| {
            let others = map.get("MainPage.*.link")?.values().len();
            debug!(others, "sizing search body");
            Ok(ResourceDecl::new()
                .define("MainPage.search.link", String::from("Search"))
                .define(
                    "MainPage.search.body",
                    format!("Search across {others} other sections"),
                )
                .uses("MainPage.*.link", UsageOptions::optional().of_type::<String>())
                .uses("MainPage.*.body", UsageOptions::optional().of_type::<String>()))
        })
        .before_start(|ctx, root| {
            let cfg: SearchConfig = ctx.config()?;
            let view = MainPageView::from_resources(&cfg.title, ctx.resources(), root.clone())?;
            debug!(sections = view.sections.len(), "main page composed");
            Ok(Some(RootNode::new(view)))
        })
        .after_start(|ctx| {
            let links = ctx.resources().get("MainPage.*.link")?.values().len();
            info!(links, "search ready");
            Ok(())
        })
        .build(vocabulary)
}
