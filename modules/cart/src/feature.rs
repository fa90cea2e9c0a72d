use featkit::{
    AssemblyResult, Feature, FeatureCtx, ResourceDecl, StatusReporter, Vocabulary,
};
use serde_json::{json, Value};
use state_store::{Action, StateSlice, STATE_KEY};
use tracing::{debug, info};

use crate::config::CartConfig;
use crate::reducer;

pub const FEATURE_NAME: &str = "cart";

/// Public face of the cart: action builders and snapshot accessors for
/// other features.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartApi;

impl CartApi {
    pub fn add_item(&self, item: &str) -> Action {
        Action::new(reducer::ADD, json!(item))
    }

    pub fn remove_item(&self, item: &str) -> Action {
        Action::new(reducer::REMOVE, json!(item))
    }

    pub fn clear(&self) -> Action {
        Action::new(reducer::CLEAR, Value::Null)
    }

    /// Items held in a whole-store snapshot.
    pub fn items(&self, snapshot: &Value) -> Vec<String> {
        snapshot[FEATURE_NAME]["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The cart feature. The `state` aspect must already be built on
/// `vocabulary`.
pub fn feature(vocabulary: &Vocabulary) -> AssemblyResult<Feature> {
    Feature::builder(FEATURE_NAME)
        .public_face(CartApi)
        .resources(
            ResourceDecl::new()
                .define("MainPage.cart.link", String::from("Cart"))
                .define("MainPage.cart.body", String::from("Your shopping cart")),
        )
        .slice(
            STATE_KEY,
            StateSlice::new(reducer::initial_state()).with_reducer(reducer::reduce),
        )
        .after_init(|ctx: FeatureCtx, status: StatusReporter| async move {
            let cfg: CartConfig = ctx.config()?;
            debug!(max_items = cfg.max_items, "loaded cart config");
            status.show(&format!("cart holds up to {} items", cfg.max_items));
            Ok::<(), anyhow::Error>(())
        })
        .after_start(|ctx| {
            let cfg: CartConfig = ctx.config()?;
            let state = ctx
                .state()
                .ok_or_else(|| anyhow::anyhow!("cart requires a state aspect"))?;
            state.dispatch(Action::new(
                reducer::CONFIGURE,
                json!({ "max_items": cfg.max_items }),
            ))?;
            info!(max_items = cfg.max_items, "cart ready");
            Ok(())
        })
        .build(vocabulary)
}
