//! Cart state transitions. The subtree looks like
//! `{ "items": [..], "max_items": n }`.

use serde_json::{json, Value};
use state_store::Action;

pub const ADD: &str = "cart/add";
pub const REMOVE: &str = "cart/remove";
pub const CLEAR: &str = "cart/clear";
pub const CONFIGURE: &str = "cart/configure";

pub fn initial_state() -> Value {
    json!({ "items": [], "max_items": crate::config::CartConfig::default().max_items })
}

pub fn reduce(state: &Value, action: &Action) -> Value {
    let mut next = state.clone();
    match action.kind.as_str() {
        ADD => {
            let max = state["max_items"].as_u64().unwrap_or(u64::MAX);
            if let Some(items) = next["items"].as_array_mut() {
                if (items.len() as u64) < max {
                    items.push(action.payload.clone());
                }
            }
        }
        REMOVE => {
            if let Some(items) = next["items"].as_array_mut() {
                if let Some(pos) = items.iter().position(|i| *i == action.payload) {
                    items.remove(pos);
                }
            }
        }
        CLEAR => next["items"] = json!([]),
        CONFIGURE => {
            if let Some(max) = action.payload.get("max_items") {
                next["max_items"] = max.clone();
            }
        }
        _ => {}
    }
    next
}
