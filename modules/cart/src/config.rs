use serde::{Deserialize, Serialize};

/// Configuration for the cart feature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartConfig {
    #[serde(default = "default_max_items")]
    pub max_items: u32,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}

fn default_max_items() -> u32 {
    10
}
