use serde::{Deserialize, Serialize};

/// Configuration for the search feature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

fn default_title() -> String {
    "Featspot".to_string()
}
