use serde::{Deserialize, Serialize};

/// Configuration for the state aspect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateStoreConfig {
    /// Log every dispatched action at debug level.
    #[serde(default)]
    pub log_actions: bool,
    /// Reject actions that no reducer changes state for.
    #[serde(default)]
    pub strict: bool,
}
