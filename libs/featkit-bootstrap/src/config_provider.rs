use crate::config::AppConfig;
use std::sync::Arc;

/// Implementation of featkit's `ConfigProvider` backed by `AppConfig`.
#[derive(Debug, Clone)]
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }

    pub fn from_arc(config: Arc<AppConfig>) -> Self {
        Self(config)
    }

    pub fn inner(&self) -> &AppConfig {
        &self.0
    }
}

impl featkit::ConfigProvider for AppConfigProvider {
    fn get_feature_config(&self, feature: &str) -> Option<&serde_json::Value> {
        self.0
            .feature(feature)
            .map(|entry| &entry.config)
            .filter(|config| !config.is_null())
    }

    fn feature_enabled(&self, feature: &str) -> Option<bool> {
        self.0.feature(feature)?.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureEntry;
    use featkit::ConfigProvider;

    #[test]
    fn exposes_feature_bags_and_overrides() {
        let mut config = AppConfig::default();
        config.features.insert(
            "cart".into(),
            FeatureEntry {
                enabled: None,
                config: serde_json::json!({ "max_items": 2 }),
            },
        );
        config.features.insert(
            "legacy".into(),
            FeatureEntry {
                enabled: Some(false),
                config: serde_json::Value::Null,
            },
        );
        let provider = AppConfigProvider::new(config);

        assert_eq!(provider.get_feature_config("cart").unwrap()["max_items"], 2);
        assert_eq!(provider.feature_enabled("cart"), None);
        assert!(provider.get_feature_config("legacy").is_none());
        assert_eq!(provider.feature_enabled("legacy"), Some(false));
        assert!(provider.get_feature_config("search").is_none());
    }
}
