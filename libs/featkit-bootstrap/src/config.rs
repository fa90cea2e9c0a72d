use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Per-feature section: an optional enablement override and a free-form
/// config bag handed to the feature's hooks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

/// Main application configuration: typed host sections plus flexible
/// per-feature and per-aspect bags.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory of `<feature>.yaml` files merged into `features` (optional).
    #[serde(default)]
    pub features_dir: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureEntry>,
    /// Aspect name → aspect config object.
    #[serde(default)]
    pub aspects: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub name: String,
    /// Base directory for relative log paths; empty means the working directory.
    #[serde(default)]
    pub base_dir: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "featspot".to_string(),
            base_dir: String::new(),
        }
    }
}

impl HostConfig {
    pub fn base_path(&self) -> PathBuf {
        if self.base_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.base_dir)
        }
    }
}

/// Logging configuration - maps subsystem (target prefix) names to their settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/featspot.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/featspot.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            logging: Some(default_logging_config()),
            features_dir: None,
            features: BTreeMap::new(),
            aspects: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Optional sections stay None unless YAML/ENV provides them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // Example: APP__FEATURES__CART__ENABLED=false maps to features.cart.enabled
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        if let Some(dir) = config.features_dir.clone() {
            merge_feature_files(&mut config.features, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureEntry> {
        self.features.get(name)
    }

    pub fn aspect_config(&self, name: &str) -> Option<&serde_json::Value> {
        self.aspects.get(name)
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

/// Entries already present inline win over files.
fn merge_feature_files(
    features: &mut BTreeMap<String, FeatureEntry>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_yaml || features.contains_key(name) {
            continue;
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read feature file {}", path.display()))?;
        let parsed: FeatureEntry = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid feature file {}", path.display()))?;
        features.insert(name.to_string(), parsed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();
        assert_eq!(config.host.name, "featspot");
        assert_eq!(config.host.base_path(), PathBuf::from("."));

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/featspot.log");

        assert!(config.features.is_empty());
        assert!(config.aspects.is_empty());
    }

    #[test]
    fn test_load_layered_features_and_aspects() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = r#"
host:
  name: "demo"
  base_dir: "/var/lib/demo"

logging:
  default:
    console_level: debug
    file: "logs/default.log"

features:
  cart:
    config:
      max_items: 5
  legacy:
    enabled: false

aspects:
  state:
    initial: {}
"#;
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert_eq!(config.host.name, "demo");
        assert_eq!(config.host.base_path(), PathBuf::from("/var/lib/demo"));
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");

        let cart = config.feature("cart").unwrap();
        assert_eq!(cart.enabled, None);
        assert_eq!(cart.config["max_items"], 5);
        assert_eq!(config.feature("legacy").unwrap().enabled, Some(false));
        assert!(config.aspect_config("state").unwrap().is_object());
    }

    #[test]
    fn test_minimal_yaml_keeps_logging_unset() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "features: {}\n").unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert!(config.logging.is_none());
        assert_eq!(config.host.name, "featspot");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "features:\n  cart:\n    enabeld: true\n").unwrap();
        assert!(AppConfig::load_layered(&cfg_path).is_err());
    }

    #[test]
    fn test_env_overrides_feature_enablement() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "features:\n  envprobe:\n    enabled: true\n").unwrap();

        std::env::set_var("APP__FEATURES__ENVPROBE__ENABLED", "false");
        let config = AppConfig::load_layered(&cfg_path);
        std::env::remove_var("APP__FEATURES__ENVPROBE__ENABLED");

        assert_eq!(config.unwrap().feature("envprobe").unwrap().enabled, Some(false));
    }

    #[test]
    fn test_feature_files_fill_in_missing_entries() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("features");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("search.yaml"), "config:\n  page_size: 20\n").unwrap();
        fs::write(dir.join("cart.yml"), "enabled: false\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            "features_dir: {:?}\nfeatures:\n  cart:\n    enabled: true\n",
            dir.to_string_lossy()
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert_eq!(config.feature("cart").unwrap().enabled, Some(true));
        assert_eq!(config.feature("search").unwrap().config["page_size"], 20);
        assert_eq!(config.features.len(), 2);
    }

    #[test]
    fn test_cli_verbose_bumps_console_level() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "info");

        config.apply_cli_overrides(&CliArgs {
            verbose: 1,
            ..CliArgs::default()
        });
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");

        let mut bare = AppConfig {
            logging: None,
            ..AppConfig::default()
        };
        bare.apply_cli_overrides(&CliArgs {
            verbose: 3,
            ..CliArgs::default()
        });
        assert_eq!(bare.logging.as_ref().unwrap()["default"].console_level, "trace");
    }

    #[test]
    fn test_to_yaml_round_trips_feature_bags() {
        let mut config = AppConfig::default();
        config.features.insert(
            "cart".to_string(),
            FeatureEntry {
                enabled: Some(false),
                config: serde_json::json!({ "max_items": 2 }),
            },
        );
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("cart"));

        let back: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.features["cart"], config.features["cart"]);
    }
}
