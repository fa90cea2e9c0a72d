use anyhow::Result;
use clap::{Parser, Subcommand};
use featkit::{launch, App, LaunchOptions, RootNode, Vocabulary};
use featkit_bootstrap::{AppConfig, AppConfigProvider, CliArgs};
use parking_lot::Mutex;
use search::{MainPageView, SearchApi};
use state_store::{StateProvider, StateStore, StoreHandle, STATE_KEY};

use std::path::PathBuf;
use std::sync::Arc;

/// Featspot demo - assembles the cart and search features into one page
#[derive(Parser)]
#[command(name = "featspot-demo")]
#[command(about = "Featspot demo - assembles the cart and search features into one page")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the application and render the main page
    Run {
        /// Items to put into the cart after start
        #[arg(long)]
        add: Vec<String>,
        /// Search the main page sections
        #[arg(long)]
        find: Option<String>,
    },
    /// Assemble the application and report what would start
    Check,
}

struct Assembled {
    app: App,
    root: RootNode,
    store: StoreHandle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    featkit_bootstrap::init_logging(&logging_config, &config.host.base_path());

    tracing::info!(host = %config.host.name, "Featspot demo starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run {
        add: Vec::new(),
        find: None,
    }) {
        Commands::Run { add, find } => run_app(config, add, find).await,
        Commands::Check => check_app(config).await,
    }
}

async fn assemble(config: &AppConfig) -> Result<Assembled> {
    let vocabulary = Arc::new(Vocabulary::new());

    // Aspects first: they register the feature keys features are built with.
    let store = StateStore::new();
    let state = store.aspect(&vocabulary, config.aspect_config(STATE_KEY).cloned())?;
    let features = vec![cart::feature(&vocabulary)?, search::feature(&vocabulary)?];

    let registered = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&registered);
    let opts = LaunchOptions::new(Arc::clone(&vocabulary), move |root| {
        *slot.lock() = Some(root);
    })
    .features(features)
    .aspects(vec![state])
    .config(Arc::new(AppConfigProvider::new(config.clone())));

    let app = launch(opts).await?;
    let root = registered.lock().take().unwrap_or_default();
    Ok(Assembled {
        app,
        root,
        store: store.handle(),
    })
}

fn main_page(root: &RootNode) -> Option<&MainPageView> {
    match root.downcast_ref::<StateProvider>() {
        Some(provider) => provider.child.downcast_ref::<MainPageView>(),
        None => root.downcast_ref::<MainPageView>(),
    }
}

async fn run_app(config: AppConfig, add: Vec<String>, find: Option<String>) -> Result<()> {
    tracing::info!("Assembling features…");
    let Assembled { app, root, store } = assemble(&config).await?;

    for (key, link) in app
        .resources()
        .get("MainPage.*.link@withKeys")?
        .pairs_of::<String>()
    {
        tracing::info!(key, link = %link, "main page link");
    }

    match main_page(&root) {
        Some(view) => print!("{view}"),
        None => tracing::warn!("no main page was composed"),
    }

    if let Some(api) = app
        .resources()
        .public_face(cart::FEATURE_NAME)
        .and_then(|face| face.downcast::<cart::CartApi>())
    {
        for item in &add {
            store.dispatch(&api.add_item(item))?;
        }
        println!("cart: {:?}", api.items(&store.snapshot()));
    }

    if let (Some(query), Some(view)) = (find, main_page(&root)) {
        let hits: Vec<&str> = SearchApi
            .find(view, &query)
            .into_iter()
            .map(|s| s.link.as_str())
            .collect();
        println!("search '{query}': {hits:?}");
    }

    Ok(())
}

async fn check_app(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration…");
    let Assembled { app, .. } = assemble(&config).await?;
    println!("Assembly is valid");
    println!("active features: {}", app.active_features().join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use featkit_bootstrap::FeatureEntry;

    #[tokio::test]
    async fn default_config_composes_both_sections() {
        let Assembled { app, root, .. } = assemble(&AppConfig::default()).await.unwrap();
        assert_eq!(app.active_features(), ["cart", "search"]);

        let view = main_page(&root).unwrap();
        let rendered = view.to_string();
        assert!(rendered.contains("[Cart] Your shopping cart"), "{rendered}");
        assert!(rendered.contains("[Search] Search across 1 other sections"), "{rendered}");
    }

    #[tokio::test]
    async fn disabling_cart_leaves_search_alone() {
        let mut config = AppConfig::default();
        config.features.insert(
            "cart".into(),
            FeatureEntry {
                enabled: Some(false),
                ..FeatureEntry::default()
            },
        );
        let Assembled { app, root, store } = assemble(&config).await.unwrap();

        assert_eq!(app.active_features(), ["search"]);
        assert!(store.select("cart").is_none());
        let view = main_page(&root).unwrap();
        assert_eq!(view.sections.len(), 1);
        assert_eq!(
            view.section("search").and_then(|s| s.body.as_deref()),
            Some("Search across 0 other sections")
        );
    }

    #[tokio::test]
    async fn yaml_config_reaches_features_and_aspects() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("featspot.yaml");
        std::fs::write(
            &path,
            "features:\n  cart:\n    config:\n      max_items: 1\n  search:\n    config:\n      title: Shop\naspects:\n  state:\n    strict: true\n",
        )
        .unwrap();
        let config = AppConfig::load_layered(&path).unwrap();

        let Assembled { app, root, store } = assemble(&config).await.unwrap();
        assert_eq!(main_page(&root).unwrap().title, "Shop");

        let api = app
            .resources()
            .public_face("cart")
            .and_then(|f| f.downcast::<cart::CartApi>())
            .unwrap();
        store.dispatch(&api.add_item("book")).unwrap();
        // full cart: nothing changes, and the strict store refuses it
        assert!(store.dispatch(&api.add_item("lamp")).is_err());
        assert_eq!(api.items(&store.snapshot()), vec!["book"]);
    }
}
