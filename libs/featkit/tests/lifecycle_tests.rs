//! Phase ordering, root composition, early init and the collaborators hooks
//! receive.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use featkit::{
    launch, Aspect, AspectHandler, AssemblyError, ConfigProvider, Expander, Feature, FeatureCtx,
    HookParams, LaunchOptions, ResourceDecl, ResourceMap, Resource, RootNode, StateAccess,
    StatusFn, StatusReporter, Vocabulary, STATE_ACCESS_CAPABILITY,
};

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, event: impl Into<String>) {
    log.lock().push(event.into());
}

/// Records every aspect callback and wraps the root on both sides.
struct Probe(Log);

impl AspectHandler for Probe {
    fn validate_own_config(&self, _config: Option<&serde_json::Value>) -> Option<String> {
        push(&self.0, "genesis");
        None
    }

    fn expand_deferred_content(
        &self,
        resources: &ResourceMap,
        feature: &Feature,
        deferred: &Expander<Resource>,
    ) -> anyhow::Result<Resource> {
        push(&self.0, format!("expand:{}", feature.name()));
        deferred(resources)
    }

    fn validate_feature_slice(&self, feature: &Feature, _content: &Resource) -> Option<String> {
        push(&self.0, format!("validate:{}", feature.name()));
        None
    }

    fn gather_across_features(
        &self,
        _resources: &ResourceMap,
        features: &[Feature],
    ) -> anyhow::Result<()> {
        let names: Vec<&str> = features.iter().map(Feature::name).collect();
        push(&self.0, format!("gather:{}", names.join(",")));
        Ok(())
    }

    fn cross_link_across_aspects(
        &self,
        _resources: &ResourceMap,
        _aspects: &featkit::AspectSet,
    ) -> anyhow::Result<()> {
        push(&self.0, "cross_link");
        Ok(())
    }

    fn compose_root_before(
        &self,
        _resources: &ResourceMap,
        root: RootNode,
    ) -> anyhow::Result<RootNode> {
        push(&self.0, "compose_before");
        let mut layers = root.downcast_ref::<Vec<String>>().cloned().unwrap_or_default();
        layers.push("probe.before".into());
        Ok(RootNode::new(layers))
    }

    fn compose_root_after(
        &self,
        _resources: &ResourceMap,
        root: RootNode,
    ) -> anyhow::Result<RootNode> {
        push(&self.0, "compose_after");
        let mut layers = root.downcast_ref::<Vec<String>>().cloned().unwrap_or_default();
        layers.push("probe.after".into());
        Ok(RootNode::new(layers))
    }

    fn inject_hook_params(&self, _resources: &ResourceMap) -> HookParams {
        push(&self.0, "inject");
        HookParams::new().with("probe", 11u32)
    }
}

fn hooked(v: &Vocabulary, name: &'static str, log: &Log) -> Feature {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    Feature::builder(name)
        .slice("probe", "literal")
        .before_start(move |ctx, root| {
            push(&l1, format!("before_start:{}", ctx.feature_name()));
            let mut layers = root.downcast_ref::<Vec<String>>().cloned().unwrap_or_default();
            layers.push(ctx.feature_name().to_string());
            Ok(Some(RootNode::new(layers)))
        })
        .after_init(move |ctx: FeatureCtx, _status: StatusReporter| {
            let log = l2.clone();
            async move {
                push(&log, format!("after_init:{}", ctx.feature_name()));
                Ok::<(), anyhow::Error>(())
            }
        })
        .after_start(move |ctx| {
            push(&l3, format!("after_start:{}", ctx.feature_name()));
            Ok(())
        })
        .build(v)
        .unwrap()
}

fn registrar(
    log: &Log,
    root_slot: &Arc<Mutex<Option<RootNode>>>,
) -> impl FnOnce(RootNode) + Send + 'static {
    let (log, slot) = (log.clone(), Arc::clone(root_slot));
    move |root| {
        push(&log, "register");
        *slot.lock() = Some(root);
    }
}

#[tokio::test]
async fn phases_run_in_documented_order() {
    let v = Arc::new(Vocabulary::new());
    let log: Log = Arc::default();
    let probe = Aspect::builder("probe", Probe(log.clone())).build(&v).unwrap();

    let late = Feature::builder("late")
        .deferred_slice("probe", |_map| Ok("deferred"))
        .build(&v)
        .unwrap();
    let features = vec![hooked(&v, "early", &log), late];

    let root = Arc::new(Mutex::new(None));
    let opts = LaunchOptions::new(Arc::clone(&v), registrar(&log, &root))
        .features(features)
        .aspects(vec![probe]);
    launch(opts).await.unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "genesis",
            "validate:early",
            "expand:late",
            "validate:late",
            "gather:early,late",
            "cross_link",
            "inject",
            "compose_before",
            "before_start:early",
            "compose_after",
            "register",
            "after_init:early",
            "after_start:early",
        ]
    );

    let root = root.lock().take().unwrap();
    assert_eq!(
        root.downcast_ref::<Vec<String>>().unwrap(),
        &vec!["probe.before", "early", "probe.after"]
    );
}

#[tokio::test]
async fn expanded_slices_reach_gatherers() {
    struct Collect(Arc<Mutex<Vec<String>>>);
    impl AspectHandler for Collect {
        fn validate_feature_slice(&self, _f: &Feature, _c: &Resource) -> Option<String> {
            None
        }
        fn gather_across_features(
            &self,
            _r: &ResourceMap,
            features: &[Feature],
        ) -> anyhow::Result<()> {
            for f in features {
                if let Some(path) = f.slice_as::<String>("route") {
                    self.0.lock().push(path.clone());
                }
            }
            Ok(())
        }
    }

    let v = Arc::new(Vocabulary::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let route = Aspect::builder("route", Collect(Arc::clone(&seen))).build(&v).unwrap();
    let cart = Feature::builder("cart")
        .resources(ResourceDecl::new().define("MainPage.cart.link", "cartLink"))
        .deferred_slice("route", |map| {
            let n = map.get("MainPage.*.link")?.values().len();
            Ok(format!("/cart/{n}"))
        })
        .build(&v)
        .unwrap();

    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {})
        .features(vec![cart])
        .aspects(vec![route]);
    launch(opts).await.unwrap();
    assert_eq!(*seen.lock(), vec!["/cart/1"]);
}

#[tokio::test]
async fn hooks_receive_params_and_state() {
    struct StateOwner;
    impl AspectHandler for StateOwner {
        fn validate_feature_slice(&self, _f: &Feature, _c: &Resource) -> Option<String> {
            None
        }
        fn gather_across_features(&self, _r: &ResourceMap, _f: &[Feature]) -> anyhow::Result<()> {
            Ok(())
        }
        fn inject_hook_params(&self, _r: &ResourceMap) -> HookParams {
            HookParams::new().with("probe", 99u32).with("store", "state")
        }
    }

    let v = Arc::new(Vocabulary::new());
    let log: Log = Arc::default();
    let dispatched = Arc::new(Mutex::new(Vec::<u32>::new()));
    let sink = Arc::clone(&dispatched);
    let access = StateAccess::new(
        || Resource::new(7u32),
        move |action| {
            let n = action.downcast_ref::<u32>().copied().unwrap_or_default();
            sink.lock().push(n);
            Ok(())
        },
    );

    let probe = Aspect::builder("probe", Probe(log.clone())).build(&v).unwrap();
    let state = Aspect::builder("state", StateOwner)
        .capability(STATE_ACCESS_CAPABILITY, Arc::new(access))
        .build(&v)
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    let reader = Feature::builder("reader")
        .after_start(move |ctx| {
            let state = ctx.state().ok_or_else(|| anyhow::anyhow!("no state"))?;
            let snapshot = state.snapshot().downcast_ref::<u32>().copied();
            state.dispatch(5u32)?;
            let probe = ctx.param("probe").and_then(|p| p.downcast_ref::<u32>()).copied();
            let store = ctx.param("store").and_then(|p| p.downcast_ref::<&str>()).copied();
            *slot.lock() = Some((snapshot, probe, store));
            Ok(())
        })
        .build(&v)
        .unwrap();

    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {})
        .features(vec![reader])
        .aspects(vec![probe, state]);
    launch(opts).await.unwrap();

    // probe injects first, so its value wins the clash
    assert_eq!(*seen.lock(), Some((Some(7), Some(11), Some("state"))));
    assert_eq!(*dispatched.lock(), vec![5]);
}

#[tokio::test]
async fn first_init_failure_aborts_after_all_settle() {
    let v = Arc::new(Vocabulary::new());
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&messages);
    let status: StatusFn = Arc::new(move |msg: Option<&str>, err: Option<&anyhow::Error>| {
        let line = match (msg, err) {
            (Some(m), Some(e)) => format!("{m}: {e}"),
            (Some(m), None) => m.to_string(),
            (None, _) => "cleared".to_string(),
        };
        sink.lock().push(line);
    });

    let settled = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let feature = |name: &'static str, fail: bool| {
        let settled = Arc::clone(&settled);
        Feature::builder(name)
            .after_init(move |_ctx: FeatureCtx, status: StatusReporter| {
                let settled = Arc::clone(&settled);
                async move {
                    status.show(&format!("loading {name}"));
                    settled.lock().push(name);
                    if fail {
                        anyhow::bail!("{name} exploded");
                    }
                    Ok(())
                }
            })
            .build(&v)
            .unwrap()
    };
    let features = vec![
        feature("ok", false),
        feature("first", true),
        feature("second", true),
    ];

    let started = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&started);
    let after = Feature::builder("after")
        .after_start(move |_ctx| {
            *flag.lock() = true;
            Ok(())
        })
        .build(&v)
        .unwrap();
    let mut all = features;
    all.push(after);

    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {})
        .features(all)
        .status(status);
    let err = launch(opts).await.unwrap_err();

    match err {
        AssemblyError::Init { feature, .. } => assert_eq!(feature, "first"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(settled.lock().len(), 3);
    assert!(!*started.lock());

    let messages = messages.lock();
    assert!(messages.contains(&"loading ok".to_string()));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("feature 'first' failed to initialize")));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("feature 'second' failed to initialize")));
    assert!(!messages.contains(&"cleared".to_string()));
}

#[tokio::test]
async fn successful_init_clears_status() {
    let v = Arc::new(Vocabulary::new());
    let messages = Arc::new(Mutex::new(Vec::<Option<String>>::new()));
    let sink = Arc::clone(&messages);
    let status: StatusFn = Arc::new(move |msg: Option<&str>, _err: Option<&anyhow::Error>| {
        sink.lock().push(msg.map(str::to_string));
    });
    let feature = Feature::builder("warm")
        .after_init(|_ctx: FeatureCtx, status: StatusReporter| async move {
            status.show("warming caches");
            Ok::<(), anyhow::Error>(())
        })
        .build(&v)
        .unwrap();

    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {})
        .features(vec![feature])
        .status(status);
    launch(opts).await.unwrap();
    assert_eq!(*messages.lock(), vec![Some("warming caches".to_string()), None]);
}

struct MapConfig(HashMap<String, serde_json::Value>);

impl ConfigProvider for MapConfig {
    fn get_feature_config(&self, feature: &str) -> Option<&serde_json::Value> {
        self.0.get(feature).and_then(|f| f.get("config"))
    }

    fn feature_enabled(&self, feature: &str) -> Option<bool> {
        self.0.get(feature)?.get("enabled")?.as_bool()
    }
}

#[tokio::test]
async fn config_overrides_enablement_and_feeds_hooks() {
    #[derive(Debug, Default, serde::Deserialize)]
    struct CartCfg {
        #[serde(default)]
        max_items: u32,
    }

    let v = Arc::new(Vocabulary::new());
    let provider = MapConfig(HashMap::from([
        ("legacy".to_string(), serde_json::json!({ "enabled": false })),
        ("beta".to_string(), serde_json::json!({ "enabled": true })),
        ("cart".to_string(), serde_json::json!({ "config": { "max_items": 4 } })),
    ]));

    let seen = Arc::new(Mutex::new(0u32));
    let slot = Arc::clone(&seen);
    let cart = Feature::builder("cart")
        .after_start(move |ctx| {
            let cfg: CartCfg = ctx.config()?;
            *slot.lock() = cfg.max_items;
            Ok(())
        })
        .build(&v)
        .unwrap();
    let legacy = Feature::builder("legacy").build(&v).unwrap();
    let beta = Feature::builder("beta").enabled(false).build(&v).unwrap();

    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {})
        .features(vec![cart, legacy, beta])
        .config(Arc::new(provider));
    let app = launch(opts).await.unwrap();

    assert_eq!(app.active_features(), ["cart", "beta"]);
    assert_eq!(*seen.lock(), 4);
}

#[tokio::test]
async fn aspect_may_reject_its_own_config() {
    struct Picky;
    impl AspectHandler for Picky {
        fn validate_own_config(&self, config: Option<&serde_json::Value>) -> Option<String> {
            match config.and_then(|c| c.get("base")) {
                Some(_) => None,
                None => Some("'base' is required".to_string()),
            }
        }
        fn validate_feature_slice(&self, _f: &Feature, _c: &Resource) -> Option<String> {
            None
        }
        fn gather_across_features(&self, _r: &ResourceMap, _f: &[Feature]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    let v = Arc::new(Vocabulary::new());
    let picky = Aspect::builder("route", Picky).build(&v).unwrap();
    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {}).aspects(vec![picky]);
    match launch(opts).await.unwrap_err() {
        AssemblyError::AspectConfigInvalid { aspect, message } => {
            assert_eq!(aspect, "route");
            assert_eq!(message, "'base' is required");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failing_hooks_carry_their_names() {
    let v = Arc::new(Vocabulary::new());
    let bad_root = Feature::builder("layout")
        .before_start(|_ctx, _root| Err(anyhow::anyhow!("no theme")))
        .build(&v)
        .unwrap();
    let opts = LaunchOptions::new(Arc::clone(&v), |_root| panic!("root must not be registered"))
        .features(vec![bad_root]);
    match launch(opts).await.unwrap_err() {
        AssemblyError::Compose { name, .. } => assert_eq!(name, "layout"),
        other => panic!("unexpected error: {other:?}"),
    }

    let bad_start = Feature::builder("metrics")
        .after_start(|_ctx| anyhow::bail!("sink down"))
        .build(&v)
        .unwrap();
    let opts = LaunchOptions::new(Arc::clone(&v), |_root| {}).features(vec![bad_start]);
    match launch(opts).await.unwrap_err() {
        AssemblyError::AfterStart { feature, source } => {
            assert_eq!(feature, "metrics");
            assert_eq!(source.to_string(), "sink down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
