//! End-to-end navigation tests.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use waypoint::config::{apply_routes, loader::parse_toml};
use waypoint::interceptor::{Decision, ParamKind, Priority, RedirectRule, RequiredParameters};
use waypoint::navigation::TargetCatalog;
use waypoint::routing::{ParamValue, Parameters, RouteDefinition};
use waypoint::security::StaticPermissions;
use waypoint::{NavigationRequest, Router, RouterConfig, RouterError};

mod common;
use common::{named, CountingTarget, Probe};

#[tokio::test]
async fn test_param_route_binds_id() {
    let router = common::router();
    router
        .register(RouteDefinition::new("/user/:id", named("user")))
        .unwrap();

    let navigation = router.navigate("/user/42").await.unwrap();
    assert_eq!(navigation.pattern, "/user/:id");
    assert_eq!(navigation.parameters, Parameters::new().with("id", "42"));
}

#[tokio::test]
async fn test_wildcard_route_binds_remaining_path() {
    let router = common::router();
    router
        .register(RouteDefinition::new("/files/*", named("files")))
        .unwrap();

    let navigation = router.navigate("/files/a/b.txt").await.unwrap();
    assert_eq!(
        navigation.parameters.get("*").and_then(ParamValue::as_str),
        Some("a/b.txt")
    );
}

#[tokio::test]
async fn test_cache_capacity_two_evicts_oldest() {
    let mut config = RouterConfig::default();
    config.cache.capacity = 2;
    let router = Router::new(config);
    router.register(RouteDefinition::new("/:page", named("page"))).unwrap();

    for url in ["/a", "/b", "/c"] {
        router.navigate(url).await.unwrap();
    }
    let stats = router.cache_statistics();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.evictions, 1);

    assert!(router.navigate("/c").await.unwrap().from_cache);
    assert!(router.navigate("/b").await.unwrap().from_cache);
    assert!(!router.navigate("/a").await.unwrap().from_cache);
}

#[tokio::test]
async fn test_high_priority_block_rejects_without_building_target() {
    let router = common::router();
    let target = CountingTarget::new("secret");
    router
        .register(RouteDefinition::new("/secret", target.clone()))
        .unwrap();

    let guard = Arc::new(Probe::new("guard", Priority::HIGH, Decision::Block("denied".into())));
    let later = Arc::new(Probe::new("later", Priority::LOW, Decision::Continue));
    router.add_interceptor(guard.clone());
    router.add_interceptor(later.clone());

    let err = router.navigate("/secret").await.unwrap_err();
    assert_eq!(err, RouterError::InterceptorRejected("denied".into()));
    assert_eq!(target.built(), 0);
    assert_eq!(guard.calls().len(), 1);
    assert!(later.calls().is_empty());
}

#[tokio::test]
async fn test_interceptors_run_on_cache_hits() {
    let router = common::router();
    router.register(RouteDefinition::new("/home", named("home"))).unwrap();
    let probe = Arc::new(Probe::new("audit", Priority::NORMAL, Decision::Continue));
    router.add_interceptor(probe.clone());

    assert!(!router.navigate("/home").await.unwrap().from_cache);
    assert!(router.navigate("/home").await.unwrap().from_cache);
    assert_eq!(probe.calls().len(), 2);
}

#[tokio::test]
async fn test_redirect_rule_restarts_resolution() {
    let router = common::router();
    router.register(RouteDefinition::new("/old/:id", named("old"))).unwrap();
    router.register(RouteDefinition::new("/new/:id", named("new"))).unwrap();
    router.add_interceptor(Arc::new(RedirectRule::new("legacy", "/old", "/new").unwrap()));

    let navigation = router.navigate("/old/7?ref=mail").await.unwrap();
    assert_eq!(navigation.target, "new");
    assert_eq!(navigation.redirects, 1);
    assert_eq!(navigation.url, "/new/7?ref=mail");
    assert_eq!(navigation.parameters.get("ref").and_then(ParamValue::as_str), Some("mail"));
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let mut config = RouterConfig::default();
    config.navigation.max_redirects = 2;
    let router = Router::new(config);
    router.register(RouteDefinition::new("/loop", named("loop"))).unwrap();
    let redirect = Decision::Redirect("/loop".into());
    let looper = Arc::new(Probe::new("looper", Priority::NORMAL, redirect));
    router.add_interceptor(looper.clone());

    let err = router.navigate("/loop").await.unwrap_err();
    assert_eq!(
        err,
        RouterError::MaxRetriesExceeded {
            url: "/loop".into(),
            limit: 2
        }
    );
    assert_eq!(looper.calls().len(), 3);
}

#[tokio::test]
async fn test_required_parameters_reach_target_typed() {
    let router = common::router();
    let target = CountingTarget::new("user");
    router
        .register(RouteDefinition::new("/user/:id", target.clone()))
        .unwrap();
    router.add_interceptor(Arc::new(
        RequiredParameters::new("user-id")
            .for_pattern("/user/:id")
            .require("id", ParamKind::Int),
    ));

    let navigation = router.navigate("/user/42").await.unwrap();
    let handler = navigation.handler_as::<Parameters>().unwrap();
    assert_eq!(handler.get("id"), Some(&ParamValue::Int(42)));

    let err = router.navigate("/user/abc").await.unwrap_err();
    assert!(matches!(err, RouterError::Parameter { ref name, .. } if name == "id"));
    assert_eq!(target.built(), 1);
}

#[tokio::test]
async fn test_permission_checked_before_interceptors() {
    let permissions = Arc::new(StaticPermissions::new());
    let router = common::router().with_permission_checker(permissions.clone());
    router
        .register(RouteDefinition::new("/admin", named("admin")).permission("admin"))
        .unwrap();
    let probe = Arc::new(Probe::new("audit", Priority::CRITICAL, Decision::Continue));
    router.add_interceptor(probe.clone());

    let err = router.navigate("/admin").await.unwrap_err();
    assert_eq!(err, RouterError::PermissionDenied("admin".into()));
    assert!(probe.calls().is_empty());

    permissions.grant("admin");
    router.navigate("/admin").await.unwrap();
    assert_eq!(probe.calls().len(), 1);
}

#[tokio::test]
async fn test_namespaces_follow_url_scheme() {
    let router = common::router();
    router
        .register(RouteDefinition::new("/profile", named("app-profile")).namespace("app"))
        .unwrap();
    router
        .register(RouteDefinition::new("/profile", named("web-profile")).namespace("web"))
        .unwrap();

    assert_eq!(router.navigate("app://profile").await.unwrap().target, "app-profile");
    assert_eq!(router.navigate("web://profile").await.unwrap().target, "web-profile");

    let forced = NavigationRequest::new("/profile").namespace("web");
    assert_eq!(router.navigate_with(forced).await.unwrap().target, "web-profile");

    let err = router.navigate("other://profile").await.unwrap_err();
    assert!(matches!(err, RouterError::RouteNotFound(_)));
}

#[tokio::test]
async fn test_dynamic_routes_come_and_go() {
    let router = common::router();
    router
        .register_dynamic(RouteDefinition::new("/promo/:code", named("promo")))
        .unwrap();
    router.navigate("/promo/SPRING").await.unwrap();

    assert!(router.unregister_dynamic("/promo/:code", None).unwrap());
    assert!(!router.unregister_dynamic("/promo/:code", None).unwrap());
    let err = router.navigate("/promo/SPRING").await.unwrap_err();
    assert!(matches!(err, RouterError::RouteNotFound(_)));
}

#[tokio::test]
async fn test_duplicate_pattern_rejected() {
    let router = common::router();
    router.register(RouteDefinition::new("/a/:x", named("a"))).unwrap();
    let err = router
        .register(RouteDefinition::new("/a/:y", named("b")))
        .unwrap_err();
    assert!(matches!(err, RouterError::RouteAlreadyExists(_)));
}

#[tokio::test]
async fn test_invalid_url() {
    let router = common::router();
    let err = router.navigate("http://[::1").await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_deep_links_are_validated() {
    let router = common::router();
    router.register(RouteDefinition::new("/user/:id", named("user"))).unwrap();

    let navigation = router.open_deep_link("app://user/42").await.unwrap();
    assert_eq!(navigation.parameters.get("id").and_then(ParamValue::as_str), Some("42"));

    let err = router.open_deep_link("javascript:alert(1)").await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidUrl { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_resolution() {
    let router = Arc::new(common::router());
    let target = CountingTarget::new("slow");
    router.register(RouteDefinition::new("/slow", target.clone())).unwrap();
    router.add_interceptor(Arc::new(
        Probe::new("waiter", Priority::NORMAL, Decision::Continue).delayed(Duration::from_secs(1)),
    ));

    let (tx, rx) = oneshot::channel();
    let handle = router.spawn_navigation(NavigationRequest::new("/slow"), move |result| {
        let _ = tx.send(result);
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    handle.cancel();
    handle.join().await.unwrap();

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err, RouterError::Cancelled("/slow".into()));
    assert_eq!(target.built(), 0);
}

#[tokio::test]
async fn test_spawned_navigation_completes() {
    let router = Arc::new(common::router());
    router.register(RouteDefinition::new("/home", named("home"))).unwrap();

    let (tx, rx) = oneshot::channel();
    let handle = router.spawn_navigation(NavigationRequest::new("/home"), move |result| {
        let _ = tx.send(result.map(|n| n.target));
    });
    handle.join().await.unwrap();
    assert_eq!(rx.await.unwrap().unwrap(), "home");
}

#[tokio::test(start_paused = true)]
async fn test_slow_interceptor_times_out() {
    let mut config = RouterConfig::default();
    config.navigation.interceptor_timeout_ms = 100;
    let router = Router::new(config);
    router.register(RouteDefinition::new("/home", named("home"))).unwrap();
    router.add_interceptor(Arc::new(
        Probe::new("slow", Priority::NORMAL, Decision::Continue).delayed(Duration::from_secs(5)),
    ));

    let err = router.navigate("/home").await.unwrap_err();
    assert!(matches!(
        err,
        RouterError::Timeout { ref operation, .. } if operation == "interceptor slow"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_whole_navigation_times_out() {
    let mut config = RouterConfig::default();
    config.navigation.timeout_ms = 100;
    config.navigation.interceptor_timeout_ms = 0;
    let router = Router::new(config);
    router.register(RouteDefinition::new("/home", named("home"))).unwrap();
    router.add_interceptor(Arc::new(
        Probe::new("slow", Priority::NORMAL, Decision::Continue).delayed(Duration::from_secs(5)),
    ));

    let err = router.navigate("/home").await.unwrap_err();
    assert!(matches!(err, RouterError::Timeout { ref operation, .. } if operation == "navigation"));
}

#[tokio::test]
async fn test_routes_from_config() {
    let config = parse_toml(
        r#"
        [cache]
        capacity = 8

        [routes]
        "/user/:id" = "user"
        "/settings" = "settings"
        "#,
    )
    .unwrap();
    let catalog = TargetCatalog::new()
        .with(named("user"))
        .with(named("settings"));

    let routes = config.routes.clone();
    let router = Router::new(config);
    assert_eq!(apply_routes(&router, &routes, &catalog).unwrap(), 2);

    let navigation = router.navigate("/settings").await.unwrap();
    assert_eq!(navigation.handler_as::<String>().map(String::as_str), Some("settings"));
    assert_eq!(router.cache_statistics().capacity, 8);
}

#[tokio::test]
async fn test_redirect_keeps_encoded_segments_intact() {
    let router = common::router();
    router.register(RouteDefinition::new("/old/*", named("old"))).unwrap();
    router.register(RouteDefinition::new("/new/*", named("new"))).unwrap();
    router.add_interceptor(Arc::new(RedirectRule::new("legacy", "/old", "/new").unwrap()));

    let navigation = router.navigate("/old/a%3Fb/c%2Fd").await.unwrap();
    assert_eq!(navigation.target, "new");
    assert_eq!(navigation.url, "/new/a%3Fb/c%2Fd");
    assert_eq!(
        navigation.parameters.get("*").and_then(ParamValue::as_str),
        Some("a?b/c/d")
    );
    assert!(!navigation.parameters.contains("b"));
}

#[tokio::test]
async fn test_https_resolution_is_invalidated_by_new_route() {
    let router = common::router();
    router.register(RouteDefinition::new("/user/:id", named("user"))).unwrap();

    let first = router.navigate("https://example.com/user/me").await.unwrap();
    assert_eq!(first.target, "user");
    assert_eq!(first.url, "/user/me");

    router.register(RouteDefinition::new("/user/me", named("me"))).unwrap();
    assert_eq!(router.cache_statistics().size, 0);

    let second = router.navigate("https://example.com/user/me").await.unwrap();
    assert_eq!(second.target, "me");
    assert!(!second.from_cache);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_navigations_keep_cache_consistent() {
    const WORKERS: usize = 16;
    const PER_WORKER: usize = 50;
    const KEYS: usize = 32;

    let mut config = RouterConfig::default();
    config.cache.capacity = 8;
    let router = Arc::new(Router::new(config));
    router.register(RouteDefinition::new("/item/:id", named("item"))).unwrap();

    let mut tasks = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..PER_WORKER {
                let id = (worker * 7 + i) % KEYS;
                let navigation = router.navigate(&format!("/item/{id}")).await.unwrap();
                assert_eq!(
                    navigation.parameters.get("id").and_then(ParamValue::as_str),
                    Some(id.to_string().as_str())
                );
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let stats = router.cache_statistics();
    assert!(stats.size <= stats.capacity);
    assert_eq!(stats.hits + stats.misses, (WORKERS * PER_WORKER) as u64);
    assert!(stats.evictions as usize + stats.size >= KEYS);

    let fresh = router.navigate("/item/fresh").await.unwrap();
    assert!(!fresh.from_cache);
    assert!(router.navigate("/item/fresh").await.unwrap().from_cache);
}
