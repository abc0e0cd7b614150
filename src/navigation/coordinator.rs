//! Navigation coordinator.
//!
//! # Responsibilities
//! - Own the route table, cache, interceptor chain and module registry
//! - Drive each navigation through its state machine
//! - Keep the cache consistent with route and module changes
//!
//! # Design Decisions
//! - One `Router` per application, passed around explicitly (no global)
//! - Interceptors run on every navigation, cache hit or not
//! - The cache stores URL-derived parameters only; caller parameters are
//!   merged per navigation
//! - Cancellation is observed until the target runs, never after

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::context::RouteContext;
use super::state::{NavigationState, StateTracker};
use super::target::Handler;
use crate::cache::{CacheEntry, CacheKey, CacheStatistics, MemoryPressure, RouteCache};
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::interceptor::{ChainResult, Interceptor, InterceptorChain, InterceptorDescriptor};
use crate::modules::{Module, ModuleDescriptor, ModuleRegistry, ModuleState};
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;
use crate::routing::matcher::{Matcher, ParsedUrl};
use crate::routing::params::{ParamValue, Parameters};
use crate::routing::router::{RouteDefinition, RouteEntry, RouteRegistry};
use crate::security::{AllowAll, DeepLinkPolicy, PermissionChecker};

/// A navigation to perform.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub url: String,
    /// Caller-supplied parameters. Path bindings win over these; these win
    /// over query pairs.
    pub parameters: Parameters,
    /// Overrides the namespace derived from the URL scheme.
    pub namespace: Option<String>,
    /// Run this target action instead of building a handler.
    pub action: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl NavigationRequest {
    /// Navigate to `url` with no extra parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parameters: Parameters::new(),
            namespace: None,
            action: None,
            cancel: None,
        }
    }

    /// Add one caller parameter.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    /// Replace all caller parameters.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Resolve in `namespace` whatever the URL scheme says.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Run `action` on the target instead of building a handler.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Cancel the navigation when `token` fires.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A completed navigation.
pub struct Navigation {
    pub id: Uuid,
    /// Normalized URL that finally resolved, after redirects.
    pub url: String,
    pub pattern: String,
    pub target: String,
    pub module: Option<String>,
    pub parameters: Parameters,
    /// Set when no action was requested.
    pub handler: Option<Handler>,
    /// Set when an action was requested.
    pub action_result: Option<ParamValue>,
    pub from_cache: bool,
    pub redirects: u32,
}

impl Navigation {
    /// Borrow the handler as a concrete type.
    pub fn handler_as<T: 'static>(&self) -> Option<&T> {
        self.handler.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigation")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("pattern", &self.pattern)
            .field("target", &self.target)
            .field("module", &self.module)
            .field("parameters", &self.parameters)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .field("action_result", &self.action_result)
            .field("from_cache", &self.from_cache)
            .field("redirects", &self.redirects)
            .finish()
    }
}

/// Handle to a navigation started with [`Router::spawn_navigation`].
#[derive(Debug)]
pub struct NavigationHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl NavigationHandle {
    /// Request cancellation. Ignored once the target has started running.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the navigation task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the completion callback has run.
    pub async fn join(self) -> std::result::Result<(), JoinError> {
        self.task.await
    }
}

/// The router: registration, dispatch and cache control.
pub struct Router {
    config: RouterConfig,
    routes: Arc<RouteRegistry>,
    cache: RouteCache,
    interceptors: InterceptorChain,
    modules: ModuleRegistry,
    permissions: Arc<dyn PermissionChecker>,
    deep_links: DeepLinkPolicy,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("cache", &self.cache.statistics())
            .field("interceptors", &self.interceptors)
            .field("modules", &self.modules)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router with an allow-all permission checker.
    pub fn new(config: RouterConfig) -> Self {
        let routes = Arc::new(RouteRegistry::new());
        Self {
            cache: RouteCache::from_config(&config.cache),
            interceptors: InterceptorChain::new(config.navigation.interceptor_timeout()),
            modules: ModuleRegistry::new(routes.clone()),
            deep_links: DeepLinkPolicy::from_config(&config.deep_links),
            permissions: Arc::new(AllowAll),
            routes,
            config,
        }
    }

    /// Replace the default allow-all permission checker.
    pub fn with_permission_checker(mut self, checker: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = checker;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // Registration

    /// Register one static route.
    pub fn register(&self, definition: RouteDefinition) -> Result<()> {
        self.register_all(vec![definition]).map(|_| ())
    }

    /// Register several routes atomically. Returns how many were added.
    pub fn register_all(&self, definitions: Vec<RouteDefinition>) -> Result<usize> {
        let added = self.routes.register_all(definitions)?;
        self.invalidate_shadowed(&added);
        Ok(added.len())
    }

    /// Register a route that can later be removed with [`Self::unregister_dynamic`].
    pub fn register_dynamic(&self, definition: RouteDefinition) -> Result<()> {
        self.register(definition.dynamic())
    }

    /// Remove any route, static or dynamic.
    pub fn unregister(&self, pattern: &str, namespace: Option<&str>) -> Result<()> {
        let removed = self.routes.unregister(pattern, namespace)?;
        self.invalidate_removed(&[removed]);
        Ok(())
    }

    /// Remove a dynamic route. Returns false if there was none.
    pub fn unregister_dynamic(&self, pattern: &str, namespace: Option<&str>) -> Result<bool> {
        match self.routes.unregister_dynamic(pattern, namespace)? {
            Some(removed) => {
                self.invalidate_removed(&[removed]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Routes in lookup order.
    pub fn routes(&self) -> Vec<Arc<RouteEntry>> {
        self.routes.routes()
    }

    /// Drop cached resolutions that pointed at removed routes.
    fn invalidate_removed(&self, removed: &[Arc<RouteEntry>]) {
        if removed.is_empty() {
            return;
        }
        self.cache
            .invalidate_where(|_, entry| removed.iter().any(|r| Arc::ptr_eq(r, &entry.route)));
    }

    /// Drop cached resolutions that a newly added route may now win.
    fn invalidate_shadowed(&self, added: &[Arc<RouteEntry>]) {
        if added.is_empty() || self.cache.is_empty() {
            return;
        }
        self.cache.invalidate_where(|key, _| {
            ParsedUrl::parse(&key.url).is_ok_and(|url| {
                added.iter().any(|entry| {
                    entry.accepts_namespace(key.namespace.as_deref())
                        && entry.pattern.match_url(&url).is_some()
                })
            })
        });
    }

    fn invalidate_module(&self, module: &str) {
        self.cache
            .invalidate_where(|_, entry| entry.route.module.as_deref() == Some(module));
    }

    // Modules

    /// Load a module and commit its routes. Returns how many routes it added.
    pub async fn register_module(&self, module: Arc<dyn Module>) -> Result<usize> {
        let added = self.modules.register(module).await?;
        self.invalidate_shadowed(&added);
        Ok(added.len())
    }

    /// Unload a module, removing its routes and cached resolutions.
    pub async fn unregister_module(&self, name: &str) -> Result<()> {
        let result = self.modules.unregister(name).await;
        if !self.modules.contains(name) {
            self.invalidate_module(name);
        }
        result.map(|_| ())
    }

    /// Suspend a Loaded module. Navigations into it fail fast.
    pub async fn suspend_module(&self, name: &str) -> Result<()> {
        self.modules.suspend(name).await
    }

    /// Resume a Suspended module.
    pub async fn resume_module(&self, name: &str) -> Result<()> {
        self.modules.resume(name).await
    }

    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules.state(name)
    }

    /// Snapshot of every registered module.
    pub fn modules(&self) -> Vec<ModuleDescriptor> {
        self.modules.descriptors()
    }

    /// Unload every module idle for at least `threshold`. Returns their names.
    pub async fn unload_idle_modules(&self, threshold: Duration) -> Vec<String> {
        let mut unloaded = Vec::new();
        for name in self.modules.idle_candidates(threshold) {
            match self.modules.unregister_if_idle(&name, threshold).await {
                Ok(Some(_)) => {
                    metrics::record_idle_unload();
                    unloaded.push(name.clone());
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(module = %name, error = %e, "Idle unload failed");
                }
            }
            if !self.modules.contains(&name) {
                self.invalidate_module(&name);
            }
        }
        unloaded
    }

    // Interceptors

    /// Returns false if an interceptor with the same id is already present.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) -> bool {
        self.interceptors.add(interceptor)
    }

    /// Returns false if no interceptor had this id.
    pub fn remove_interceptor(&self, id: &str) -> bool {
        self.interceptors.remove(id)
    }

    /// Interceptors in execution order.
    pub fn interceptors(&self) -> Vec<InterceptorDescriptor> {
        self.interceptors.descriptors()
    }

    // Cache control

    /// Zero disables the cache.
    pub fn set_cache_size(&self, capacity: usize) {
        self.cache.set_capacity(capacity);
    }

    /// TTL in seconds. Zero disables expiry.
    pub fn set_cache_expiration_time(&self, seconds: u64) {
        let ttl = (seconds > 0).then(|| Duration::from_secs(seconds));
        self.cache.set_ttl(ttl);
    }

    /// Drop every cached resolution. Statistics are kept.
    pub fn clear_route_cache(&self) {
        self.cache.clear();
    }

    /// Current cache counters.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Zero the hit, miss and eviction counters.
    pub fn reset_cache_statistics(&self) {
        self.cache.reset_statistics();
    }

    /// Returns how many entries were dropped.
    pub fn handle_memory_pressure(&self, level: MemoryPressure) -> usize {
        self.cache.handle_memory_pressure(level)
    }

    // Dispatch

    /// Navigate to `url` with default options.
    pub async fn navigate(&self, url: &str) -> Result<Navigation> {
        self.navigate_with(NavigationRequest::new(url)).await
    }

    /// Validate an external URL against the deep-link policy, then navigate.
    pub async fn open_deep_link(&self, url: &str) -> Result<Navigation> {
        self.deep_links.validate(url)?;
        self.navigate_with(NavigationRequest::new(url)).await
    }

    /// Run a navigation to completion.
    pub async fn navigate_with(&self, request: NavigationRequest) -> Result<Navigation> {
        let start = std::time::Instant::now();
        let id = Uuid::new_v4();
        let span = tracing::info_span!("navigation", navigation_id = %id, url = %request.url);
        let mut tracker = StateTracker::new(&request.url);

        let limit = self.config.navigation.timeout();
        let result = with_timeout("navigation", limit, self.run(id, request, &mut tracker))
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match &result {
            Ok(navigation) => {
                metrics::record_navigation("completed", start);
                tracing::debug!(
                    pattern = %navigation.pattern,
                    target = %navigation.target,
                    from_cache = navigation.from_cache,
                    redirects = navigation.redirects,
                    "Navigation completed"
                );
            }
            Err(e) => {
                tracker.fail();
                metrics::record_navigation(e.kind(), start);
                tracing::debug!(error = %e, state = %tracker.state(), "Navigation failed");
            }
        }
        result
    }

    /// Start a navigation in the background.
    ///
    /// `completion` receives the result. The returned handle cancels the
    /// navigation until its target starts running.
    pub fn spawn_navigation<F>(
        self: &Arc<Self>,
        request: NavigationRequest,
        completion: F,
    ) -> NavigationHandle
    where
        F: FnOnce(Result<Navigation>) + Send + 'static,
    {
        let token = request.cancel.clone().unwrap_or_default();
        let request = request.cancellation(token.clone());
        let router = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = router.navigate_with(request).await;
            completion(result);
        });
        NavigationHandle { token, task }
    }

    async fn run(
        &self,
        id: Uuid,
        request: NavigationRequest,
        tracker: &mut StateTracker,
    ) -> Result<Navigation> {
        let NavigationRequest {
            url: original,
            parameters: caller,
            namespace: forced,
            action,
            cancel,
        } = request;
        let max_redirects = self.config.navigation.max_redirects;

        let mut current = original.clone();
        let mut inherited: Option<String> = None;
        let mut redirects = 0u32;

        loop {
            check_cancelled(&cancel, tracker.state(), &current)?;

            let parsed = ParsedUrl::parse(&current)?;
            let namespace = forced
                .clone()
                .or_else(|| parsed.scheme().map(str::to_string))
                .or_else(|| inherited.clone());
            let key = CacheKey::new(namespace.as_deref(), parsed.normalized());

            let (route, bound, from_cache) = match self.cache.get(&key) {
                Some(hit) => (hit.route, hit.parameters, true),
                None => {
                    let (route, bound) =
                        self.routes.resolve(&parsed, namespace.as_deref(), &self.modules)?;
                    tracker.advance(NavigationState::Matched);
                    (route, bound, false)
                }
            };

            if let Some(module) = route.module.as_deref() {
                self.modules.check_dispatchable(module)?;
            }
            if let Some(permission) = route.permission.as_deref() {
                if !self.permissions.is_granted(permission) {
                    return Err(RouterError::PermissionDenied(permission.to_string()));
                }
            }
            let _lease = route.module.as_deref().and_then(|m| self.modules.lease(m));

            tracker.advance(NavigationState::Intercepting);
            let context = RouteContext {
                navigation_id: id,
                url: key.url.clone(),
                path: parsed.path(),
                segments: parsed.segments().to_vec(),
                namespace: namespace.clone(),
                pattern: route.pattern.to_string(),
                target: route.target.name().to_string(),
                module: route.module.clone(),
                parameters: merge_parameters(&route, &bound, &caller),
                redirects,
                from_cache,
            };

            let outcome = match &cancel {
                Some(token) if tracker.state().is_cancellable() => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(RouterError::Cancelled(current)),
                    outcome = self.interceptors.run(context) => outcome?,
                },
                _ => self.interceptors.run(context).await?,
            };

            let parameters = match outcome {
                ChainResult::Continue(parameters) => parameters,
                ChainResult::Block(reason) => return Err(RouterError::InterceptorRejected(reason)),
                ChainResult::Redirect(next) => {
                    redirects += 1;
                    if redirects > max_redirects {
                        tracing::warn!(
                            url = %original,
                            limit = max_redirects,
                            "Redirect limit exceeded"
                        );
                        return Err(RouterError::MaxRetriesExceeded {
                            url: original,
                            limit: max_redirects,
                        });
                    }
                    metrics::record_redirect();
                    tracker.advance(NavigationState::Idle);
                    inherited = namespace;
                    current = next;
                    continue;
                }
            };

            check_cancelled(&cancel, tracker.state(), &current)?;
            if let Some(module) = route.module.as_deref() {
                self.modules.check_dispatchable(module)?;
            }
            tracker.advance(NavigationState::Resolved);

            let (handler, action_result) = match action.as_deref() {
                Some(action) => (None, Some(route.target.perform_action(action, &parameters)?)),
                None => (Some(route.target.make_handler(&parameters)?), None),
            };

            if !from_cache {
                self.cache.insert(key.clone(), CacheEntry::new(route.clone(), bound));
            }
            if let Some(module) = route.module.as_deref() {
                self.modules.touch(module);
            }
            tracker.advance(NavigationState::Completed);

            return Ok(Navigation {
                id,
                url: key.url,
                pattern: route.pattern.to_string(),
                target: route.target.name().to_string(),
                module: route.module.clone(),
                parameters,
                handler,
                action_result,
                from_cache,
                redirects,
            });
        }
    }
}

fn check_cancelled(
    cancel: &Option<CancellationToken>,
    state: NavigationState,
    url: &str,
) -> Result<()> {
    match cancel {
        Some(token) if state.is_cancellable() && token.is_cancelled() => {
            Err(RouterError::Cancelled(url.to_string()))
        }
        _ => Ok(()),
    }
}

/// Query pairs, then caller parameters, then path bindings.
fn merge_parameters(route: &RouteEntry, bound: &Parameters, caller: &Parameters) -> Parameters {
    if caller.is_empty() {
        return bound.clone();
    }
    let mut merged = bound.clone();
    merged.merge(caller);
    for name in route.pattern.param_names() {
        if let Some(value) = bound.get(name) {
            merged.insert(name, value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::target::FnTarget;

    fn router() -> Router {
        let router = Router::new(RouterConfig::default());
        router
            .register(RouteDefinition::new("/user/:id", Arc::new(FnTarget::named("user"))))
            .unwrap();
        router
    }

    #[tokio::test]
    async fn test_path_beats_caller_beats_query() {
        let router = router();
        let request = NavigationRequest::new("/user/42?id=7&tab=posts&sort=new")
            .parameter("id", "caller")
            .parameter("tab", "likes");

        let navigation = router.navigate_with(request).await.unwrap();
        let params = &navigation.parameters;
        assert_eq!(params.get("id").and_then(|v| v.as_str()), Some("42"));
        assert_eq!(params.get("tab").and_then(|v| v.as_str()), Some("likes"));
        assert_eq!(params.get("sort").and_then(|v| v.as_str()), Some("new"));
    }

    #[tokio::test]
    async fn test_second_navigation_hits_cache() {
        let router = router();
        let first = router.navigate("/user/1").await.unwrap();
        let second = router.navigate("/user/1").await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.handler_as::<String>().map(String::as_str), Some("user"));

        let stats = router.cache_statistics();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_cached_parameters_exclude_caller_values() {
        let router = router();
        router
            .navigate_with(NavigationRequest::new("/user/1").parameter("extra", true))
            .await
            .unwrap();
        let second = router.navigate("/user/1").await.unwrap();
        assert!(second.from_cache);
        assert!(!second.parameters.contains("extra"));
    }

    #[tokio::test]
    async fn test_new_route_invalidates_shadowed_entries() {
        let router = router();
        router.navigate("/user/me").await.unwrap();
        assert_eq!(router.cache_statistics().size, 1);

        router
            .register(RouteDefinition::new("/user/me", Arc::new(FnTarget::named("me"))))
            .unwrap();
        assert_eq!(router.cache_statistics().size, 0);

        let navigation = router.navigate("/user/me").await.unwrap();
        assert_eq!(navigation.target, "me");
    }

    #[tokio::test]
    async fn test_unregister_drops_cached_resolution() {
        let router = router();
        router.navigate("/user/1").await.unwrap();
        router.unregister("/user/:id", None).unwrap();

        assert_eq!(router.cache_statistics().size, 0);
        let err = router.navigate("/user/1").await.unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound(_)));
    }

    #[tokio::test]
    async fn test_action_instead_of_handler() {
        let router = Router::new(RouterConfig::default());
        let target = FnTarget::named("counter")
            .with_action("double", |p: &Parameters| Ok(ParamValue::Int(p.require_int("n")? * 2)));
        router
            .register(RouteDefinition::new("/counter/:n", Arc::new(target)))
            .unwrap();

        let navigation = router
            .navigate_with(NavigationRequest::new("/counter/21").action("double"))
            .await
            .unwrap();
        assert!(navigation.handler.is_none());
        assert_eq!(navigation.action_result, Some(ParamValue::Int(42)));

        let err = router
            .navigate_with(NavigationRequest::new("/counter/1").action("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ActionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cache_controls() {
        let router = router();
        router.set_cache_size(0);
        router.navigate("/user/1").await.unwrap();
        assert_eq!(router.cache_statistics().size, 0);

        router.set_cache_size(4);
        router.set_cache_expiration_time(0);
        router.navigate("/user/1").await.unwrap();
        router.navigate("/user/2").await.unwrap();
        assert_eq!(router.handle_memory_pressure(MemoryPressure::Critical), 2);

        router.reset_cache_statistics();
        let stats = router.cache_statistics();
        assert_eq!((stats.hits, stats.misses, stats.capacity), (0, 0, 4));
    }

    #[test]
    fn test_cancellation_ignored_once_resolved() {
        let token = CancellationToken::new();
        token.cancel();
        let cancel = Some(token);
        assert_eq!(
            check_cancelled(&cancel, NavigationState::Intercepting, "/a"),
            Err(RouterError::Cancelled("/a".into()))
        );
        assert!(check_cancelled(&cancel, NavigationState::Resolved, "/a").is_ok());
        assert!(check_cancelled(&None, NavigationState::Idle, "/a").is_ok());
    }
}
