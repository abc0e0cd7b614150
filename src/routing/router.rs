//! Route registry: lookup and registration.
//!
//! # Responsibilities
//! - Store compiled routes with their targets
//! - Look up the best matching route for a URL
//! - Add and remove routes at runtime (dynamic entries, module unloads)
//!
//! # Design Decisions
//! - Readers take a lock-free snapshot (`ArcSwap`); writers are serialized
//! - The table is kept sorted: priority desc, fewer dynamic segments, registration order
//! - First match wins
//! - Each pattern shape may be registered once per namespace; parameter
//!   names do not distinguish routes

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Result, RouterError};
use crate::navigation::target::Target;
use crate::routing::matcher::{Matcher, ParsedUrl};
use crate::routing::params::Parameters;
use crate::routing::pattern::RoutePattern;

/// How an entry's lifetime is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Registered up front, or declared by a module while loading.
    Static,
    /// Added and removed at runtime, never owned by a module.
    Dynamic,
}

/// Answers whether an owning module can currently serve routes.
pub trait ModuleLookup {
    fn is_registered(&self, module: &str) -> bool;
}

impl<F> ModuleLookup for F
where
    F: Fn(&str) -> bool,
{
    fn is_registered(&self, module: &str) -> bool {
        self(module)
    }
}

/// A route to be registered.
#[derive(Clone)]
pub struct RouteDefinition {
    pub pattern: String,
    pub target: Arc<dyn Target>,
    pub priority: i32,
    pub namespace: Option<String>,
    pub permission: Option<String>,
    pub(crate) module: Option<String>,
    pub(crate) kind: RouteKind,
}

impl RouteDefinition {
    /// A static route with priority 0, no namespace and no permission.
    pub fn new(pattern: impl Into<String>, target: Arc<dyn Target>) -> Self {
        Self {
            pattern: pattern.into(),
            target,
            priority: 0,
            namespace: None,
            permission: None,
            module: None,
            kind: RouteKind::Static,
        }
    }

    /// Higher priority wins over other matching routes.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict the route to URLs with this scheme.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Require a permission before dispatch.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub(crate) fn owned_by(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub(crate) fn dynamic(mut self) -> Self {
        self.kind = RouteKind::Dynamic;
        self
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("pattern", &self.pattern)
            .field("target", &self.target.name())
            .field("priority", &self.priority)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// A registered route.
#[derive(Debug)]
pub struct RouteEntry {
    pub pattern: RoutePattern,
    pub target: Arc<dyn Target>,
    pub priority: i32,
    pub namespace: Option<String>,
    pub permission: Option<String>,
    pub module: Option<String>,
    pub kind: RouteKind,
    sequence: u64,
}

impl RouteEntry {
    pub(crate) fn accepts_namespace(&self, namespace: Option<&str>) -> bool {
        match (namespace, self.namespace.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(own)) => wanted == own,
        }
    }

    fn same_slot(&self, pattern: &RoutePattern, namespace: Option<&str>) -> bool {
        self.pattern.same_shape(pattern) && self.namespace.as_deref() == namespace
    }

    fn sort_key(&self) -> (std::cmp::Reverse<i32>, usize, u64) {
        (
            std::cmp::Reverse(self.priority),
            self.pattern.dynamic_count(),
            self.sequence,
        )
    }

    /// `namespace:pattern` label for logs and errors.
    pub fn label(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{}", self.pattern),
            None => self.pattern.to_string(),
        }
    }
}

/// Concurrent route table.
#[derive(Debug)]
pub struct RouteRegistry {
    entries: ArcSwap<Vec<Arc<RouteEntry>>>,
    writer: Mutex<()>,
    sequence: AtomicU64,
    generation: AtomicU64,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            sequence: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Register one route.
    pub fn register(&self, definition: RouteDefinition) -> Result<Arc<RouteEntry>> {
        let mut added = self.register_all(vec![definition])?;
        Ok(added.remove(0))
    }

    /// Register several routes atomically: either all are added or none.
    pub fn register_all(&self, definitions: Vec<RouteDefinition>) -> Result<Vec<Arc<RouteEntry>>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();
        let mut next: Vec<Arc<RouteEntry>> = current.as_ref().clone();
        let mut added = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let pattern = RoutePattern::compile(&definition.pattern)?;
            let namespace = definition.namespace.as_deref();
            if next.iter().any(|e| e.same_slot(&pattern, namespace)) {
                let label = match namespace {
                    Some(ns) => format!("{ns}:{pattern}"),
                    None => pattern.to_string(),
                };
                return Err(RouterError::RouteAlreadyExists(label));
            }

            let entry = Arc::new(RouteEntry {
                pattern,
                target: definition.target,
                priority: definition.priority,
                namespace: definition.namespace,
                permission: definition.permission,
                module: definition.module,
                kind: definition.kind,
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            });
            next.push(entry.clone());
            added.push(entry);
        }

        next.sort_by_key(|e| e.sort_key());
        self.publish(next);

        for entry in &added {
            tracing::debug!(
                route = %entry.label(),
                target = entry.target.name(),
                priority = entry.priority,
                module = ?entry.module,
                kind = ?entry.kind,
                "Route registered"
            );
        }
        Ok(added)
    }

    /// Remove a route regardless of kind.
    pub fn unregister(&self, pattern: &str, namespace: Option<&str>) -> Result<Arc<RouteEntry>> {
        let pattern = RoutePattern::compile(pattern)?;
        self.remove_where(|e| e.same_slot(&pattern, namespace))
            .pop()
            .ok_or_else(|| RouterError::RouteNotFound(pattern.to_string()))
    }

    /// Remove a dynamic route. Missing or static entries are left alone.
    pub fn unregister_dynamic(
        &self,
        pattern: &str,
        namespace: Option<&str>,
    ) -> Result<Option<Arc<RouteEntry>>> {
        let pattern = RoutePattern::compile(pattern)?;
        let removed =
            self.remove_where(|e| e.kind == RouteKind::Dynamic && e.same_slot(&pattern, namespace));
        Ok(removed.into_iter().next())
    }

    /// Remove every route owned by `module`.
    pub fn unregister_module(&self, module: &str) -> Vec<Arc<RouteEntry>> {
        let removed = self.remove_where(|e| e.module.as_deref() == Some(module));
        if !removed.is_empty() {
            tracing::debug!(module, count = removed.len(), "Module routes removed");
        }
        removed
    }

    fn remove_where<P>(&self, predicate: P) -> Vec<Arc<RouteEntry>>
    where
        P: Fn(&RouteEntry) -> bool,
    {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();
        let (removed, kept): (Vec<_>, Vec<_>) =
            current.iter().cloned().partition(|e| predicate(e));
        if !removed.is_empty() {
            self.publish(kept);
        }
        removed
    }

    fn publish(&self, entries: Vec<Arc<RouteEntry>>) {
        self.entries.store(Arc::new(entries));
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Find the best route for `url`.
    ///
    /// `namespace` restricts candidates to entries registered for that
    /// namespace or for no namespace at all.
    pub fn resolve(
        &self,
        url: &ParsedUrl,
        namespace: Option<&str>,
        modules: &dyn ModuleLookup,
    ) -> Result<(Arc<RouteEntry>, Parameters)> {
        let snapshot = self.entries.load();
        let found = snapshot
            .iter()
            .filter(|e| e.accepts_namespace(namespace))
            .find_map(|e| e.pattern.match_url(url).map(|params| (e.clone(), params)));

        let Some((entry, params)) = found else {
            return Err(RouterError::RouteNotFound(url.original().to_string()));
        };

        if let Some(module) = entry.module.as_deref() {
            if !modules.is_registered(module) {
                return Err(RouterError::ModuleNotRegistered(module.to_string()));
            }
        }

        Ok((entry, params))
    }

    /// Snapshot of all routes in lookup order.
    pub fn routes(&self) -> Vec<Arc<RouteEntry>> {
        self.entries.load().as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incremented on every change to the table.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
