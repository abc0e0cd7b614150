//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use waypoint::interceptor::{Decision, Interceptor, Priority};
use waypoint::modules::{Dependency, Module, RouteRegistrar};
use waypoint::navigation::{FnTarget, Handler, RouteContext, Target};
use waypoint::routing::{Parameters, RouteDefinition};
use waypoint::{Result, Router, RouterConfig};

/// Router with default config.
pub fn router() -> Router {
    Router::new(RouterConfig::default())
}

pub fn named(name: &str) -> Arc<dyn Target> {
    Arc::new(FnTarget::named(name))
}

/// Target that counts how many handlers it has built.
#[derive(Debug, Default)]
pub struct CountingTarget {
    pub name: String,
    pub built: AtomicUsize,
}

impl CountingTarget {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            built: AtomicUsize::new(0),
        })
    }

    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

impl Target for CountingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_handler(&self, params: &Parameters) -> Result<Handler> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(params.clone()))
    }
}

/// Interceptor returning a fixed decision and recording every call.
pub struct Probe {
    id: String,
    priority: Priority,
    decision: Decision,
    delay: Option<Duration>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn new(id: &str, priority: Priority, decision: Decision) -> Self {
        Self {
            id: id.to_string(),
            priority,
            decision,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make the probe asynchronous, sleeping before it decides.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Interceptor for Probe {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn is_async(&self) -> bool {
        self.delay.is_some()
    }

    async fn intercept(&self, context: &RouteContext) -> Result<Decision> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(context.url().to_string());
        Ok(self.decision.clone())
    }
}

/// Module declaring a fixed set of routes.
pub struct FeatureModule {
    name: String,
    dependencies: Vec<Dependency>,
    routes: Vec<(&'static str, Option<&'static str>)>,
    pub unloads: Arc<AtomicUsize>,
}

impl FeatureModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            routes: Vec::new(),
            unloads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn route(mut self, pattern: &'static str) -> Self {
        self.routes.push((pattern, None));
        self
    }

    pub fn route_in(mut self, namespace: &'static str, pattern: &'static str) -> Self {
        self.routes.push((pattern, Some(namespace)));
        self
    }

    pub fn requires(mut self, module: &str) -> Self {
        self.dependencies.push(Dependency::required(module));
        self
    }
}

#[async_trait]
impl Module for FeatureModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    async fn load(&self, registrar: &mut RouteRegistrar) -> Result<()> {
        for (pattern, namespace) in &self.routes {
            let target = named(&format!("{}:{pattern}", self.name));
            let mut definition = RouteDefinition::new(*pattern, target);
            if let Some(namespace) = namespace {
                definition = definition.namespace(*namespace);
            }
            registrar.route(definition);
        }
        Ok(())
    }

    async fn unload(&self) -> Result<()> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
