//! Target descriptors.
//!
//! A target is what a route resolves to: a factory for an opaque handler
//! object plus an action entry point. UI layers implement [`Target`]; the
//! router never looks inside the handler it produces.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::routing::params::{ParamValue, Parameters};

/// Opaque object produced by a target's factory.
pub type Handler = Box<dyn Any + Send>;

/// A handler factory registered against one or more patterns.
pub trait Target: Send + Sync + fmt::Debug {
    /// Stable name, used for logging and config lookups.
    fn name(&self) -> &str;

    /// Construct the handler for a resolved navigation.
    fn make_handler(&self, params: &Parameters) -> Result<Handler>;

    /// Run a named action instead of constructing a handler.
    fn perform_action(&self, action: &str, _params: &Parameters) -> Result<ParamValue> {
        Err(RouterError::ActionNotFound {
            target: self.name().to_string(),
            action: action.to_string(),
        })
    }
}

type HandlerFn = dyn Fn(&Parameters) -> Result<Handler> + Send + Sync;
type ActionFn = dyn Fn(&Parameters) -> Result<ParamValue> + Send + Sync;

/// Closure-backed [`Target`].
pub struct FnTarget {
    name: String,
    factory: Box<HandlerFn>,
    actions: HashMap<String, Box<ActionFn>>,
}

impl FnTarget {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Parameters) -> Result<Handler> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            actions: HashMap::new(),
        }
    }

    /// A target whose handler is its own name as a `String`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = name.clone();
        Self::new(name, move |_| Ok(Box::new(label.clone()) as Handler))
    }

    /// Add a named action.
    pub fn with_action<F>(mut self, action: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Parameters) -> Result<ParamValue> + Send + Sync + 'static,
    {
        self.actions.insert(action.into(), Box::new(f));
        self
    }
}

impl fmt::Debug for FnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("FnTarget")
            .field("name", &self.name)
            .field("actions", &actions)
            .finish()
    }
}

impl Target for FnTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_handler(&self, params: &Parameters) -> Result<Handler> {
        (self.factory)(params)
    }

    fn perform_action(&self, action: &str, params: &Parameters) -> Result<ParamValue> {
        match self.actions.get(action) {
            Some(f) => f(params),
            None => Err(RouterError::ActionNotFound {
                target: self.name.clone(),
                action: action.to_string(),
            }),
        }
    }
}

/// Name → target lookup used when routes come from configuration.
#[derive(Debug, Default, Clone)]
pub struct TargetCatalog {
    targets: HashMap<String, Arc<dyn Target>>,
}

impl TargetCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target under its own name, replacing any previous one.
    pub fn insert(&mut self, target: Arc<dyn Target>) {
        self.targets.insert(target.name().to_string(), target);
    }

    /// Add `target` under its own name.
    pub fn with(mut self, target: Arc<dyn Target>) -> Self {
        self.insert(target);
        self
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Target>> {
        self.targets.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
