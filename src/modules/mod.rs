//! Feature modules: units that own a group of routes.
//!
//! # Data Flow
//! ```text
//! register(module):
//!     dependency check → state Loading → module.load(registrar)
//!         → routes committed atomically (owned by the module) → state Loaded
//!
//! navigation into a module route:
//!     resolve → state check (Loaded / Suspended) → lease → dispatch → touch
//!
//! idle cleanup (cleanup.rs):
//!     interval tick → idle candidates → unregister → routes and cache dropped
//! ```
//!
//! # Design Decisions
//! - Registration and removal are serialized; lookups are lock-free reads
//! - A module's routes only resolve while it is Loaded or Suspended
//! - Modules in use (leased, or required by a loaded dependent) are never reaped

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::routing::router::RouteDefinition;

pub mod cleanup;
pub mod registry;

pub use cleanup::IdleReaper;
pub use registry::{ModuleDescriptor, ModuleLease, ModuleRegistry};

/// A dependency on another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub module: String,
    /// Required dependencies must be Loaded before this module registers.
    pub required: bool,
}

impl Dependency {
    /// A dependency that must be Loaded before registration.
    pub fn required(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            required: true,
        }
    }

    /// A dependency that is only logged when missing.
    pub fn optional(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            required: false,
        }
    }
}

/// Lifecycle state of a registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Unloaded,
    Loading,
    Loaded,
    Suspended,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleState::Unloaded => "unloaded",
            ModuleState::Loading => "loading",
            ModuleState::Loaded => "loaded",
            ModuleState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Collects the routes a module declares while loading.
#[derive(Debug)]
pub struct RouteRegistrar {
    module: String,
    routes: Vec<RouteDefinition>,
}

impl RouteRegistrar {
    pub(crate) fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            routes: Vec::new(),
        }
    }

    /// Name of the module being loaded.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Declare a route owned by this module.
    pub fn route(&mut self, definition: RouteDefinition) -> &mut Self {
        self.routes.push(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_definitions(self) -> Vec<RouteDefinition> {
        let module = self.module;
        self.routes
            .into_iter()
            .map(|definition| definition.owned_by(module.clone()))
            .collect()
    }
}

/// A feature module.
///
/// Only `name` and `load` are mandatory. Lifecycle hooks default to no-ops.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Declare routes. Failing here aborts registration.
    async fn load(&self, registrar: &mut RouteRegistrar) -> Result<()>;

    async fn unload(&self) -> Result<()> {
        Ok(())
    }

    async fn suspend(&self) -> Result<()> {
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        Ok(())
    }
}
