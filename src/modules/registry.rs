//! Module registry.
//!
//! # Responsibilities
//! - Register modules after checking their dependencies
//! - Commit a module's routes atomically, rolling back on conflict
//! - Track lifecycle state, last use and in-flight navigations
//! - Remove modules explicitly or when idle

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{Dependency, Module, ModuleState, RouteRegistrar};
use crate::error::{Result, RouterError};
use crate::observability::metrics;
use crate::routing::router::{ModuleLookup, RouteEntry, RouteRegistry};

struct ModuleSlot {
    module: Arc<dyn Module>,
    state: ModuleState,
    dependencies: Vec<Dependency>,
    last_used: Instant,
    in_flight: Arc<AtomicUsize>,
}

impl ModuleSlot {
    fn is_active(&self) -> bool {
        matches!(self.state, ModuleState::Loaded | ModuleState::Suspended)
    }

    fn is_idle(&self, threshold: Duration, now: Instant) -> bool {
        self.is_active()
            && self.in_flight.load(Ordering::Acquire) == 0
            && now.duration_since(self.last_used) >= threshold
    }
}

/// Point-in-time view of one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub state: ModuleState,
    pub dependencies: Vec<Dependency>,
    pub idle_for: Duration,
    pub in_flight: usize,
}

/// Marks a navigation as running inside a module. Released on drop.
#[derive(Debug)]
pub struct ModuleLease {
    counter: Arc<AtomicUsize>,
}

impl Drop for ModuleLease {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Removes a `Loading` slot unless registration commits.
///
/// Covers the register future being dropped mid-load as well as error returns.
struct PendingSlot<'a> {
    modules: &'a DashMap<String, ModuleSlot>,
    name: &'a str,
    committed: bool,
}

impl PendingSlot<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.modules.remove(self.name);
        }
    }
}

/// Registered modules and their lifecycle.
pub struct ModuleRegistry {
    modules: DashMap<String, ModuleSlot>,
    writer: Mutex<()>,
    routes: Arc<RouteRegistry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.descriptors())
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    /// Create a registry that commits module routes into `routes`.
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self {
            modules: DashMap::new(),
            writer: Mutex::new(()),
            routes,
        }
    }

    /// Load `module` and commit its routes. Returns the routes added.
    pub async fn register(&self, module: Arc<dyn Module>) -> Result<Vec<Arc<RouteEntry>>> {
        let _guard = self.writer.lock().await;
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(RouterError::ModuleAlreadyRegistered(name));
        }

        let dependencies = module.dependencies();
        for dependency in &dependencies {
            let state = self.state(&dependency.module);
            if state == Some(ModuleState::Loaded) {
                continue;
            }
            if dependency.required {
                let status = state.map_or_else(|| "not registered".to_string(), |s| s.to_string());
                return Err(RouterError::ModuleDependency {
                    module: name,
                    reason: format!("required dependency `{}` is {status}", dependency.module),
                });
            }
            tracing::warn!(
                module = %name,
                dependency = %dependency.module,
                "Optional dependency not loaded"
            );
        }

        self.modules.insert(
            name.clone(),
            ModuleSlot {
                module: module.clone(),
                state: ModuleState::Loading,
                dependencies,
                last_used: Instant::now(),
                in_flight: Arc::new(AtomicUsize::new(0)),
            },
        );
        let pending = PendingSlot {
            modules: &self.modules,
            name: &name,
            committed: false,
        };

        let mut registrar = RouteRegistrar::new(name.clone());
        if let Err(e) = module.load(&mut registrar).await {
            tracing::warn!(module = %name, error = %e, "Module failed to load");
            return Err(e);
        }

        let added = match self.routes.register_all(registrar.into_definitions()) {
            Ok(added) => added,
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "Module routes rejected, rolling back");
                if let Err(unload) = module.unload().await {
                    tracing::warn!(module = %name, error = %unload, "Rollback unload failed");
                }
                return Err(e);
            }
        };

        if let Some(mut slot) = self.modules.get_mut(&name) {
            slot.state = ModuleState::Loaded;
            slot.last_used = Instant::now();
        }
        pending.commit();
        metrics::record_modules_loaded(self.loaded_count());
        tracing::info!(module = %name, routes = added.len(), "Module loaded");
        Ok(added)
    }

    /// Unload `name` and remove its routes. Returns the routes removed.
    pub async fn unregister(&self, name: &str) -> Result<Vec<Arc<RouteEntry>>> {
        let _guard = self.writer.lock().await;
        self.remove_locked(name).await
    }

    /// Unregister `name` only if it is still idle once the writer lock is held.
    ///
    /// Returns `Ok(None)` when the module became busy, was removed, or
    /// gained a dependent in the meantime.
    pub async fn unregister_if_idle(
        &self,
        name: &str,
        threshold: Duration,
    ) -> Result<Option<Vec<Arc<RouteEntry>>>> {
        let _guard = self.writer.lock().await;
        let now = Instant::now();
        let idle = self
            .modules
            .get(name)
            .is_some_and(|slot| slot.is_idle(threshold, now));
        if !idle || self.required_by(name).is_some() {
            return Ok(None);
        }
        self.remove_locked(name).await.map(Some)
    }

    async fn remove_locked(&self, name: &str) -> Result<Vec<Arc<RouteEntry>>> {
        if !self.modules.contains_key(name) {
            return Err(RouterError::ModuleNotRegistered(name.to_string()));
        }
        if let Some(dependent) = self.required_by(name) {
            return Err(RouterError::ModuleDependency {
                module: name.to_string(),
                reason: format!("still required by `{dependent}`"),
            });
        }

        let Some((_, slot)) = self.modules.remove(name) else {
            return Err(RouterError::ModuleNotRegistered(name.to_string()));
        };
        let removed = self.routes.unregister_module(name);
        metrics::record_modules_loaded(self.loaded_count());
        tracing::info!(module = name, routes = removed.len(), "Module unloaded");

        slot.module.unload().await?;
        Ok(removed)
    }

    /// First active module that requires `name`.
    fn required_by(&self, name: &str) -> Option<String> {
        self.modules.iter().find_map(|slot| {
            let requires = slot
                .dependencies
                .iter()
                .any(|d| d.required && d.module == name);
            (requires && slot.state != ModuleState::Unloaded).then(|| slot.key().clone())
        })
    }

    /// Pause a Loaded module. Its routes stay registered.
    pub async fn suspend(&self, name: &str) -> Result<()> {
        let _guard = self.writer.lock().await;
        let module = self.module_in_state(name, "suspend", ModuleState::Loaded)?;
        module.suspend().await?;
        self.set_state(name, ModuleState::Suspended);
        tracing::info!(module = name, "Module suspended");
        Ok(())
    }

    /// Resume a Suspended module.
    pub async fn resume(&self, name: &str) -> Result<()> {
        let _guard = self.writer.lock().await;
        let module = self.module_in_state(name, "resume", ModuleState::Suspended)?;
        module.resume().await?;
        self.set_state(name, ModuleState::Loaded);
        tracing::info!(module = name, "Module resumed");
        Ok(())
    }

    fn module_in_state(
        &self,
        name: &str,
        operation: &'static str,
        expected: ModuleState,
    ) -> Result<Arc<dyn Module>> {
        let slot = self
            .modules
            .get(name)
            .ok_or_else(|| RouterError::ModuleNotRegistered(name.to_string()))?;
        if slot.state != expected {
            return Err(RouterError::ModuleState {
                module: name.to_string(),
                operation,
                state: slot.state.to_string(),
            });
        }
        Ok(slot.module.clone())
    }

    fn set_state(&self, name: &str, state: ModuleState) {
        if let Some(mut slot) = self.modules.get_mut(name) {
            slot.state = state;
        }
    }

    /// Fail unless navigations may enter `name` right now.
    pub fn check_dispatchable(&self, name: &str) -> Result<()> {
        match self.state(name) {
            Some(ModuleState::Loaded) => Ok(()),
            Some(ModuleState::Suspended) => Err(RouterError::ModuleSuspended(name.to_string())),
            _ => Err(RouterError::ModuleNotRegistered(name.to_string())),
        }
    }

    /// Hold `name` busy for the lifetime of the returned lease.
    pub fn lease(&self, name: &str) -> Option<ModuleLease> {
        let slot = self.modules.get(name)?;
        slot.in_flight.fetch_add(1, Ordering::AcqRel);
        Some(ModuleLease {
            counter: slot.in_flight.clone(),
        })
    }

    /// Record a successful dispatch into `name`.
    pub fn touch(&self, name: &str) {
        if let Some(mut slot) = self.modules.get_mut(name) {
            slot.last_used = Instant::now();
        }
    }

    /// Lifecycle state of `name`, `None` if it is not registered.
    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.modules.get(name).map(|slot| slot.state)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Names of modules unused for at least `threshold`, with no in-flight
    /// navigations and no active dependents. Sorted by name.
    pub fn idle_candidates(&self, threshold: Duration) -> Vec<String> {
        let now = Instant::now();
        let idle: Vec<String> = self
            .modules
            .iter()
            .filter(|slot| slot.is_idle(threshold, now))
            .map(|slot| slot.key().clone())
            .collect();
        let mut idle: Vec<String> = idle
            .into_iter()
            .filter(|name| self.required_by(name).is_none())
            .collect();
        idle.sort();
        idle
    }

    /// Snapshot of every module, sorted by name.
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        let now = Instant::now();
        let mut all: Vec<ModuleDescriptor> = self
            .modules
            .iter()
            .map(|slot| ModuleDescriptor {
                name: slot.key().clone(),
                state: slot.state,
                dependencies: slot.dependencies.clone(),
                idle_for: now.duration_since(slot.last_used),
                in_flight: slot.in_flight.load(Ordering::Acquire),
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Modules that are Loaded or Suspended.
    pub fn loaded_count(&self) -> usize {
        self.modules.iter().filter(|slot| slot.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLookup for ModuleRegistry {
    fn is_registered(&self, module: &str) -> bool {
        self.modules.get(module).is_some_and(|slot| slot.is_active())
    }
}
