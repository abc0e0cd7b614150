//! Priority-ordered interceptor chain.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{Decision, Interceptor, Priority};
use crate::error::Result;
use crate::navigation::context::RouteContext;
use crate::resilience::timeouts::with_timeout;
use crate::routing::params::Parameters;

/// Outcome of running the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainResult {
    Continue(Parameters),
    Block(String),
    Redirect(String),
}

/// Registration snapshot of one interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorDescriptor {
    pub id: String,
    pub priority: Priority,
    pub is_async: bool,
}

#[derive(Clone)]
struct Registered {
    interceptor: Arc<dyn Interceptor>,
    priority: Priority,
    sequence: u64,
}

/// Ordered collection of interceptors shared by all navigations.
pub struct InterceptorChain {
    entries: ArcSwap<Vec<Registered>>,
    writer: Mutex<()>,
    sequence: AtomicU64,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.descriptors())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::new(None)
    }
}

impl InterceptorChain {
    /// `timeout` bounds each asynchronous interceptor.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            sequence: AtomicU64::new(0),
            timeout,
        }
    }

    /// Add an interceptor. Returns false if its id is already present.
    pub fn add(&self, interceptor: Arc<dyn Interceptor>) -> bool {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();
        if current.iter().any(|r| r.interceptor.id() == interceptor.id()) {
            tracing::debug!(id = interceptor.id(), "Interceptor already registered");
            return false;
        }

        let mut next = current.as_ref().clone();
        let priority = interceptor.priority();
        tracing::debug!(id = interceptor.id(), priority = priority.0, "Interceptor added");
        next.push(Registered {
            interceptor,
            priority,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        });
        next.sort_by_key(|r| (std::cmp::Reverse(r.priority), r.sequence));
        self.entries.store(Arc::new(next));
        true
    }

    /// Remove by id. Returns false if absent.
    pub fn remove(&self, id: &str) -> bool {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();
        let next: Vec<Registered> = current
            .iter()
            .filter(|r| r.interceptor.id() != id)
            .cloned()
            .collect();
        if next.len() == current.len() {
            return false;
        }
        self.entries.store(Arc::new(next));
        tracing::debug!(id, "Interceptor removed");
        true
    }

    /// Whether an interceptor with `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.load().iter().any(|r| r.interceptor.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interceptors in execution order.
    pub fn descriptors(&self) -> Vec<InterceptorDescriptor> {
        self.entries
            .load()
            .iter()
            .map(|r| InterceptorDescriptor {
                id: r.interceptor.id().to_string(),
                priority: r.priority,
                is_async: r.interceptor.is_async(),
            })
            .collect()
    }

    /// Run every interceptor in order against `context`.
    ///
    /// The chain works on a snapshot: interceptors added or removed while
    /// it runs affect only later navigations.
    pub async fn run(&self, mut context: RouteContext) -> Result<ChainResult> {
        let snapshot = self.entries.load_full();

        for registered in snapshot.iter() {
            let interceptor = &registered.interceptor;
            let decision = if interceptor.is_async() {
                let operation = format!("interceptor {}", interceptor.id());
                with_timeout(&operation, self.timeout, interceptor.intercept(&context)).await?
            } else {
                interceptor.intercept(&context).await?
            };

            match decision {
                Decision::Continue => {}
                Decision::ContinueWith(parameters) => {
                    tracing::trace!(id = interceptor.id(), "Interceptor replaced parameters");
                    context = context.with_parameters(parameters);
                }
                Decision::Block(reason) => {
                    tracing::info!(
                        navigation_id = %context.navigation_id(),
                        id = interceptor.id(),
                        url = context.url(),
                        %reason,
                        "Navigation blocked"
                    );
                    return Ok(ChainResult::Block(reason));
                }
                Decision::Redirect(url) => {
                    tracing::debug!(
                        navigation_id = %context.navigation_id(),
                        id = interceptor.id(),
                        from = context.url(),
                        to = %url,
                        "Navigation redirected"
                    );
                    return Ok(ChainResult::Redirect(url));
                }
            }
        }

        Ok(ChainResult::Continue(context.parameters))
    }
}
