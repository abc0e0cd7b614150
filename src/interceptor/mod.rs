//! Interceptor (middleware) subsystem.
//!
//! # Data Flow
//! ```text
//! RouteContext (url, pattern, parameters)
//!     → chain.rs (priority desc, then insertion order)
//!         → interceptor: Continue | ContinueWith(params) | Block | Redirect
//!     → ChainResult::Continue(params) → coordinator resolves target
//!     → ChainResult::Block(reason)    → InterceptorRejected
//!     → ChainResult::Redirect(url)    → coordinator restarts resolution
//! ```
//!
//! # Design Decisions
//! - Strictly sequential, asynchronous interceptors suspend the chain
//! - Parameter maps are replaced wholesale, never mutated in place
//! - Identity is the interceptor's `id`; re-adding an id is a no-op

use async_trait::async_trait;

use crate::error::Result;
use crate::navigation::context::RouteContext;
use crate::routing::params::Parameters;

pub mod builtin;
pub mod chain;

pub use builtin::{LoggingInterceptor, ParamKind, RedirectRule, RequiredParameters};
pub use chain::{ChainResult, InterceptorChain, InterceptorDescriptor};

/// Execution priority. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(250);
    pub const NORMAL: Priority = Priority(500);
    pub const HIGH: Priority = Priority(750);
    pub const CRITICAL: Priority = Priority(1000);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

/// What one interceptor decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Let the navigation proceed unchanged.
    Continue,
    /// Proceed with a replacement parameter map.
    ContinueWith(Parameters),
    /// Stop the navigation with a human-readable reason.
    Block(String),
    /// Stop and restart resolution against another URL.
    Redirect(String),
}

/// A navigation middleware.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Identity used for idempotent registration and removal.
    fn id(&self) -> &str;

    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    /// Asynchronous interceptors run under the configured interceptor timeout.
    fn is_async(&self) -> bool {
        false
    }

    async fn intercept(&self, context: &RouteContext) -> Result<Decision>;
}
