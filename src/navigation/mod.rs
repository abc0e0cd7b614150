//! Navigation subsystem.
//!
//! # Data Flow
//! ```text
//! navigate(url)
//!     → Idle: parse URL, derive namespace from scheme
//!     → cache hit ─────────────────────────────┐
//!     → Matched: registry resolve              │
//!     → module state, permission, lease        │
//!     → Intercepting: interceptor chain ◀──────┘
//!         Redirect → Idle (bounded)
//!         Block    → Failed
//!     → Resolved: target handler or action
//!     → Completed: cache fill on miss, module touched
//! ```

pub mod context;
pub mod coordinator;
pub mod state;
pub mod target;

pub use context::RouteContext;
pub use coordinator::{Navigation, NavigationHandle, NavigationRequest, Router};
pub use state::NavigationState;
pub use target::{FnTarget, Handler, Target, TargetCatalog};
