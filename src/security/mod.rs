//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! External deep link:
//!     → deeplink.rs (length, scheme allow/deny list, path depth)
//!     → Router::navigate
//!
//! Every navigation:
//!     → route resolved
//!     → permissions.rs (route's permission requirement)
//!     → Interceptor chain
//! ```
//!
//! # Design Decisions
//! - Fail closed: any failed check rejects the navigation
//! - Permission checks run before interceptors see the navigation
//! - No trust in URLs arriving from outside the app

pub mod deeplink;
pub mod permissions;

pub use deeplink::DeepLinkPolicy;
pub use permissions::{AllowAll, PermissionChecker, StaticPermissions};
