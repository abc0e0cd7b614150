//! Waypoint: URL routing and navigation library.

pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod modules;
pub mod navigation;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::RouterConfig;
pub use error::{Result, RouterError};
pub use lifecycle::Shutdown;
pub use navigation::{Navigation, NavigationRequest, Router};
