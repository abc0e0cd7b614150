//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → Router::new(config)
//!     → loader::apply_routes (flat route map → registration API)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Route targets are named in config and looked up in a TargetCatalog

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_routes, load_config, ConfigError};
pub use schema::CacheConfig;
pub use schema::DeepLinkConfig;
pub use schema::ModuleConfig;
pub use schema::NavigationConfig;
pub use schema::ObservabilityConfig;
pub use schema::RouterConfig;
