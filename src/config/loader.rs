//! Configuration loading from disk and route application.

use std::fs;
use std::path::Path;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::RouterError;
use crate::navigation::target::TargetCatalog;
use crate::navigation::Router;
use crate::routing::router::RouteDefinition;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<ValidationError>),
    UnknownTarget { pattern: String, target: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Toml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Json(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::UnknownTarget { pattern, target } => {
                write!(f, "Route {} refers to unknown target {}", pattern, target)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for RouterError {
    fn from(err: ConfigError) -> Self {
        RouterError::Config(err.to_string())
    }
}

/// Load and validate configuration from a TOML or JSON file.
///
/// The format is chosen by extension; anything but `.json` is read as TOML.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };
    tracing::debug!(path = %path.display(), routes = config.routes.len(), "Configuration parsed");
    Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_toml(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse and validate JSON text.
pub fn parse_json(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = serde_json::from_str(content).map_err(ConfigError::Json)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Register a flat `pattern → target name` map through the router's
/// registration API. Every target must exist in `catalog`; nothing is
/// registered if one is missing.
pub fn apply_routes<'a, I>(
    router: &Router,
    routes: I,
    catalog: &TargetCatalog,
) -> Result<usize, RouterError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut definitions = Vec::new();
    for (pattern, target_name) in routes {
        let target = catalog.get(target_name).ok_or_else(|| ConfigError::UnknownTarget {
            pattern: pattern.clone(),
            target: target_name.clone(),
        })?;
        definitions.push(RouteDefinition::new(pattern.clone(), target));
    }

    let count = definitions.len();
    router.register_all(definitions)?;
    tracing::info!(count, "Configured routes registered");
    Ok(count)
}
