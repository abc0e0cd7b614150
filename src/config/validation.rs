//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route template compiles
//! - Validate value ranges (intervals > 0, known log format)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::RouterConfig;
use crate::routing::pattern::RoutePattern;

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a config for semantic errors.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cache.enabled && config.cache.capacity == 0 {
        errors.push(ValidationError::new(
            "cache.capacity",
            "must be > 0 when the cache is enabled",
        ));
    }

    if config.modules.idle_cleanup_enabled {
        if config.modules.cleanup_interval_secs == 0 {
            errors.push(ValidationError::new("modules.cleanup_interval_secs", "must be > 0"));
        }
        if config.modules.idle_threshold_secs == 0 {
            errors.push(ValidationError::new("modules.idle_threshold_secs", "must be > 0"));
        }
    }

    if config.deep_links.max_path_depth == 0 {
        errors.push(ValidationError::new("deep_links.max_path_depth", "must be > 0"));
    }
    for scheme in &config.deep_links.allowed_schemes {
        if config.deep_links.denied_schemes.contains(scheme) {
            errors.push(ValidationError::new(
                "deep_links.allowed_schemes",
                format!("scheme {scheme:?} is both allowed and denied"),
            ));
        }
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!(
                "unknown format {:?}, expected pretty or json",
                config.observability.log_format
            ),
        ));
    }

    for (pattern, target) in &config.routes {
        if let Err(e) = RoutePattern::compile(pattern) {
            errors.push(ValidationError::new(format!("routes.{pattern:?}"), e.to_string()));
        }
        if target.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("routes.{pattern:?}"),
                "target name is empty",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
