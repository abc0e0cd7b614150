//! Router error taxonomy.
//!
//! Registration failures are returned synchronously to the caller. Failures
//! that happen while a navigation is in flight are delivered through the
//! navigation result (or the completion callback of a spawned navigation).

use std::time::Duration;
use thiserror::Error;

use crate::routing::pattern::PatternError;

/// Errors produced by the router core.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// A route template could not be compiled.
    #[error("invalid route pattern: {0}")]
    PatternSyntax(#[from] PatternError),

    /// No registered pattern matched the URL.
    #[error("no route matches {0}")]
    RouteNotFound(String),

    /// A pattern of the same shape is already registered in the namespace.
    #[error("route {0} is already registered")]
    RouteAlreadyExists(String),

    /// The owning module is not (or no longer) loaded.
    #[error("module {0} is not registered")]
    ModuleNotRegistered(String),

    /// A module with the same name is already registered.
    #[error("module {0} is already registered")]
    ModuleAlreadyRegistered(String),

    /// A dependency requirement between modules is not satisfied.
    #[error("module {module} dependency error: {reason}")]
    ModuleDependency { module: String, reason: String },

    /// The owning module is suspended and refuses dispatch.
    #[error("module {0} is suspended")]
    ModuleSuspended(String),

    /// A module lifecycle call was made from the wrong state.
    #[error("module {module} cannot {operation} while {state}")]
    ModuleState {
        module: String,
        operation: &'static str,
        state: String,
    },

    /// The input could not be parsed as a URL or path.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A parameter is missing or has the wrong type.
    #[error("parameter {name}: {message} ({suggestion})")]
    Parameter {
        name: String,
        message: String,
        suggestion: String,
    },

    /// The route requires a permission the caller does not hold.
    #[error("permission {0} denied")]
    PermissionDenied(String),

    /// An interceptor blocked the navigation.
    #[error("navigation rejected: {0}")]
    InterceptorRejected(String),

    /// An interceptor or the whole navigation exceeded its deadline.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    /// The redirect bound was exceeded.
    #[error("too many redirects resolving {url} (limit {limit})")]
    MaxRetriesExceeded { url: String, limit: u32 },

    /// The target does not implement the requested action.
    #[error("action {action} not found on target {target}")]
    ActionNotFound { target: String, action: String },

    /// A target could not find the container it presents into.
    #[error("navigation controller not found: {0}")]
    NavigationControllerNotFound(String),

    /// A target failed to construct its handler.
    #[error("view controller not found: {0}")]
    ViewControllerNotFound(String),

    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller cancelled the navigation before it resolved.
    #[error("navigation to {0} was cancelled")]
    Cancelled(String),
}

impl RouterError {
    /// Build a [`RouterError::Parameter`].
    pub fn parameter(
        name: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Parameter {
            name: name.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Build a [`RouterError::InvalidUrl`].
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Short stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::PatternSyntax(_) => "pattern_syntax",
            RouterError::RouteNotFound(_) => "route_not_found",
            RouterError::RouteAlreadyExists(_) => "route_already_exists",
            RouterError::ModuleNotRegistered(_) => "module_not_registered",
            RouterError::ModuleAlreadyRegistered(_) => "module_already_registered",
            RouterError::ModuleDependency { .. } => "module_dependency",
            RouterError::ModuleSuspended(_) => "module_suspended",
            RouterError::ModuleState { .. } => "module_state",
            RouterError::InvalidUrl { .. } => "invalid_url",
            RouterError::Parameter { .. } => "parameter",
            RouterError::PermissionDenied(_) => "permission_denied",
            RouterError::InterceptorRejected(_) => "interceptor_rejected",
            RouterError::Timeout { .. } => "timeout",
            RouterError::MaxRetriesExceeded { .. } => "max_retries_exceeded",
            RouterError::ActionNotFound { .. } => "action_not_found",
            RouterError::NavigationControllerNotFound(_) => "navigation_controller_not_found",
            RouterError::ViewControllerNotFound(_) => "view_controller_not_found",
            RouterError::Config(_) => "config",
            RouterError::Cancelled(_) => "cancelled",
        }
    }
}

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
