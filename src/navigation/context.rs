//! Per-navigation route context.

use uuid::Uuid;

use crate::routing::params::Parameters;

/// What interceptors see about a navigation attempt.
///
/// Everything except the parameter map is fixed once the chain starts.
/// Interceptors replace the map wholesale through
/// [`Decision::ContinueWith`](crate::interceptor::Decision::ContinueWith).
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub(crate) navigation_id: Uuid,
    pub(crate) url: String,
    pub(crate) path: String,
    pub(crate) segments: Vec<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) pattern: String,
    pub(crate) target: String,
    pub(crate) module: Option<String>,
    pub(crate) parameters: Parameters,
    pub(crate) redirects: u32,
    pub(crate) from_cache: bool,
}

impl RouteContext {
    /// Identifier shared by every attempt of one navigation.
    pub fn navigation_id(&self) -> Uuid {
        self.navigation_id
    }

    /// Normalized URL of this attempt.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decoded path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded path components. Unlike [`Self::path`], a decoded `/`
    /// inside a component stays inside it.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Namespace the route was resolved in.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Canonical form of the matched pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Name of the resolved target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Owning module of the matched route.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Parameters as left by the interceptors that ran before this one.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Redirects already followed by this navigation.
    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    /// Whether the route came from the resolution cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub(crate) fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build a context outside of a navigation, e.g. to unit-test an interceptor.
    pub fn for_testing(path: &str, pattern: &str, parameters: Parameters) -> Self {
        Self {
            navigation_id: Uuid::new_v4(),
            url: path.to_string(),
            path: path.to_string(),
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            namespace: None,
            pattern: pattern.to_string(),
            target: "test".to_string(),
            module: None,
            parameters,
            redirects: 0,
            from_cache: false,
        }
    }
}
