//! Interceptors shipped with the router.

use async_trait::async_trait;

use super::{Decision, Interceptor, Priority};
use crate::error::{Result, RouterError};
use crate::navigation::context::RouteContext;
use crate::routing::matcher::encode_segment;
use crate::routing::params::{ParamValue, Parameters};

/// Logs every navigation that reaches the chain. Never changes the outcome.
#[derive(Debug, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn id(&self) -> &str {
        "logging"
    }

    fn priority(&self) -> Priority {
        Priority::CRITICAL
    }

    async fn intercept(&self, context: &RouteContext) -> Result<Decision> {
        tracing::info!(
            navigation_id = %context.navigation_id(),
            url = context.url(),
            pattern = context.pattern(),
            target = context.target(),
            module = ?context.module(),
            redirects = context.redirects(),
            from_cache = context.from_cache(),
            "Navigating"
        );
        Ok(Decision::Continue)
    }
}

/// Expected type of a required parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int,
    Bool,
    Double,
}

/// Validates that routes under a pattern carry typed parameters.
///
/// Values that coerce (`"42"` for an int) are replaced by their typed form,
/// so targets downstream see `ParamValue::Int(42)`.
#[derive(Debug, Clone)]
pub struct RequiredParameters {
    id: String,
    pattern: Option<String>,
    required: Vec<(String, ParamKind)>,
}

impl RequiredParameters {
    /// Applies to every route unless narrowed with [`Self::for_pattern`].
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: None,
            required: Vec::new(),
        }
    }

    /// Only check routes whose canonical pattern equals `pattern`.
    pub fn for_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Require `name` to be present and coercible to `kind`.
    pub fn require(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.required.push((name.into(), kind));
        self
    }

    fn applies_to(&self, context: &RouteContext) -> bool {
        self.pattern
            .as_deref()
            .map_or(true, |pattern| pattern == context.pattern())
    }
}

#[async_trait]
impl Interceptor for RequiredParameters {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> Priority {
        Priority::HIGH
    }

    async fn intercept(&self, context: &RouteContext) -> Result<Decision> {
        if !self.applies_to(context) {
            return Ok(Decision::Continue);
        }

        let parameters = context.parameters();
        let mut typed: Option<Parameters> = None;
        for (name, kind) in &self.required {
            let value: ParamValue = match kind {
                ParamKind::String => parameters.require_str(name)?.into(),
                ParamKind::Int => parameters.require_int(name)?.into(),
                ParamKind::Bool => parameters.require_bool(name)?.into(),
                ParamKind::Double => parameters.require_double(name)?.into(),
            };
            if parameters.get(name) != Some(&value) {
                typed
                    .get_or_insert_with(|| parameters.clone())
                    .insert(name.clone(), value);
            }
        }

        Ok(match typed {
            Some(parameters) => Decision::ContinueWith(parameters),
            None => Decision::Continue,
        })
    }
}

/// Redirects every path under one prefix to another prefix.
///
/// `RedirectRule::new("legacy", "/old", "/new")` sends `/old/a?x=1` to `/new/a?x=1`.
/// Prefixes match whole segments, so `/older` is left alone.
#[derive(Debug, Clone)]
pub struct RedirectRule {
    id: String,
    from: Vec<String>,
    to: Vec<String>,
}

impl RedirectRule {
    /// Fails if `from` is the root, which would redirect every path.
    pub fn new(id: impl Into<String>, from: &str, to: &str) -> Result<Self> {
        let from = split_prefix(from);
        if from.is_empty() {
            return Err(RouterError::Config(
                "redirect prefix must name at least one segment".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            from,
            to: split_prefix(to),
        })
    }

    fn rewrite(&self, context: &RouteContext) -> Option<String> {
        let rest = context.segments().strip_prefix(self.from.as_slice())?;

        let mut url = String::new();
        for segment in self.to.iter().chain(rest) {
            url.push('/');
            url.extend(encode_segment(segment));
        }
        if url.is_empty() {
            url.push('/');
        }
        if let Some(at) = context.url().find(['?', '#']) {
            url.push_str(&context.url()[at..]);
        }
        Some(url)
    }
}

fn split_prefix(prefix: &str) -> Vec<String> {
    prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Interceptor for RedirectRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> Priority {
        Priority::HIGH
    }

    async fn intercept(&self, context: &RouteContext) -> Result<Decision> {
        Ok(match self.rewrite(context) {
            Some(url) => Decision::Redirect(url),
            None => Decision::Continue,
        })
    }
}
