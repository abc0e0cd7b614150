//! Deep-link validation.
//!
//! # Responsibilities
//! - Reject oversized URLs before parsing them
//! - Enforce the scheme deny list, then the allow list when one is set
//! - Bound the path depth

use url::Url;

use crate::config::DeepLinkConfig;
use crate::error::{Result, RouterError};
use crate::routing::matcher::ParsedUrl;

/// Checks URLs that arrive from outside the application.
#[derive(Debug, Clone)]
pub struct DeepLinkPolicy {
    allowed: Vec<String>,
    denied: Vec<String>,
    max_path_depth: usize,
    max_url_length: usize,
}

impl DeepLinkPolicy {
    /// Build a policy from the `deep_links` config section.
    pub fn from_config(config: &DeepLinkConfig) -> Self {
        Self {
            allowed: config.allowed_schemes.iter().map(|s| s.to_ascii_lowercase()).collect(),
            denied: config.denied_schemes.iter().map(|s| s.to_ascii_lowercase()).collect(),
            max_path_depth: config.max_path_depth,
            max_url_length: config.max_url_length,
        }
    }

    /// Validate `url` and return it parsed.
    pub fn validate(&self, url: &str) -> Result<ParsedUrl> {
        if url.len() > self.max_url_length {
            return Err(RouterError::invalid_url(
                url,
                format!("deep link longer than {} bytes", self.max_url_length),
            ));
        }

        let absolute = Url::parse(url.trim())
            .map_err(|e| {
                RouterError::invalid_url(url, format!("deep link must be absolute: {e}"))
            })?;
        let scheme = absolute.scheme();
        if self.denied.iter().any(|s| s == scheme) {
            return Err(RouterError::invalid_url(url, format!("scheme `{scheme}` is denied")));
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|s| s == scheme) {
            return Err(RouterError::invalid_url(url, format!("scheme `{scheme}` is not allowed")));
        }

        let parsed = ParsedUrl::parse(url)?;
        if parsed.depth() > self.max_path_depth {
            return Err(RouterError::invalid_url(
                url,
                format!(
                    "path depth {} exceeds the limit of {}",
                    parsed.depth(),
                    self.max_path_depth
                ),
            ));
        }

        tracing::debug!(url, scheme, "Deep link accepted");
        Ok(parsed)
    }
}

impl Default for DeepLinkPolicy {
    fn default() -> Self {
        Self::from_config(&DeepLinkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: RouterError) -> String {
        match err {
            RouterError::InvalidUrl { reason, .. } => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_accepts_custom_scheme() {
        let policy = DeepLinkPolicy::default();
        let parsed = policy.validate("app://user/42?tab=posts").unwrap();
        assert_eq!(parsed.scheme(), Some("app"));
        assert_eq!(parsed.path(), "/user/42");
    }

    #[test]
    fn test_denied_scheme_checked_before_parsing() {
        let policy = DeepLinkPolicy::default();
        let err = policy.validate("javascript:alert(1)").unwrap_err();
        assert!(reason(err).contains("denied"));
    }

    #[test]
    fn test_allow_list() {
        let policy = DeepLinkPolicy::from_config(&DeepLinkConfig {
            allowed_schemes: vec!["App".into()],
            ..DeepLinkConfig::default()
        });
        assert!(policy.validate("app://home").is_ok());
        let err = policy.validate("https://example.com/home").unwrap_err();
        assert!(reason(err).contains("not allowed"));
    }

    #[test]
    fn test_relative_links_rejected() {
        let err = DeepLinkPolicy::default().validate("/user/42").unwrap_err();
        assert!(reason(err).contains("absolute"));
    }

    #[test]
    fn test_depth_and_length_limits() {
        let policy = DeepLinkPolicy::from_config(&DeepLinkConfig {
            max_path_depth: 2,
            max_url_length: 32,
            ..DeepLinkConfig::default()
        });
        assert!(policy.validate("app://a/b").is_ok());
        assert!(reason(policy.validate("app://a/b/c").unwrap_err()).contains("depth"));
        assert!(reason(policy.validate("app://aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap_err())
            .contains("longer"));
    }
}
