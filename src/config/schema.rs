//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Resolution cache settings.
    pub cache: CacheConfig,

    /// Navigation bounds (redirects, timeouts).
    pub navigation: NavigationConfig,

    /// Module lifecycle settings.
    pub modules: ModuleConfig,

    /// Deep-link acceptance policy.
    pub deep_links: DeepLinkConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Flat `pattern → target name` map registered at startup.
    pub routes: BTreeMap<String, String>,
}

/// Resolution cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching of resolutions.
    pub enabled: bool,

    /// Maximum number of cached resolutions.
    pub capacity: usize,

    /// Entry lifetime in seconds, measured from insertion. 0 = never expire.
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// `None` when `ttl_secs` is 0.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            ttl_secs: 300,
        }
    }
}

/// Navigation bounds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    /// Maximum interceptor redirects followed by one navigation.
    pub max_redirects: u32,

    /// Deadline for a whole navigation in milliseconds. 0 = unbounded.
    pub timeout_ms: u64,

    /// Deadline for each asynchronous interceptor in milliseconds. 0 = unbounded.
    pub interceptor_timeout_ms: u64,
}

impl NavigationConfig {
    /// Whole-navigation deadline, `None` when `timeout_ms` is 0.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Per-interceptor deadline, `None` when disabled.
    pub fn interceptor_timeout(&self) -> Option<Duration> {
        (self.interceptor_timeout_ms > 0)
            .then(|| Duration::from_millis(self.interceptor_timeout_ms))
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            timeout_ms: 10_000,
            interceptor_timeout_ms: 3_000,
        }
    }
}

/// Module lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModuleConfig {
    /// Run the idle-module reaper.
    pub idle_cleanup_enabled: bool,

    /// Seconds without a successful dispatch before a module is unloaded.
    pub idle_threshold_secs: u64,

    /// Seconds between reaper passes.
    pub cleanup_interval_secs: u64,
}

impl ModuleConfig {
    /// How long a module may sit unused before the reaper unloads it.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    /// Time between reaper sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            idle_cleanup_enabled: true,
            idle_threshold_secs: 600,
            cleanup_interval_secs: 60,
        }
    }
}

/// Deep-link acceptance policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DeepLinkConfig {
    /// Schemes accepted from outside the app. Empty = accept any not denied.
    pub allowed_schemes: Vec<String>,

    /// Schemes always refused.
    pub denied_schemes: Vec<String>,

    /// Maximum number of path components.
    pub max_path_depth: usize,

    /// Maximum URL length in bytes.
    pub max_url_length: usize,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: Vec::new(),
            denied_schemes: vec!["javascript".to_string(), "data".to_string(), "file".to_string()],
            max_path_depth: 10,
            max_url_length: 2048,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: `pretty` or `json`.
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
