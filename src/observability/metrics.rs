//! Metrics collection.
//!
//! # Metrics
//! - `waypoint_navigations_total` (counter): navigations by outcome
//! - `waypoint_navigation_duration_seconds` (histogram): end-to-end latency
//! - `waypoint_redirects_total` (counter): interceptor redirects followed
//! - `waypoint_cache_lookups_total` (counter): cache lookups by result
//! - `waypoint_cache_size` (gauge): live cache entries
//! - `waypoint_modules_loaded` (gauge): modules in Loaded or Suspended state
//! - `waypoint_idle_unloads_total` (counter): modules unloaded by the reaper
//!
//! # Design Decisions
//! - Emits through the `metrics` facade; without an installed recorder every call is a no-op
//! - Labels are low-cardinality (outcome kinds, never URLs)

use std::time::Instant;

/// Record a finished navigation.
pub fn record_navigation(outcome: &'static str, start: Instant) {
    metrics::counter!("waypoint_navigations_total", "outcome" => outcome).increment(1);
    metrics::histogram!("waypoint_navigation_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Record one redirect followed.
pub fn record_redirect() {
    metrics::counter!("waypoint_redirects_total").increment(1);
}

/// Record one cache lookup.
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("waypoint_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!("waypoint_cache_size").set(size as f64);
}

/// Set the active module gauge.
pub fn record_modules_loaded(count: usize) {
    metrics::gauge!("waypoint_modules_loaded").set(count as f64);
}

pub fn record_idle_unload() {
    metrics::counter!("waypoint_idle_unloads_total").increment(1);
}
