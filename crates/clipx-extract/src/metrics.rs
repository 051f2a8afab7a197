//! Extraction metrics collection.
//!
//! Provides standardized metrics for monitoring the pipeline:
//! - Strategy attempts by strategy and outcome
//! - Strategy latency histograms
//! - Cache, governor and credential counters

use metrics::{counter, gauge, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Strategy attempts by strategy and outcome.
    pub const STRATEGY_ATTEMPTS_TOTAL: &str = "clipx_strategy_attempts_total";

    /// Strategy latency in seconds by strategy.
    pub const STRATEGY_LATENCY_SECONDS: &str = "clipx_strategy_latency_seconds";

    /// Cache lookups by result (hit/miss).
    pub const CACHE_LOOKUPS_TOTAL: &str = "clipx_cache_lookups_total";

    /// Entries held by the response cache, stale ones included.
    pub const CACHE_ENTRIES: &str = "clipx_cache_entries";

    /// Authenticated calls refused by the rate governor.
    pub const GOVERNOR_DENIALS_TOTAL: &str = "clipx_governor_denials_total";

    /// Credential exchanges by status.
    pub const CREDENTIAL_REFRESHES_TOTAL: &str = "clipx_credential_refreshes_total";

    /// Finished extractions by result.
    pub const EXTRACTIONS_TOTAL: &str = "clipx_extractions_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished strategy attempt.
pub fn record_strategy(strategy: &str, outcome: &str, latency_secs: f64) {
    counter!(
        names::STRATEGY_ATTEMPTS_TOTAL,
        "strategy" => strategy.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::STRATEGY_LATENCY_SECONDS,
        "strategy" => strategy.to_string()
    )
    .record(latency_secs);
}

/// Record a cache lookup.
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(names::CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

/// Record the current cache size.
pub fn record_cache_size(entries: usize) {
    gauge!(names::CACHE_ENTRIES).set(entries as f64);
}

/// Record a governor denial.
pub fn record_governor_denial() {
    counter!(names::GOVERNOR_DENIALS_TOTAL).increment(1);
}

/// Record a credential exchange.
pub fn record_credential_refresh(success: bool) {
    let status = if success { "ok" } else { "error" };
    counter!(names::CREDENTIAL_REFRESHES_TOTAL, "status" => status).increment(1);
}

/// Record the terminal result of an extraction.
pub fn record_extraction(result: &str) {
    counter!(names::EXTRACTIONS_TOTAL, "result" => result.to_string()).increment(1);
}
