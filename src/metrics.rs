// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the sync store.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for installing an exporter.
//!
//! # Metric Naming Convention
//! - `envswap_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size histograms
//!
//! # Labels
//! - `operation`: find, collect, write, remove, list
//! - `status`: success, error, noop, not_found
//! - `tier`: session, sync

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a store operation outcome
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "envswap_sync_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "envswap_sync_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set number of bucket keys currently written
pub fn set_bucket_count(count: usize) {
    gauge!("envswap_sync_buckets").set(count as f64);
}

/// Set number of entries across all buckets
pub fn set_entry_count(count: usize) {
    gauge!("envswap_sync_entries").set(count as f64);
}

/// Record one bucket's uncompressed and stored sizes
pub fn record_bucket_bytes(uncompressed: usize, stored: usize) {
    histogram!("envswap_sync_bucket_uncompressed_bytes").record(uncompressed as f64);
    histogram!("envswap_sync_bucket_stored_bytes").record(stored as f64);
}

/// Record a lookup against a tier
pub fn record_lookup(tier: &str, hit: bool) {
    counter!(
        "envswap_sync_lookups_total",
        "tier" => tier.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// Record an entry or bucket that failed to decode
pub fn record_decode_failure(kind: &str) {
    counter!(
        "envswap_sync_decode_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a write refused because the entry set needs too many buckets
pub fn record_capacity_overflow(required: usize) {
    counter!("envswap_sync_capacity_overflows_total").increment(1);
    gauge!("envswap_sync_buckets_required").set(required as f64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the API doesn't panic without an installed recorder.

    #[test]
    fn test_record_operation() {
        record_operation("write", "success");
        record_operation("remove", "noop");
        record_operation("find", "error");
    }

    #[test]
    fn test_record_latency() {
        record_latency("find", Duration::from_micros(100));
        record_latency("write", Duration::from_millis(5));
    }

    #[test]
    fn test_gauges() {
        set_bucket_count(3);
        set_entry_count(120);
        record_capacity_overflow(14);
    }

    #[test]
    fn test_bucket_and_lookup_metrics() {
        record_bucket_bytes(8000, 1900);
        record_lookup("session", true);
        record_lookup("sync", false);
        record_decode_failure("entry");
        record_decode_failure("bucket");
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("find");
            std::thread::sleep(Duration::from_micros(10));
        }
        // Timer recorded on drop
    }
}
