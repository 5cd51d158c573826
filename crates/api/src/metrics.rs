//! In-process counters for the public search endpoints.
//!
//! Counters live for the lifetime of the process and are reported by the
//! admin statistics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct SearchMetrics {
    find_requests: AtomicU64,
    delivered_centers: AtomicU64,
    empty_results: AtomicU64,
    geocode_requests: AtomicU64,
}

/// Point-in-time copy of [`SearchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetricsSnapshot {
    pub find_requests: u64,
    pub delivered_centers: u64,
    pub empty_results: u64,
    pub geocode_requests: u64,
}

impl SearchMetrics {
    pub fn record_find_request(&self) {
        self.find_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for one answered viewport search returning `count` centers.
    pub fn record_delivered(&self, count: usize) {
        if count == 0 {
            self.empty_results.fetch_add(1, Ordering::Relaxed);
        }
        self.delivered_centers
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_geocode_request(&self) {
        self.geocode_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SearchMetricsSnapshot {
        SearchMetricsSnapshot {
            find_requests: self.find_requests.load(Ordering::Relaxed),
            delivered_centers: self.delivered_centers.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            geocode_requests: self.geocode_requests.load(Ordering::Relaxed),
        }
    }
}
