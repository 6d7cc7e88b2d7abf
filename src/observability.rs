use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Remote data service and lookup usage counters
#[derive(Debug, Default)]
pub struct RemoteApiMetrics {
    pub total_requests: AtomicU64,
    pub errors: AtomicU64,
    pub conflicts: AtomicU64,
    pub rate_limit_waits: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl RemoteApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
        warn!("Approval changed concurrently, update rejected");
    }

    pub fn record_rate_limit_wait(&self) {
        self.rate_limit_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RemoteApiStats {
        RemoteApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            rate_limit_waits: self.rate_limit_waits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        debug!(
            "Remote API metrics: requests={}, errors={}, conflicts={}, rate_limit_waits={}, cache_hits={}, cache_misses={}",
            stats.total_requests,
            stats.errors,
            stats.conflicts,
            stats.rate_limit_waits,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteApiStats {
    pub total_requests: u64,
    pub errors: u64,
    pub conflicts: u64,
    pub rate_limit_waits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Global metrics instance
static REMOTE_METRICS: std::sync::LazyLock<RemoteApiMetrics> =
    std::sync::LazyLock::new(RemoteApiMetrics::new);

pub fn remote_metrics() -> &'static RemoteApiMetrics {
    &REMOTE_METRICS
}

/// Time an operation and log its duration on `finish`
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = RemoteApiMetrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_error();
        metrics.record_cache_hit();

        let stats = metrics.get_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 0);
    }
}
