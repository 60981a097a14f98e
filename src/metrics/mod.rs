use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use prometheus::{IntCounterVec, Opts, Registry};

mod server;
pub use server::*;

pub const PROBE_COUNT_METRIC: &str = "alien_probe_count";

/// Counter of completed triggers, keyed by endpoint and success.
pub trait MetricsSink: Send + Sync {
    /// Prepares the series of an endpoint. Called once per probe at
    /// construction time.
    fn register(&self, endpoint: &str) -> Result<(), prometheus::Error>;
    fn record(&self, endpoint: &str, success: bool);
}

fn success_label(success: bool) -> &'static str {
    if success {
        "true"
    } else {
        "false"
    }
}

/// Prometheus backed sink. The counter family is registered once, in the
/// registry given to [`PrometheusSink::new`].
#[derive(Clone)]
pub struct PrometheusSink {
    counter: IntCounterVec,
}

impl PrometheusSink {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let counter = IntCounterVec::new(
            Opts::new(PROBE_COUNT_METRIC, "Count of probes by endpoint and success"),
            &["endpoint", "success"],
        )?;
        registry.register(Box::new(counter.clone()))?;
        Ok(Self { counter })
    }
}

impl MetricsSink for PrometheusSink {
    fn register(&self, endpoint: &str) -> Result<(), prometheus::Error> {
        for success in [true, false] {
            self.counter
                .get_metric_with_label_values(&[endpoint, success_label(success)])?;
        }
        log::debug!("[metrics / {}] - registered {}", PROBE_COUNT_METRIC, endpoint);
        Ok(())
    }

    fn record(&self, endpoint: &str, success: bool) {
        self.counter
            .with_label_values(&[endpoint, success_label(success)])
            .inc();
    }
}

/// In-memory sink, for embedding without a Prometheus registry.
#[derive(Default)]
pub struct MemorySink {
    counts: DashMap<(String, bool), AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, endpoint: &str, success: bool) -> u64 {
        self.counts
            .get(&(endpoint.to_string(), success))
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total(&self, endpoint: &str) -> u64 {
        self.count(endpoint, true) + self.count(endpoint, false)
    }
}

impl MetricsSink for MemorySink {
    fn register(&self, endpoint: &str) -> Result<(), prometheus::Error> {
        for success in [true, false] {
            self.counts
                .entry((endpoint.to_string(), success))
                .or_insert_with(|| AtomicU64::new(0));
        }
        Ok(())
    }

    fn record(&self, endpoint: &str, success: bool) {
        self.counts
            .entry((endpoint.to_string(), success))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_prometheus_sink() {
        let registry = Registry::new();
        let sink = PrometheusSink::new(&registry).unwrap();
        sink.register("http://a").unwrap();
        sink.record("http://a", true);
        sink.record("http://a", true);
        sink.record("http://a", false);

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name(), PROBE_COUNT_METRIC);
        assert_eq!(families[0].get_metric().len(), 2);
        assert_eq!(sink.counter.with_label_values(&["http://a", "true"]).get(), 2);
        assert_eq!(sink.counter.with_label_values(&["http://a", "false"]).get(), 1);
    }

    #[test]
    fn test_prometheus_sink_registered_twice() {
        let registry = Registry::new();
        PrometheusSink::new(&registry).unwrap();
        assert!(matches!(
            PrometheusSink::new(&registry),
            Err(prometheus::Error::AlreadyReg)
        ));
    }

    #[test]
    fn test_memory_sink_concurrent() {
        let sink = Arc::new(MemorySink::new());
        sink.register("http://b").unwrap();
        assert_eq!(sink.total("http://b"), 0);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        sink.record("http://b", i % 2 == 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sink.count("http://b", true), 400);
        assert_eq!(sink.count("http://b", false), 400);
    }
}
