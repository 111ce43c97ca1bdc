//! Cache metrics for observability

use crate::CacheKey;
use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    stale: CounterVec,
    writes: CounterVec,
    tag_versions_minted: CounterVec,
    tag_deletes: CounterVec,
    errors: CounterVec,
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    CounterVec::new(Opts::new(name, help), labels).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter(
                "tagged_cache_hits_total",
                "Total fresh cache hits",
                &["kind"],
            ),
            misses: counter(
                "tagged_cache_misses_total",
                "Total cache misses (absent, stale or unreadable)",
                &["kind"],
            ),
            stale: counter(
                "tagged_cache_stale_total",
                "Total entries rejected because a tag version changed",
                &["kind"],
            ),
            writes: counter(
                "tagged_cache_writes_total",
                "Total cache writes",
                &["kind"],
            ),
            tag_versions_minted: counter(
                "tagged_cache_tag_versions_minted_total",
                "Total tag versions created",
                &["kind"],
            ),
            tag_deletes: counter(
                "tagged_cache_tag_deletes_total",
                "Total tag deletions",
                &["kind"],
            ),
            errors: counter(
                "tagged_cache_errors_total",
                "Total cache errors",
                &["kind", "error_type"],
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.stale.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.tag_versions_minted.clone()))?;
        registry.register(Box::new(self.tag_deletes.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Extract key kind (`tag` or `entry`) for metrics labeling
fn extract_kind(key: &str) -> &str {
    CacheKey::kind(key).unwrap_or("unknown")
}

/// Cache metrics wrapper, labelled by the kind of store key involved
#[derive(Clone, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics().hits.with_label_values(&[kind]).inc();
    }

    pub fn record_miss(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics().misses.with_label_values(&[kind]).inc();
    }

    pub fn record_stale(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics().stale.with_label_values(&[kind]).inc();
    }

    pub fn record_write(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics().writes.with_label_values(&[kind]).inc();
    }

    pub fn record_tag_minted(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics()
            .tag_versions_minted
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_tag_delete(&self, key: &str) {
        let kind = extract_kind(key);
        get_metrics()
            .tag_deletes
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_error(&self, key: &str, error_type: &str) {
        let kind = extract_kind(key);
        get_metrics()
            .errors
            .with_label_values(&[kind, error_type])
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn tag_counts(kind: &str) -> (f64, f64) {
        let metrics = get_metrics();
        (
            metrics.tag_versions_minted.with_label_values(&[kind]).get(),
            metrics.tag_deletes.with_label_values(&[kind]).get(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_kind() {
        assert_eq!(extract_kind(&CacheKey::tag("tagged", "users")), "tag");
        assert_eq!(extract_kind(&CacheKey::entry("tagged", "profile:1")), "entry");
        assert_eq!(extract_kind("invalid"), "unknown");
    }

    #[test]
    fn test_register_and_record() {
        let registry = Registry::new();
        CacheMetrics::register(&registry).unwrap();

        let metrics = CacheMetrics::new();
        metrics.record_tag_minted(&CacheKey::tag("metrics-test", "users"));
        metrics.record_error(&CacheKey::entry("metrics-test", "profile"), "store");

        let families = registry.gather();
        let labels_of = |name: &str| -> Vec<String> {
            families
                .iter()
                .filter(|family| family.get_name() == name)
                .flat_map(|family| family.get_metric().iter())
                .flat_map(|metric| metric.get_label().iter())
                .map(|label| format!("{}={}", label.get_name(), label.get_value()))
                .collect()
        };

        assert!(labels_of("tagged_cache_tag_versions_minted_total").contains(&"kind=tag".to_string()));
        let error_labels = labels_of("tagged_cache_errors_total");
        assert!(error_labels.contains(&"kind=entry".to_string()));
        assert!(error_labels.contains(&"error_type=store".to_string()));
    }
}
