use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FATAL: &str = "fatal";

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Cycle metrics
    pub refresh_cycles: IntCounterVec,
    pub credentials_published: IntGauge,
    pub credential_min_expiry_unix: IntGauge,
    pub next_refresh_unix: IntGauge,

    // Registry fetch metrics
    pub registry_fetch_failures: IntCounterVec,
    pub registry_fetch_duration: HistogramVec,

    // Sink metrics
    pub sink_propagations: IntCounterVec,
    pub sink_failures: IntCounterVec,
    pub sink_duration: HistogramVec,

    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        // metric names and label sets are static, construction cannot fail
        let registry = Registry::new_custom(Some("acrautologin".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Cycle
            refresh_cycles: IntCounterVec::new(Opts::new("refresh_cycles_total", "Refresh cycles by outcome"), &["outcome"]).unwrap(),
            credentials_published: IntGauge::new("credentials_published", "Registries in the last published credential set").unwrap(),
            credential_min_expiry_unix: IntGauge::new("credential_min_expiry_unix_seconds", "Earliest known credential expiry").unwrap(),
            next_refresh_unix: IntGauge::new("next_refresh_unix_seconds", "Scheduled start of the next cycle").unwrap(),

            // Registry fetch
            registry_fetch_failures: IntCounterVec::new(Opts::new("registry_fetch_failures_total", "Registry token fetch failures by reason"), &["server", "reason"]).unwrap(),
            registry_fetch_duration: HistogramVec::new(HistogramOpts::new("registry_fetch_duration_seconds", "Registry token fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["server"]).unwrap(),

            // Sink
            sink_propagations: IntCounterVec::new(Opts::new("sink_propagations_total", "Total propagations"), &["sink"]).unwrap(),
            sink_failures: IntCounterVec::new(Opts::new("sink_failures_total", "Sink failures"), &["sink"]).unwrap(),
            sink_duration: HistogramVec::new(HistogramOpts::new("sink_propagation_duration_seconds", "Sink propagation time").buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]), &["sink"]).unwrap(),

            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.refresh_cycles.clone())).unwrap();
        reg.register(Box::new(metrics.credentials_published.clone())).unwrap();
        reg.register(Box::new(metrics.credential_min_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.next_refresh_unix.clone())).unwrap();
        reg.register(Box::new(metrics.registry_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.registry_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.sink_propagations.clone())).unwrap();
        reg.register(Box::new(metrics.sink_failures.clone())).unwrap();
        reg.register(Box::new(metrics.sink_duration.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
