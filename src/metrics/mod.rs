use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref UPSERTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("monitor_upserts_total", "Records upserted into the live snapshot"),
        &["domain", "kind"]
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTION_EXITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "monitor_subscription_exits_total",
            "Manager subscriptions that stopped delivering records"
        ),
        &["stream", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "monitor_active_subscriptions",
        "Manager subscriptions currently running"
    )
    .expect("metric can not be created");

    pub static ref GENERATION_GAUGE: IntGauge =
        IntGauge::new("monitor_generation", "Current consumption loop generation")
            .expect("metric can not be created");

    pub static ref UPDATE_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "monitor_update_failures_total",
        "Update callback rounds that returned an error"
    )
    .expect("metric can not be created");

    pub static ref UPDATE_DURATION_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("monitor_update_duration_ms", "Update callback duration in ms")
            .buckets(exponential_buckets(1.0, 2.0, 14).expect("valid buckets"))
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(UPSERTS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(SUBSCRIPTION_EXITS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(ACTIVE_SUBSCRIPTIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(GENERATION_GAUGE.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(UPDATE_FAILURES_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(UPDATE_DURATION_MS.clone()))
        .expect("collector can be registered");
}

/// Registers the monitor collectors into [`REGISTRY`]; safe to call repeatedly.
pub fn init_metrics() {
    REGISTER_ONCE.call_once(|| register_custom_metrics(&REGISTRY));
}

/// Serves `/metrics` on `port` until `shutdown` is cancelled.
pub async fn start_server(
    port: u16,
    shutdown: CancellationToken,
) {
    init_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(port, "metrics server listening");
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            shutdown.cancelled().await;
        });
    server.await;
    info!("metrics server stopped");
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_text(&REGISTRY))
}

/// Encodes every metric of `registry` in the Prometheus text format.
pub fn gather_text(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
