use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_tracing(service_name: &'static str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    tracing::info!(service = service_name, "Logging initialized");
    Ok(())
}

/// Installs the Prometheus exporter and registers help text for the
/// workflow metrics the dispatcher emits.
pub fn init_metrics(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_workflow_metrics();

    tracing::info!(addr = %addr, "Metrics exporter listening on /metrics");
    Ok(())
}

fn describe_workflow_metrics() {
    describe_counter!("workflow_inputs_total", "Inbound events handed to the dispatcher");
    describe_counter!(
        "workflow_duplicates_suppressed_total",
        "Events dropped because the user was busy or inside the debounce window"
    );
    describe_counter!("workflow_cancelled_total", "Workflows cancelled by the user");
    describe_counter!("workflow_completed_total", "Expense records completed");
    describe_counter!("workflow_reply_failures_total", "Replies that could not be delivered");
    describe_histogram!(
        "workflow_dispatch_seconds",
        Unit::Seconds,
        "Time taken to handle one inbound event"
    );
    describe_gauge!("workflow_sessions", "Sessions currently held in memory");
}

pub fn record_timing(metric_name: &'static str, duration_secs: f64) {
    metrics::histogram!(metric_name).record(duration_secs);
}

pub fn record_counter(metric_name: &'static str, value: u64) {
    metrics::counter!(metric_name).increment(value);
}

pub fn record_gauge(metric_name: &'static str, value: f64) {
    metrics::gauge!(metric_name).set(value);
}
