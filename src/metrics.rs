use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register the portfolio engine metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Pre-register counters and gauges so they appear even before the first
/// update. The scan-duration histogram shows up with its first real scan.
fn register_metrics() {
    counter!("portfolio_scans_total").absolute(0);
    counter!("portfolio_scans_failed").absolute(0);
    counter!("portfolio_stale_results_discarded").absolute(0);
    counter!("portfolio_refresh_debounced").absolute(0);
    counter!("portfolio_refresh_superseded").absolute(0);
    counter!("portfolio_records_skipped_total").absolute(0);

    gauge!("portfolio_positions").set(0.0);
    gauge!("portfolio_generation").set(0.0);
}

/// A handle that renders without touching the global recorder, for routers
/// built in tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
