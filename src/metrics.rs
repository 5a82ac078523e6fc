//! Prometheus 指标。未启用 `metrics` 特性时这些函数都是空操作。

pub const HOT_CACHE_EMPTY_TOTAL: &str = "feed_hot_cache_empty_total";
pub const HOT_RECOMPUTE_TOTAL: &str = "feed_hot_recompute_total";
pub const HOT_GENERATION: &str = "feed_hot_generation";

#[cfg(feature = "metrics")]
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("Prometheus exporter listening on {}", addr);
    Ok(())
}

#[cfg(not(feature = "metrics"))]
pub fn install_exporter(_port: u16) -> anyhow::Result<()> {
    tracing::warn!("METRICS_ENABLED is set but the binary was built without the metrics feature");
    Ok(())
}

pub fn record_hot_cache_empty() {
    #[cfg(feature = "metrics")]
    metrics::increment_counter!(HOT_CACHE_EMPTY_TOTAL);
}

/// `outcome`: `completed` | `skipped` | `failed`
pub fn record_recompute(outcome: &'static str) {
    #[cfg(feature = "metrics")]
    metrics::increment_counter!(HOT_RECOMPUTE_TOTAL, "outcome" => outcome);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

pub fn set_hot_generation(generation: u64) {
    #[cfg(feature = "metrics")]
    metrics::gauge!(HOT_GENERATION, generation as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = generation;
}
