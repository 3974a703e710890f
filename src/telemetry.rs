// src/telemetry.rs
//! Logging and metrics wiring.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "funding_pipeline=info,warn";

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "etl_items_processed_total",
            "Items pulled from a batch and run through a path."
        );
        describe_counter!(
            "etl_items_extracted_total",
            "Items that completed the enhanced path."
        );
        describe_counter!(
            "etl_items_enriched_total",
            "Enhanced records that were enriched."
        );
        describe_counter!(
            "etl_validation_failures_total",
            "Items rejected by the quality gate."
        );
        describe_counter!("etl_duplicates_total", "Items dropped as within-run duplicates.");
        describe_counter!(
            "etl_fallbacks_total",
            "Items moved to the legacy path after an enhanced-path fault."
        );
        describe_counter!(
            "etl_item_errors_total",
            "Items dropped after a fault with fallback disabled, or a worker panic."
        );
        describe_counter!("etl_items_persisted_total", "Records accepted by the sink.");
        describe_counter!("etl_persist_failures_total", "Records the sink refused.");
        describe_counter!("etl_source_errors_total", "Source fetch/parse errors.");
        describe_histogram!("etl_extract_ms", "Per-item extraction time in milliseconds.");
        describe_histogram!("etl_rss_parse_ms", "RSS document parse time in milliseconds.");
        describe_gauge!("etl_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
/// Safe to call twice; the second call is a no-op.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Install the Prometheus recorder and describe the pipeline's series.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}
