//! Prometheus metrics for the block processor.
//!
//! [`ProcessorMetrics`] owns a dedicated [`Registry`]; [`ProcessorMetrics::render`]
//! encodes it into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

pub struct ProcessorMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks whose batch was committed.
    pub blocks_committed: IntCounter,
    /// Blocks skipped because their chain is suppressed.
    pub blocks_skipped: IntCounter,
    /// Blocks that failed, labelled by error kind.
    pub blocks_failed: IntCounterVec,
    /// Outbound and inbound transfers counted into IBC stats.
    pub ibc_transfers: IntCounter,
    /// Channel resolutions, labelled by the tier that answered.
    pub channel_resolutions: IntCounterVec,
    /// Channel resolutions that needed a persistence read.
    pub gateway_lookups: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Chains currently suppressed.
    pub suppressed_chains: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one block, from height check to commit, in milliseconds.
    pub block_process_time_ms: Histogram,
}

impl ProcessorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_committed = register_int_counter_with_registry!(
            Opts::new(
                "zonemap_blocks_committed_total",
                "Blocks whose batch was committed"
            ),
            registry
        )
        .expect("failed to register blocks_committed counter");

        let blocks_skipped = register_int_counter_with_registry!(
            Opts::new(
                "zonemap_blocks_skipped_total",
                "Blocks skipped because their chain is suppressed"
            ),
            registry
        )
        .expect("failed to register blocks_skipped counter");

        let blocks_failed = register_int_counter_vec_with_registry!(
            Opts::new("zonemap_blocks_failed_total", "Blocks that failed, by error kind"),
            &["kind"],
            registry
        )
        .expect("failed to register blocks_failed counter");

        let ibc_transfers = register_int_counter_with_registry!(
            Opts::new(
                "zonemap_ibc_transfers_total",
                "IBC transfers counted into hourly stats"
            ),
            registry
        )
        .expect("failed to register ibc_transfers counter");

        let channel_resolutions = register_int_counter_vec_with_registry!(
            Opts::new(
                "zonemap_channel_resolutions_total",
                "Channel resolutions by answering tier"
            ),
            &["tier"],
            registry
        )
        .expect("failed to register channel_resolutions counter");

        let gateway_lookups = register_int_counter_with_registry!(
            Opts::new(
                "zonemap_gateway_lookups_total",
                "Channel resolutions that read from persistence"
            ),
            registry
        )
        .expect("failed to register gateway_lookups counter");

        let suppressed_chains = register_int_gauge_with_registry!(
            Opts::new("zonemap_suppressed_chains", "Chains currently suppressed"),
            registry
        )
        .expect("failed to register suppressed_chains gauge");

        // 0.1 ms → ~1.6 s
        let block_process_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "zonemap_block_process_time_ms",
                "Block processing time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.1, 2.0, 15).expect("valid buckets")),
            registry
        )
        .expect("failed to register block_process_time_ms histogram");

        Self {
            registry,
            blocks_committed,
            blocks_skipped,
            blocks_failed,
            ibc_transfers,
            channel_resolutions,
            gateway_lookups,
            suppressed_chains,
            block_process_time_ms,
        }
    }

    /// Encode every metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for ProcessorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metrics() {
        let metrics = ProcessorMetrics::new();
        metrics.blocks_committed.inc();
        metrics.blocks_failed.with_label_values(&["decode"]).inc();
        let text = metrics.render().unwrap();
        assert!(text.contains("zonemap_blocks_committed_total 1"));
        assert!(text.contains("zonemap_blocks_failed_total{kind=\"decode\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ProcessorMetrics::new();
        let b = ProcessorMetrics::new();
        a.blocks_skipped.inc();
        assert_eq!(a.blocks_skipped.get(), 1);
        assert_eq!(b.blocks_skipped.get(), 0);
    }
}
