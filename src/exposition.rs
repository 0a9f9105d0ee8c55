//! Prometheus text exposition format (version 0.0.4).
//!
//! A registry snapshot is loaded into a scrape-local `prometheus` registry as
//! one `GaugeVec` per family and written out by its `TextEncoder`. Exported
//! names carry the [`NAMESPACE`] prefix; the in-process registry keeps the
//! bare names.

use prometheus::{Encoder, GaugeVec, Opts, TextEncoder};
use tracing::{error, warn};

use crate::registry::MetricFamily;

/// Prefix of every exported metric name (`metricly_cpu_total`).
pub const NAMESPACE: &str = "metricly";

/// Content type of [`render`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

fn gauge_vec(family: &MetricFamily) -> prometheus::Result<GaugeVec> {
    let descriptor = &family.descriptor;
    let label_names: Vec<&str> = descriptor.label_names.iter().map(String::as_str).collect();
    let gauges = GaugeVec::new(
        Opts::new(descriptor.name.as_str(), descriptor.help.as_str()).namespace(NAMESPACE),
        &label_names,
    )?;

    for sample in &family.samples {
        let label_values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        gauges
            .get_metric_with_label_values(&label_values)?
            .set(sample.value);
    }
    Ok(gauges)
}

/// Renders families as gauges. Families without samples are skipped, and so
/// is any family the encoder rejects (logged), so a scrape never fails.
pub fn render(families: &[MetricFamily]) -> String {
    let registry = prometheus::Registry::new();
    for family in families.iter().filter(|f| !f.samples.is_empty()) {
        let registered = gauge_vec(family).and_then(|gauges| registry.register(Box::new(gauges)));
        if let Err(e) = registered {
            warn!(metric = %family.descriptor.name, error = %e, "metric family not exported");
        }
    }

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
