use lazy_static::lazy_static;
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry, Encoder, Histogram,
    IntCounterVec, Registry, TextEncoder,
};

use crate::Result;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref ALERTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "alert_remediator_alerts_received_total",
        "Total number of alert webhooks received, by payload kind.",
        &["payload"],
        REGISTRY
    )
    .expect("alerts_received_total is registered once");
    pub static ref REMEDIATION_RUNS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "alert_remediator_remediation_runs_total",
        "Total number of remediation command runs, by outcome.",
        &["outcome"],
        REGISTRY
    )
    .expect("remediation_runs_total is registered once");
    pub static ref REMEDIATION_DURATION_SECONDS: Histogram = register_histogram_with_registry!(
        "alert_remediator_remediation_duration_seconds",
        "Wall-clock time spent running the remediation command.",
        vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0],
        REGISTRY
    )
    .expect("remediation_duration_seconds is registered once");
}

pub fn record_alert(payload: &str) {
    ALERTS_RECEIVED_TOTAL.with_label_values(&[payload]).inc();
}

pub fn record_remediation(outcome: &str, elapsed_secs: f64) {
    REMEDIATION_RUNS_TOTAL.with_label_values(&[outcome]).inc();
    REMEDIATION_DURATION_SECONDS.observe(elapsed_secs);
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> Result<String> {
    // Touch the statics so every family shows up before the first alert.
    lazy_static::initialize(&ALERTS_RECEIVED_TOTAL);
    lazy_static::initialize(&REMEDIATION_RUNS_TOTAL);
    lazy_static::initialize(&REMEDIATION_DURATION_SECONDS);

    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathered_text_contains_recorded_families() {
        record_alert("status");
        record_remediation("success", 1.5);

        let text = gather_metrics().unwrap();
        assert!(text.contains("alert_remediator_alerts_received_total{payload=\"status\"}"));
        assert!(text.contains("alert_remediator_remediation_runs_total{outcome=\"success\"}"));
        assert!(text.contains("alert_remediator_remediation_duration_seconds_bucket"));
    }
}
