//! Prometheus counters for the import and sync workflows.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use tracing::error;

use crate::errors::ServiceError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref CMR_IMPORTS: IntCounter = IntCounter::new(
        "cmr_imports_total",
        "Total number of CMR deliveries imported with their ACK and freight records"
    )
    .expect("metric can be created");
    pub static ref CMR_IMPORT_SKIPS: IntCounter = IntCounter::new(
        "cmr_import_skips_total",
        "Total number of CMR imports skipped because the ACK already existed"
    )
    .expect("metric can be created");
    pub static ref CMR_IMPORT_FAILURES: IntCounter = IntCounter::new(
        "cmr_import_failures_total",
        "Total number of failed CMR imports"
    )
    .expect("metric can be created");
    pub static ref FREIGHT_SYNCS: IntCounter = IntCounter::new(
        "freight_syncs_total",
        "Total number of freight entries backfilled from ACK productions"
    )
    .expect("metric can be created");
    pub static ref FREIGHT_SYNC_FAILURES: IntCounter = IntCounter::new(
        "freight_sync_failures_total",
        "Total number of failed freight backfills"
    )
    .expect("metric can be created");
}

/// Registers the workflow counters. Safe to call more than once.
pub fn register_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(CMR_IMPORTS.clone()),
        Box::new(CMR_IMPORT_SKIPS.clone()),
        Box::new(CMR_IMPORT_FAILURES.clone()),
        Box::new(FREIGHT_SYNCS.clone()),
        Box::new(FREIGHT_SYNC_FAILURES.clone()),
    ];
    for collector in collectors {
        // AlreadyReg on repeated calls
        let _ = REGISTRY.register(collector);
    }
}

/// Renders every registered metric in the Prometheus text format
pub fn render() -> Result<String, ServiceError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| {
            error!("Failed to encode metrics: {}", e);
            ServiceError::InternalError(format!("metrics encoding failed: {}", e))
        })?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not UTF-8: {}", e)))
}
