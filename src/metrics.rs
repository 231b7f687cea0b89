//! Prometheus Metrics
//!
//! Counters and gauges registered in the default Prometheus registry and
//! exposed by the daemon's `/metrics` endpoint.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{Error, Result};

/// QoS volume operations by operation and outcome.
pub static QOS_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "storage_bridge_qos_operations_total",
        "Total number of QoS volume operations",
        &["operation", "result"]
    )
    .expect("valid metric definition")
});

/// Engine calls by method and outcome.
pub static ENGINE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "storage_bridge_engine_calls_total",
        "Total number of storage engine calls",
        &["method", "result"]
    )
    .expect("valid metric definition")
});

/// QoS volumes currently registered.
pub static QOS_VOLUMES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "storage_bridge_qos_volumes",
        "Number of registered QoS volumes"
    )
    .expect("valid metric definition")
});

/// Count one QoS operation.
pub fn record_qos_operation(operation: &str, result: &str) {
    QOS_OPERATIONS.with_label_values(&[operation, result]).inc();
}

/// Count one engine call.
pub fn record_engine_call(method: &str, result: &str) {
    ENGINE_CALLS.with_label_values(&[method, result]).inc();
}

/// Publish the current registry size.
pub fn set_qos_volumes(count: usize) {
    QOS_VOLUMES.set(count as i64);
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| Error::Internal(format!("failed to encode metrics: {}", e)))?;
    Ok((encoder.format_type().to_string(), buffer))
}
