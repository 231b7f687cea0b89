//! QoS Volume Manager
//!
//! Applies rate limits to engine bdevs and keeps the registry of QoS volumes
//! consistent with what the engine enforces.
//!
//! # Flow
//!
//! ```text
//! create: validate ─▶ lock id ─▶ registered? ──yes──▶ return stored volume
//!                                     │ no
//!                                     ▼
//!                         bdev_set_qos_limit(limits) ─▶ insert ─▶ return
//!
//! delete: lock id ─▶ registered? ──no──▶ Ok if allow_missing, else NotFound
//!                        │ yes
//!                        ▼
//!            bdev_set_qos_limit(all zero) ─▶ remove
//! ```
//!
//! The engine call runs while the per-id lock is held, so two callers can
//! never both observe an id as absent and both apply limits.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::adapters::LoggingEventPublisher;
use crate::domain::events::DomainEvent;
use crate::domain::ports::{EngineRpc, EventPublisher};
use crate::error::{Error, Result};
use crate::metrics;
use crate::resources::{QosLimit, QosVolume};
use crate::spdk::{self, BdevQosParams, BdevQosResult, BDEV_SET_QOS_LIMIT};

use super::registry::VolumeRegistry;

/// Manages the QoS volume lifecycle against the storage engine.
pub struct QosVolumeManager {
    rpc: Arc<dyn EngineRpc>,
    registry: Arc<VolumeRegistry>,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for QosVolumeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QosVolumeManager")
            .field("registered", &self.registry.len())
            .finish()
    }
}

impl QosVolumeManager {
    /// Create a manager over `registry` that talks to the engine via `rpc`.
    pub fn new(rpc: Arc<dyn EngineRpc>, registry: Arc<VolumeRegistry>) -> Self {
        Self {
            rpc,
            registry,
            events: Arc::new(LoggingEventPublisher::new()),
        }
    }

    /// Publish lifecycle events to `events` instead of the log.
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// The registry this manager owns.
    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        &self.registry
    }

    /// Create a QoS volume, or return the registered one with the same id.
    #[instrument(skip(self, volume), fields(qos_volume_id = %volume.qos_volume_id))]
    pub async fn create_qos_volume(&self, volume: &QosVolume) -> Result<QosVolume> {
        info!(volume = ?volume, "CreateQosVolume: received request");
        if let Err(e) = verify_qos_volume(volume) {
            warn!(error = %e, "Rejected QoS volume");
            metrics::record_qos_operation("create", "invalid");
            return Err(e);
        }

        let id = volume.qos_volume_id.as_str();
        let _guard = self.registry.lock(id).await;

        if let Some(existing) = self.registry.get(id) {
            info!("Already existing QoS volume");
            metrics::record_qos_operation("create", "exists");
            return Ok(existing);
        }

        let params = qos_params(volume);
        if let Err(e) = self.set_qos_limit(&params, id).await {
            metrics::record_qos_operation("create", "failed");
            return Err(e);
        }

        self.registry.insert(volume.clone());
        metrics::set_qos_volumes(self.registry.len());
        metrics::record_qos_operation("create", "created");
        info!(volume_id = %volume.volume_id, "Created QoS volume");

        self.publish(DomainEvent::qos_volume_created(id, &volume.volume_id))
            .await;
        Ok(volume.clone())
    }

    /// Delete a QoS volume and clear its limits on the engine.
    #[instrument(skip(self))]
    pub async fn delete_qos_volume(&self, name: &str, allow_missing: bool) -> Result<()> {
        info!("DeleteQosVolume: received request");
        let _guard = self.registry.lock(name).await;

        let Some(volume) = self.registry.get(name) else {
            if allow_missing {
                debug!("QoS volume not registered, allow_missing set");
                metrics::record_qos_operation("delete", "missing");
                return Ok(());
            }
            let err = Error::NotFound(name.to_string());
            warn!(error = %err, "QoS volume not registered");
            metrics::record_qos_operation("delete", "not_found");
            return Err(err);
        };

        let params = BdevQosParams::cleared(&volume.volume_id);
        if let Err(e) = self.set_qos_limit(&params, name).await {
            metrics::record_qos_operation("delete", "failed");
            return Err(e);
        }

        self.registry.remove(name);
        metrics::set_qos_volumes(self.registry.len());
        metrics::record_qos_operation("delete", "deleted");
        info!(volume_id = %volume.volume_id, "Deleted QoS volume");

        self.publish(DomainEvent::qos_volume_deleted(name, &volume.volume_id))
            .await;
        Ok(())
    }

    /// Get a registered QoS volume.
    pub fn get_qos_volume(&self, name: &str) -> Result<QosVolume> {
        self.registry
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// All registered QoS volumes, sorted by id.
    pub fn list_qos_volumes(&self) -> Vec<QosVolume> {
        self.registry.list()
    }

    async fn set_qos_limit(&self, params: &BdevQosParams, resource: &str) -> Result<()> {
        let applied: BdevQosResult =
            match spdk::invoke(self.rpc.as_ref(), BDEV_SET_QOS_LIMIT, resource, params).await {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(error = %e, bdev = %params.name, "Engine call failed");
                    metrics::record_engine_call(BDEV_SET_QOS_LIMIT, "error");
                    self.publish(DomainEvent::engine_call_failed(
                        BDEV_SET_QOS_LIMIT,
                        resource,
                        e.to_string(),
                    ))
                    .await;
                    return Err(e);
                }
            };

        if !applied {
            warn!(bdev = %params.name, params = ?params, "Could not set QoS limit");
            metrics::record_engine_call(BDEV_SET_QOS_LIMIT, "refused");
            self.publish(DomainEvent::engine_call_failed(
                BDEV_SET_QOS_LIMIT,
                resource,
                "limit not applied",
            ))
            .await;
            return Err(Error::UnexpectedEngineResult {
                method: BDEV_SET_QOS_LIMIT.to_string(),
                resource: resource.to_string(),
            });
        }

        metrics::record_engine_call(BDEV_SET_QOS_LIMIT, "applied");
        Ok(())
    }

    async fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.events.publish(event).await {
            warn!(event_type, error = %e, "Failed to publish domain event");
        }
    }
}

/// Check that `volume` is a QoS volume the engine can enforce.
///
/// Only the combined read-write IOPS limit and the three bandwidth limits are
/// supported; at least one limit must be set and none may be negative.
pub fn verify_qos_volume(volume: &QosVolume) -> Result<()> {
    if volume.qos_volume_id.is_empty() {
        return Err(Error::invalid("qos_volume_id cannot be empty"));
    }
    if volume.volume_id.is_empty() {
        return Err(Error::invalid("volume_id cannot be empty"));
    }
    if volume.limit_min.is_some() {
        return Err(Error::invalid("QoS volume limit_min is not supported"));
    }

    let unset = QosLimit::default();
    let max = volume.limit_max.as_ref().unwrap_or(&unset);

    if max.rd_iops_kiops != 0 {
        return Err(Error::invalid(
            "QoS volume limit_max rd_iops_kiops is not supported",
        ));
    }
    if max.wr_iops_kiops != 0 {
        return Err(Error::invalid(
            "QoS volume limit_max wr_iops_kiops is not supported",
        ));
    }
    if max.is_unset() {
        return Err(Error::invalid("QoS volume limit_max should set limit"));
    }

    let non_negative = [
        ("rw_iops_kiops", max.rw_iops_kiops),
        ("rd_bandwidth_mbs", max.rd_bandwidth_mbs),
        ("wr_bandwidth_mbs", max.wr_bandwidth_mbs),
        ("rw_bandwidth_mbs", max.rw_bandwidth_mbs),
    ];
    for (field, value) in non_negative {
        if value < 0 {
            return Err(Error::invalid(format!(
                "QoS volume limit_max {} cannot be negative",
                field
            )));
        }
    }

    if max.rw_iops_kiops > i64::MAX / 1000 {
        return Err(Error::invalid(
            "QoS volume limit_max rw_iops_kiops is too large",
        ));
    }

    Ok(())
}

/// Translate a verified QoS volume into `bdev_set_qos_limit` parameters.
///
/// The write bandwidth limit is taken from `rd_bandwidth_mbs`, not
/// `wr_bandwidth_mbs`.
pub(crate) fn qos_params(volume: &QosVolume) -> BdevQosParams {
    let max = volume.limit_max.clone().unwrap_or_default();
    BdevQosParams {
        name: volume.volume_id.clone(),
        rw_ios_per_sec: max.rw_iops_kiops.saturating_mul(1000),
        rw_mbytes_per_sec: max.rw_bandwidth_mbs,
        r_mbytes_per_sec: max.rd_bandwidth_mbs,
        w_mbytes_per_sec: max.rd_bandwidth_mbs,
    }
}
