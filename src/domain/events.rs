//! Domain Events
//!
//! Immutable records of QoS lifecycle changes and engine failures, used for
//! audit logging and for observing the manager in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain event representing a significant occurrence in the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// Limits were applied and the QoS volume registered.
    QosVolumeCreated {
        event_id: Uuid,
        qos_volume_id: String,
        volume_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Limits were cleared and the QoS volume unregistered.
    QosVolumeDeleted {
        event_id: Uuid,
        qos_volume_id: String,
        volume_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An engine call failed or was refused.
    EngineCallFailed {
        event_id: Uuid,
        method: String,
        resource: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Create a QosVolumeCreated event.
    pub fn qos_volume_created(qos_volume_id: impl Into<String>, volume_id: impl Into<String>) -> Self {
        DomainEvent::QosVolumeCreated {
            event_id: Uuid::new_v4(),
            qos_volume_id: qos_volume_id.into(),
            volume_id: volume_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a QosVolumeDeleted event.
    pub fn qos_volume_deleted(qos_volume_id: impl Into<String>, volume_id: impl Into<String>) -> Self {
        DomainEvent::QosVolumeDeleted {
            event_id: Uuid::new_v4(),
            qos_volume_id: qos_volume_id.into(),
            volume_id: volume_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an EngineCallFailed event.
    pub fn engine_call_failed(
        method: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DomainEvent::EngineCallFailed {
            event_id: Uuid::new_v4(),
            method: method.into(),
            resource: resource.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::QosVolumeCreated { .. } => "QosVolumeCreated",
            DomainEvent::QosVolumeDeleted { .. } => "QosVolumeDeleted",
            DomainEvent::EngineCallFailed { .. } => "EngineCallFailed",
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::QosVolumeCreated { timestamp, .. }
            | DomainEvent::QosVolumeDeleted { timestamp, .. }
            | DomainEvent::EngineCallFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the QoS volume id if applicable.
    pub fn qos_volume_id(&self) -> Option<&str> {
        match self {
            DomainEvent::QosVolumeCreated { qos_volume_id, .. }
            | DomainEvent::QosVolumeDeleted { qos_volume_id, .. } => Some(qos_volume_id),
            DomainEvent::EngineCallFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = DomainEvent::qos_volume_created("qos-1", "Malloc0");
        assert_eq!(event.event_type(), "QosVolumeCreated");
        assert_eq!(event.qos_volume_id(), Some("qos-1"));
        assert!(event.timestamp() <= Utc::now());

        let event = DomainEvent::engine_call_failed("bdev_set_qos_limit", "Malloc0", "refused");
        assert_eq!(event.event_type(), "EngineCallFailed");
        assert_eq!(event.qos_volume_id(), None);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = DomainEvent::qos_volume_deleted("qos-1", "Malloc0");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "QosVolumeDeleted");
        assert_eq!(json["qos_volume_id"], "qos-1");

        let back: DomainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
