//! QoS volume resource

use serde::{Deserialize, Serialize};

/// Rate limits applied to a volume.
///
/// IOPS values are in thousands of operations per second, bandwidth values
/// in MB/s. Zero means "no limit" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QosLimit {
    pub rd_iops_kiops: i64,
    pub wr_iops_kiops: i64,
    pub rw_iops_kiops: i64,
    pub rd_bandwidth_mbs: i64,
    pub wr_bandwidth_mbs: i64,
    pub rw_bandwidth_mbs: i64,
}

impl QosLimit {
    /// True when no dimension carries a limit.
    pub fn is_unset(&self) -> bool {
        self.rd_iops_kiops == 0
            && self.wr_iops_kiops == 0
            && self.rw_iops_kiops == 0
            && self.rd_bandwidth_mbs == 0
            && self.wr_bandwidth_mbs == 0
            && self.rw_bandwidth_mbs == 0
    }
}

/// A volume wrapped with enforced rate limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosVolume {
    /// Unique id of the QoS volume
    #[serde(default)]
    pub qos_volume_id: String,

    /// Underlying volume (engine bdev name) the limits apply to
    #[serde(default)]
    pub volume_id: String,

    /// Minimum guarantees; never supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_min: Option<QosLimit>,

    /// Ceilings to enforce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_max: Option<QosLimit>,
}

impl QosVolume {
    /// Create a QoS volume with the given max limits.
    pub fn new(
        qos_volume_id: impl Into<String>,
        volume_id: impl Into<String>,
        limit_max: QosLimit,
    ) -> Self {
        Self {
            qos_volume_id: qos_volume_id.into(),
            volume_id: volume_id.into(),
            limit_min: None,
            limit_max: Some(limit_max),
        }
    }
}
