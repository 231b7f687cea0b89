//! Engine RPC method names and parameter structures

use serde::{Deserialize, Serialize};

/// Sets (or clears, when all limits are zero) the QoS limits of a bdev.
pub const BDEV_SET_QOS_LIMIT: &str = "bdev_set_qos_limit";

/// Adds a listener to an NVMe-oF subsystem.
pub const NVMF_SUBSYSTEM_ADD_LISTENER: &str = "nvmf_subsystem_add_listener";

/// Transport type of the vfio-user device-passthrough transport.
pub const TRTYPE_VFIOUSER: &str = "vfiouser";

/// Parameters of `bdev_set_qos_limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BdevQosParams {
    /// Bdev name
    pub name: String,
    pub rw_ios_per_sec: i64,
    pub rw_mbytes_per_sec: i64,
    pub r_mbytes_per_sec: i64,
    pub w_mbytes_per_sec: i64,
}

impl BdevQosParams {
    /// Parameters that remove every limit from `name`.
    pub fn cleared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Result of `bdev_set_qos_limit`: whether the limit was applied.
pub type BdevQosResult = bool;

/// Transport address a subsystem listens on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenAddress {
    pub trtype: String,
    pub traddr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adrfam: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trsvcid: Option<String>,
}

/// Parameters of `nvmf_subsystem_add_listener`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmfSubsystemAddListenerParams {
    pub nqn: String,
    pub listen_address: ListenAddress,
}

impl NvmfSubsystemAddListenerParams {
    /// Transport type of the listener.
    pub fn transport_type(&self) -> &str {
        &self.listen_address.trtype
    }

    /// Transport address of the listener.
    pub fn address(&self) -> &str {
        &self.listen_address.traddr
    }
}
