//! NVMe controller and subsystem resources
//!
//! These are owned and persisted elsewhere; the bridge only reads them to
//! derive engine parameters.

use serde::{Deserialize, Serialize};

/// Emulated PCIe attachment point of a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PcieId {
    pub physical_function: i32,
    pub virtual_function: i32,
    pub port_id: i32,
}

/// An NVMe controller exposed by a subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvmeController {
    /// Canonical resource name, nested under its subsystem
    pub name: String,
    #[serde(default)]
    pub pcie_id: PcieId,
}

impl NvmeController {
    pub fn new(name: impl Into<String>, pcie_id: PcieId) -> Self {
        Self {
            name: name.into(),
            pcie_id,
        }
    }
}

/// An NVMe-oF subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvmeSubsystem {
    pub name: String,
    pub nqn: String,
    /// Host allowed to connect; empty means any host
    #[serde(default)]
    pub hostnqn: String,
}

impl NvmeSubsystem {
    pub fn new(name: impl Into<String>, nqn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nqn: nqn.into(),
            hostnqn: String::new(),
        }
    }

    /// Restrict the subsystem to a single host.
    pub fn with_hostnqn(mut self, hostnqn: impl Into<String>) -> Self {
        self.hostnqn = hostnqn.into();
        self
    }
}
