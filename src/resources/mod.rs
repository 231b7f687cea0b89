//! Resource Definitions
//!
//! Request/response shapes for the resources the bridge manages or reads.
//! Field names serialize in camelCase, matching the management API.

pub mod nvme;
pub mod qos;

pub use nvme::{NvmeController, NvmeSubsystem, PcieId};
pub use qos::{QosLimit, QosVolume};
