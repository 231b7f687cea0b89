//! Middle-end Services
//!
//! Services that sit between the management API and the engine and keep
//! their own bookkeeping.
//!
//! - [`registry`] - authoritative in-memory registry of QoS volumes
//! - [`qos`] - QoS volume lifecycle manager

pub mod qos;
pub mod registry;

pub use qos::{verify_qos_volume, QosVolumeManager};
pub use registry::{KeyGuard, VolumeRegistry};
