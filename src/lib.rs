//! Storage Bridge
//!
//! Translates storage-management operations into the parameter structures of
//! an SPDK storage engine's JSON-RPC control interface. The engine enforces
//! QoS limits and terminates NVMe-oF connections; the bridge owns the mapping,
//! validation, idempotency and bookkeeping around those calls.
//!
//! # Architecture
//!
//! ```text
//! request ─▶ QosVolumeManager ─▶ VolumeRegistry
//!                  │
//!                  └──────────▶ EngineRpc ─▶ SPDK (bdev_set_qos_limit)
//!
//! request ─▶ VfiouserTransport ─▶ naming ─▶ NvmfSubsystemAddListenerParams
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Event publisher adapters
//! - [`domain`] - Ports and domain events
//! - [`error`] - Error types
//! - [`frontend`] - NVMe transport parameter builders
//! - [`manifest`] - YAML manifest of QoS volumes
//! - [`metrics`] - Prometheus metrics
//! - [`middleend`] - QoS volume manager and registry
//! - [`naming`] - Canonical resource names
//! - [`resources`] - Resource definitions
//! - [`spdk`] - Engine RPC client, parameters and mock

pub mod adapters;
pub mod domain;
pub mod error;
pub mod frontend;
pub mod manifest;
pub mod metrics;
pub mod middleend;
pub mod naming;
pub mod resources;
pub mod spdk;

// Re-export commonly used types
pub use error::{Error, ErrorCode, Result};
pub use frontend::VfiouserTransport;
pub use middleend::{QosVolumeManager, VolumeRegistry};
pub use resources::{NvmeController, NvmeSubsystem, PcieId, QosLimit, QosVolume};
