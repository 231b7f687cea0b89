//! Domain Layer
//!
//! Core abstractions the bridge components depend on.
//!
//! - **Ports** (`ports.rs`) - traits for the engine, transports and event sinks
//! - **Events** (`events.rs`) - records of QoS lifecycle changes
//!
//! # Usage
//!
//! ```ignore
//! use storage_bridge::domain::ports::EngineRpc;
//!
//! async fn clear_limit(rpc: &dyn EngineRpc, bdev: &str) -> Result<()> {
//!     let params = BdevQosParams::cleared(bdev);
//!     let applied: bool = spdk::invoke(rpc, BDEV_SET_QOS_LIMIT, bdev, &params).await?;
//!     // ...
//! }
//! ```

pub mod events;
pub mod ports;

pub use events::DomainEvent;
pub use ports::{EngineRpc, EventPublisher, NvmeTransport};
