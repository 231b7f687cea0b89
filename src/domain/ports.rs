//! Domain Ports
//!
//! Trait abstractions for everything outside the bridge's own logic.
//! Adapters implement them; managers receive them as trait objects so test
//! doubles can be swapped in.
//!
//! ```text
//!   QosVolumeManager ──▶ EngineRpc ──▶ SpdkJsonRpcClient | MockEngine
//!          │
//!          └─────────▶ EventPublisher ──▶ LoggingEventPublisher | InMemoryEventCollector
//!
//!   caller ──▶ NvmeTransport ──▶ VfiouserTransport
//! ```

use async_trait::async_trait;
use serde_json::Value;

use super::events::DomainEvent;
use crate::error::Result;
use crate::resources::{NvmeController, NvmeSubsystem};
use crate::spdk::NvmfSubsystemAddListenerParams;

// =============================================================================
// Engine Port
// =============================================================================

/// Port for the storage engine's remote-call interface.
///
/// Calls are blocking from the caller's point of view and are never retried
/// by the implementation.
#[async_trait]
pub trait EngineRpc: Send + Sync {
    /// Invoke `method` with JSON `params` and return the raw result.
    async fn call(&self, method: &str, params: Value) -> Result<Value>;
}

// =============================================================================
// Transport Port
// =============================================================================

/// Port for NVMe transports that can expose a controller.
pub trait NvmeTransport: Send + Sync {
    /// Build the listener the engine needs to expose `ctrlr` of `subsys`.
    fn params(
        &self,
        ctrlr: &NvmeController,
        subsys: &NvmeSubsystem,
    ) -> Result<NvmfSubsystemAddListenerParams>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    async fn publish(&self, event: DomainEvent) -> Result<()>;
}
