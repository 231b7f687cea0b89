//! SPDK Engine Interface
//!
//! The storage engine is reached only through its JSON-RPC control socket.
//! This module holds the wire-level pieces of that interface:
//!
//! - [`params`] - method names and typed parameter structures
//! - [`client`] - JSON-RPC 2.0 client over a Unix or TCP socket
//! - [`mock`] - in-memory engine for tests and dry runs
//!
//! Components talk to the engine through the [`EngineRpc`] port and the
//! typed [`invoke`] helper, which attaches the method and resource to any
//! failure.

pub mod client;
pub mod mock;
pub mod params;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::ports::EngineRpc;
use crate::error::{Error, Result};

pub use client::{SpdkClientConfig, SpdkJsonRpcClient};
pub use mock::{MockBehavior, MockEngine, RecordedCall};
pub use params::{
    BdevQosParams, BdevQosResult, ListenAddress, NvmfSubsystemAddListenerParams,
    BDEV_SET_QOS_LIMIT, NVMF_SUBSYSTEM_ADD_LISTENER, TRTYPE_VFIOUSER,
};

/// Issue a typed engine call on behalf of `resource`.
///
/// Any transport, protocol or decoding failure becomes
/// [`Error::EngineCallFailed`].
pub async fn invoke<P, R>(rpc: &dyn EngineRpc, method: &str, resource: &str, params: &P) -> Result<R>
where
    P: Serialize + Sync + ?Sized,
    R: DeserializeOwned,
{
    let failed = |reason: String| Error::EngineCallFailed {
        method: method.to_string(),
        resource: resource.to_string(),
        reason,
    };

    let params = serde_json::to_value(params).map_err(|e| failed(e.to_string()))?;
    let value = rpc
        .call(method, params)
        .await
        .map_err(|e| failed(e.to_string()))?;
    debug!(method, resource, result = %value, "Received from engine");

    serde_json::from_value(value).map_err(|e| failed(format!("malformed result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_decodes_result() {
        let engine = MockEngine::new();
        let applied: BdevQosResult = invoke(
            &engine,
            BDEV_SET_QOS_LIMIT,
            "Malloc0",
            &BdevQosParams::cleared("Malloc0"),
        )
        .await
        .unwrap();

        assert!(applied);
        assert_eq!(engine.call_count(), 1);
        assert_eq!(engine.calls()[0].method, BDEV_SET_QOS_LIMIT);
        assert_eq!(engine.calls()[0].params["name"], "Malloc0");
    }

    #[tokio::test]
    async fn test_invoke_wraps_transport_failure() {
        let engine = MockEngine::with_behavior(MockBehavior::Unreachable);
        let err = invoke::<_, BdevQosResult>(
            &engine,
            BDEV_SET_QOS_LIMIT,
            "Malloc0",
            &BdevQosParams::cleared("Malloc0"),
        )
        .await
        .unwrap_err();

        match err {
            Error::EngineCallFailed {
                method, resource, ..
            } => {
                assert_eq!(method, BDEV_SET_QOS_LIMIT);
                assert_eq!(resource, "Malloc0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_rejects_malformed_result() {
        let engine = MockEngine::new();
        engine.set_response(serde_json::json!({"unexpected": true}));

        let err = invoke::<_, BdevQosResult>(
            &engine,
            BDEV_SET_QOS_LIMIT,
            "Malloc0",
            &BdevQosParams::cleared("Malloc0"),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("malformed result"));
    }
}
