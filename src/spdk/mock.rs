//! Mock engine for testing without SPDK
//!
//! Records every call it receives and answers according to a configurable
//! [`MockBehavior`]. Use this for:
//!
//! - Unit and integration testing without an SPDK target
//! - Dry runs of the daemon (`--mock-engine`)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::domain::ports::EngineRpc;
use crate::error::{Error, Result};

use super::params::{BdevQosParams, BDEV_SET_QOS_LIMIT};

/// How the mock engine answers calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answer with success (`true` unless a response is set)
    #[default]
    Apply,
    /// Answer with `false`
    Refuse,
    /// Fail as if the socket could not be reached
    Unreachable,
}

/// A call received by the mock engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

/// In-memory engine implementing [`EngineRpc`].
#[derive(Debug, Default)]
pub struct MockEngine {
    behavior: RwLock<MockBehavior>,
    response: RwLock<Option<Value>>,
    latency: RwLock<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockEngine {
    /// Create a mock engine that applies every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine with the given behavior.
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let engine = Self::default();
        engine.set_behavior(behavior);
        engine
    }

    /// Change how subsequent calls are answered.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Answer successful calls with `value` instead of `true`.
    pub fn set_response(&self, value: Value) {
        *self.response.write() = Some(value);
    }

    /// Delay every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Decoded parameters of every `bdev_set_qos_limit` call.
    pub fn qos_calls(&self) -> Vec<BdevQosParams> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == BDEV_SET_QOS_LIMIT)
            .filter_map(|c| serde_json::from_value(c.params.clone()).ok())
            .collect()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of calls currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }
}

// Decrements the in-flight count when a call finishes or is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineRpc for MockEngine {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.calls.lock().push(RecordedCall {
            method: method.to_string(),
            params,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let in_flight = InFlight(&self.in_flight);

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        drop(in_flight);

        let behavior = *self.behavior.read();
        match behavior {
            MockBehavior::Apply => Ok(self
                .response
                .read()
                .clone()
                .unwrap_or(Value::Bool(true))),
            MockBehavior::Refuse => Ok(Value::Bool(false)),
            MockBehavior::Unreachable => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock engine unreachable",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_records_calls() {
        let engine = MockEngine::new();
        let result = engine
            .call("bdev_get_bdevs", serde_json::json!({"name": "Malloc0"}))
            .await
            .unwrap();

        assert_eq!(result, Value::Bool(true));
        assert_eq!(engine.call_count(), 1);
        assert_eq!(engine.calls()[0].method, "bdev_get_bdevs");

        engine.reset();
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_behaviors() {
        let engine = MockEngine::with_behavior(MockBehavior::Refuse);
        assert_eq!(
            engine.call("m", Value::Null).await.unwrap(),
            Value::Bool(false)
        );

        engine.set_behavior(MockBehavior::Unreachable);
        assert!(engine.call("m", Value::Null).await.is_err());
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_qos_calls_decoded() {
        let engine = MockEngine::new();
        let params = BdevQosParams {
            name: "Malloc0".into(),
            rw_ios_per_sec: 1000,
            ..Default::default()
        };
        engine
            .call(BDEV_SET_QOS_LIMIT, serde_json::to_value(&params).unwrap())
            .await
            .unwrap();
        engine.call("other", Value::Null).await.unwrap();

        assert_eq!(engine.qos_calls(), vec![params]);
    }

    #[tokio::test]
    async fn test_cancelled_call_not_counted_in_flight() {
        let engine = MockEngine::new();
        engine.set_latency(Duration::from_secs(5));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), engine.call("m", Value::Null)).await;
        assert!(cancelled.is_err());
        assert_eq!(engine.in_flight(), 0);

        engine.set_latency(Duration::ZERO);
        engine.reset();
        engine.call("m", Value::Null).await.unwrap();
        assert_eq!(engine.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_tracks_concurrency() {
        let engine = Arc::new(MockEngine::new());
        engine.set_latency(Duration::from_millis(50));

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.call("m", Value::Null).await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.call("m", Value::Null).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(engine.max_in_flight(), 2);
    }
}
