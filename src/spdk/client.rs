//! SPDK JSON-RPC Client
//!
//! Speaks JSON-RPC 2.0 to the engine's control socket. Each call opens its
//! own connection, writes one request and reads until a complete response
//! object has arrived; the engine does not delimit messages.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::ports::EngineRpc;
use crate::error::{Error, Result};

/// Configuration for the engine client
#[derive(Debug, Clone)]
pub struct SpdkClientConfig {
    /// Unix socket path, or `host:port` for TCP
    pub address: String,

    /// Upper bound for connect + request + response
    pub timeout: Duration,
}

impl Default for SpdkClientConfig {
    fn default() -> Self {
        Self {
            address: "/var/tmp/spdk.sock".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    fn parse(address: &str) -> Result<Self> {
        if address.is_empty() {
            return Err(Error::Config("engine address cannot be empty".into()));
        }
        if address.contains('/') {
            Ok(Endpoint::Unix(PathBuf::from(address)))
        } else if address.contains(':') {
            Ok(Endpoint::Tcp(address.to_string()))
        } else {
            Err(Error::Config(format!(
                "engine address {} is neither a socket path nor host:port",
                address
            )))
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client for the SPDK control socket
#[derive(Debug)]
pub struct SpdkJsonRpcClient {
    config: SpdkClientConfig,
    endpoint: Endpoint,
    next_id: AtomicU64,
}

impl SpdkJsonRpcClient {
    /// Create a client. Nothing is connected until the first call.
    pub fn new(config: SpdkClientConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.address)?;
        Ok(Self {
            config,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    /// Configured engine address
    pub fn address(&self) -> &str {
        &self.config.address
    }

    async fn send(&self, payload: &[u8]) -> Result<JsonRpcResponse> {
        match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                exchange(stream, payload).await
            }
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(Error::Config(format!(
                "unix sockets are not supported on this platform: {}",
                path.display()
            ))),
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                exchange(stream, payload).await
            }
        }
    }
}

async fn exchange<S>(mut stream: S, payload: &[u8]) -> Result<JsonRpcResponse>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(payload).await?;
    stream.flush().await?;

    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::Internal(
                "engine closed the connection before a complete response".into(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut responses = serde_json::Deserializer::from_slice(&buf).into_iter::<JsonRpcResponse>();
        match responses.next() {
            Some(Ok(response)) => return Ok(response),
            Some(Err(e)) if e.is_eof() => continue,
            Some(Err(e)) => return Err(e.into()),
            None => continue,
        }
    }
}

#[async_trait]
impl EngineRpc for SpdkJsonRpcClient {
    #[instrument(skip(self, params), fields(address = %self.config.address))]
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let payload = serde_json::to_vec(&request)?;
        debug!(id, method, "Sending engine request");

        let response = timeout(self.config.timeout, self.send(&payload))
            .await
            .map_err(|_| {
                warn!(id, method, "Engine call timed out");
                Error::Internal(format!(
                    "engine call timed out after {:?}",
                    self.config.timeout
                ))
            })??;

        if response.id != Some(id) {
            return Err(Error::Internal(format!(
                "engine response id {:?} does not match request id {}",
                response.id, id
            )));
        }
        if let Some(err) = response.error {
            return Err(Error::Internal(format!(
                "engine error {}: {}",
                err.code, err.message
            )));
        }
        response
            .result
            .ok_or_else(|| Error::Internal("engine response has neither result nor error".into()))
    }
}
