//! Storage Bridge
//!
//! Daemon and command-line front end for the storage bridge.
//!
//! # Commands
//!
//! ```text
//! storage-bridge serve     apply a QoS manifest, serve health and metrics
//! storage-bridge listener  print the nvmf_subsystem_add_listener request for a controller
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args as ClapArgs, Parser, Subcommand};
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_bridge::domain::ports::{EngineRpc, NvmeTransport};
use storage_bridge::manifest::{self, Manifest};
use storage_bridge::spdk::{
    MockEngine, SpdkClientConfig, SpdkJsonRpcClient, NVMF_SUBSYSTEM_ADD_LISTENER,
};
use storage_bridge::{
    metrics, NvmeController, NvmeSubsystem, PcieId, QosVolumeManager, VfiouserTransport,
    VolumeRegistry,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Storage Bridge - QoS volumes and NVMe transports for SPDK
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a QoS manifest and serve health and metrics endpoints
    Serve(ServeArgs),
    /// Print the engine request that adds a vfio-user listener for a controller
    Listener(ListenerArgs),
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// SPDK JSON-RPC socket path, or host:port
    #[arg(long, env = "SPDK_ADDR", default_value = "/var/tmp/spdk.sock")]
    spdk_addr: String,

    /// Timeout for a single engine call in seconds
    #[arg(long, env = "SPDK_TIMEOUT_SECONDS", default_value = "30")]
    spdk_timeout_seconds: u64,

    /// Use an in-memory engine instead of SPDK (dry run)
    #[arg(long, env = "MOCK_ENGINE")]
    mock_engine: bool,

    /// YAML manifest of QoS volumes to apply at startup
    #[arg(long, env = "QOS_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Base directory for vfio-user controller sockets. `serve` only checks
    /// that it is an existing directory at startup; use `listener` to build
    /// listener parameters from it.
    #[arg(long, env = "CTRLR_DIR")]
    ctrlr_dir: Option<PathBuf>,

    /// Clear the limits of every registered QoS volume on shutdown
    #[arg(long, env = "CLEAR_ON_EXIT")]
    clear_on_exit: bool,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,
}

#[derive(ClapArgs, Debug)]
struct ListenerArgs {
    /// Base directory for vfio-user controller sockets
    #[arg(long, env = "CTRLR_DIR")]
    ctrlr_dir: PathBuf,

    /// Controller resource name, e.g. //storage.opiproject.org/subsystems/s0/controllers/c0
    #[arg(long)]
    controller: String,

    /// NQN of the owning subsystem
    #[arg(long)]
    nqn: String,

    /// Host NQN restriction of the owning subsystem
    #[arg(long, default_value = "")]
    hostnqn: String,

    /// PCIe port id of the controller
    #[arg(long, default_value = "0")]
    port_id: i32,

    /// PCIe physical function of the controller
    #[arg(long, default_value = "0")]
    physical_function: i32,

    /// PCIe virtual function of the controller
    #[arg(long, default_value = "0")]
    virtual_function: i32,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Listener(listener_args) => print_listener(listener_args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting Storage Bridge");
    info!("  Mock engine: {}", args.mock_engine);
    info!("  Clear on exit: {}", args.clear_on_exit);

    if let Some(dir) = &args.ctrlr_dir {
        let transport =
            VfiouserTransport::new(dir).context("invalid vfio-user controller directory")?;
        info!("  Controller directory: {}", transport.ctrlr_dir().display());
    }

    let engine: Arc<dyn EngineRpc> = if args.mock_engine {
        Arc::new(MockEngine::new())
    } else {
        let client = SpdkJsonRpcClient::new(SpdkClientConfig {
            address: args.spdk_addr.clone(),
            timeout: Duration::from_secs(args.spdk_timeout_seconds),
        })?;
        info!("  Engine address: {}", client.address());
        Arc::new(client)
    };
    let manager = QosVolumeManager::new(engine, Arc::new(VolumeRegistry::new()));

    if let Some(path) = &args.manifest {
        let qos_manifest = Manifest::load(path)?;
        let report = manifest::apply(&manager, &qos_manifest).await;
        for (id, e) in &report.failed {
            error!(qos_volume_id = %id, code = %e.code(), "QoS volume not applied: {}", e);
        }
    }

    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_http_server(&health_addr, Routes::Health).await {
            error!("Health server error: {:#}", e);
        }
    });

    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_http_server(&metrics_addr, Routes::Metrics).await {
            error!("Metrics server error: {:#}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    if args.clear_on_exit {
        for volume in manager.list_qos_volumes() {
            if let Err(e) = manager
                .delete_qos_volume(&volume.qos_volume_id, true)
                .await
            {
                warn!(qos_volume_id = %volume.qos_volume_id, "Failed to clear QoS volume: {}", e);
            }
        }
    }

    info!("Storage Bridge shutdown complete");
    Ok(())
}

fn print_listener(args: ListenerArgs) -> anyhow::Result<()> {
    let transport = VfiouserTransport::new(&args.ctrlr_dir)?;
    let ctrlr = NvmeController::new(
        args.controller,
        PcieId {
            physical_function: args.physical_function,
            virtual_function: args.virtual_function,
            port_id: args.port_id,
        },
    );
    let subsys = NvmeSubsystem {
        name: String::new(),
        nqn: args.nqn,
        hostnqn: args.hostnqn,
    };

    let params = transport.params(&ctrlr, &subsys)?;
    let request = serde_json::json!({
        "method": NVMF_SUBSYSTEM_ADD_LISTENER,
        "params": serde_json::to_value(&params)?,
    });
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

// =============================================================================
// Health and Metrics Servers
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Routes {
    Health,
    Metrics,
}

fn respond(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

async fn handle(
    routes: Routes,
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match (routes, req.uri().path()) {
        (Routes::Health, "/healthz" | "/livez" | "/readyz") => {
            respond(StatusCode::OK, "text/plain", "ok")
        }
        (Routes::Metrics, "/metrics") => match metrics::render() {
            Ok((content_type, body)) => respond(StatusCode::OK, &content_type, body),
            Err(e) => respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                e.to_string(),
            ),
        },
        _ => respond(StatusCode::NOT_FOUND, "text/plain", "not found"),
    };
    Ok(response)
}

async fn run_http_server(addr: &str, routes: Routes) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid {:?} server address {}", routes, addr))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {:?} server", routes))?;

    info!("{:?} server listening on {}", routes, addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .with_context(|| format!("{:?} server accept error", routes))?;

        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(move |req| handle(routes, req)))
                .await
            {
                error!("{:?} server connection error: {}", routes, e);
            }
        });
    }
}
