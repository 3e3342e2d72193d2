//! HTTP endpoint of monitor mode: `/metrics` and `/health`

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Result, ShardlagError};

use super::PassStatus;

/// State shared by the handlers
#[derive(Clone)]
pub struct MonitorServerState {
    pub metrics_handle: PrometheusHandle,
    pub status: Arc<RwLock<PassStatus>>,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    passes: u64,
    consumers: usize,
    failed_consumers: usize,
    last_error: Option<String>,
}

pub fn build_router(state: MonitorServerState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind `addr`, failing with a fix hint when the port is taken
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            ShardlagError::Server(format!(
                "Metrics port {} is already in use. \
                 Fix: Use --metrics-addr 0.0.0.0:{} to pick a different port, \
                 or stop the existing process.",
                addr.port(),
                addr.port().saturating_add(1)
            ))
        } else {
            ShardlagError::Server(format!("Failed to bind metrics server to {}: {}", addr, e))
        }
    })
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: MonitorServerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Serving /metrics and /health");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ShardlagError::Server(format!("Metrics server failed: {}", e)))
}

async fn metrics_handler(State(state): State<MonitorServerState>) -> Response {
    (StatusCode::OK, state.metrics_handle.render()).into_response()
}

async fn health_handler(State(state): State<MonitorServerState>) -> Response {
    let status = state.status.read().await;
    let healthy = status.last_error.is_none();
    let body = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" },
        passes: status.passes,
        consumers: status.consumers,
        failed_consumers: status.failed_consumers,
        last_error: status.last_error.clone(),
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}
