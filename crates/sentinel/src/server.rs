// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Two kinds of listener the sentinel runs itself, as opposed to the NAT
//! passthroughs it programs for the backend (spec.md §4.9, §6):
//!
//! - the binary server (fixed port, default 8888): serves the worker
//!   binary plus a JSON `/status` endpoint, always up regardless of mode.
//! - the MAINTENANCE branded-page listeners (HTTP + HTTPS): only bound
//!   while the sentinel is in MAINTENANCE mode, torn down on return to
//!   PROXY.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::certs::CertCache;
use crate::mode::{Mode, ModeController};

/// Counters surfaced on `/status`, updated by the mode controller's
/// subscribers elsewhere.
#[derive(Default)]
pub struct SentinelStats {
    pub preemption_count: AtomicU64,
    pub last_preemption_epoch_ms: AtomicU64,
}

#[derive(Clone)]
struct BinaryServerState<C: containarium_core::Clock> {
    mode: Arc<ModeController<C>>,
    stats: Arc<SentinelStats>,
    certs: Arc<CertCache>,
    worker_binary_path: Option<std::path::PathBuf>,
    started_epoch_ms: u64,
    clock: C,
}

#[derive(Serialize)]
struct StatusResponse {
    mode: Mode,
    uptime_ms: u64,
    cert_cache_size: usize,
    preemption_count: u64,
    last_preemption_epoch_ms: u64,
}

pub async fn run_binary_server<C: containarium_core::Clock + 'static>(
    addr: SocketAddr,
    mode: Arc<ModeController<C>>,
    stats: Arc<SentinelStats>,
    certs: Arc<CertCache>,
    worker_binary_path: Option<std::path::PathBuf>,
    clock: C,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let started_epoch_ms = clock.epoch_ms();
    let state = BinaryServerState { mode, stats, certs, worker_binary_path, started_epoch_ms, clock };
    let router = Router::new().route("/status", get(status::<C>)).route("/worker", get(worker_binary::<C>)).with_state(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "sentinel binary server listening");
    axum::serve(listener, router).with_graceful_shutdown(async move { cancel.cancelled().await }).await
}

async fn status<C: containarium_core::Clock + 'static>(axum::extract::State(state): axum::extract::State<BinaryServerState<C>>) -> Response {
    let body = StatusResponse {
        mode: state.mode.current(),
        uptime_ms: state.clock.epoch_ms().saturating_sub(state.started_epoch_ms),
        cert_cache_size: state.certs.len(),
        preemption_count: state.stats.preemption_count.load(Ordering::Relaxed),
        last_preemption_epoch_ms: state.stats.last_preemption_epoch_ms.load(Ordering::Relaxed),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn worker_binary<C: containarium_core::Clock + 'static>(axum::extract::State(state): axum::extract::State<BinaryServerState<C>>) -> Response {
    let Some(path) = &state.worker_binary_path else {
        return (StatusCode::NOT_FOUND, "no worker binary configured").into_response();
    };
    match tokio::fs::read(path).await {
        Ok(bytes) => (StatusCode::OK, [("content-type", "application/octet-stream")], Bytes::from(bytes)).into_response(),
        Err(e) => {
            error!(error = %e, path = %path.display(), "failed to read worker binary");
            (StatusCode::INTERNAL_SERVER_ERROR, "worker binary unavailable").into_response()
        }
    }
}

const MAINTENANCE_BODY: &str = "<html><body><h1>503 Service Unavailable</h1><p>This service is temporarily in maintenance. It will return shortly.</p></body></html>";

fn maintenance_http_response() -> Vec<u8> {
    format!(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        MAINTENANCE_BODY.len(),
        MAINTENANCE_BODY
    )
    .into_bytes()
}

/// Plain-HTTP maintenance listener: every connection gets a branded 503
/// regardless of the request it sent.
pub async fn run_maintenance_http(addr: SocketAddr, cancel: CancellationToken) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "maintenance HTTP listener bound");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                let (mut stream, peer) = accepted?;
                tokio::spawn(async move {
                    if let Err(e) = stream.write_all(&maintenance_http_response()).await {
                        debug!(%peer, error = %e, "maintenance HTTP write failed");
                    }
                    let _ = stream.shutdown().await;
                });
            }
        }
    }
    Ok(())
}

/// TLS maintenance listener: terminates TLS with a per-SNI certificate from
/// `certs`, then serves the same branded 503 page.
pub async fn run_maintenance_https(addr: SocketAddr, certs: Arc<CertCache>, cancel: CancellationToken) -> std::io::Result<()> {
    let server_config = rustls::ServerConfig::builder().with_no_client_auth().with_cert_resolver(certs);
    let acceptor = TlsAcceptor::from(Arc::new(server_config));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "maintenance HTTPS listener bound");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    match acceptor.accept(stream).await {
                        Ok(mut tls_stream) => {
                            if let Err(e) = tls_stream.write_all(&maintenance_http_response()).await {
                                debug!(%peer, error = %e, "maintenance HTTPS write failed");
                            }
                            let _ = tls_stream.shutdown().await;
                        }
                        Err(e) => debug!(%peer, error = %e, "TLS handshake failed on maintenance HTTPS listener"),
                    }
                });
            }
        }
    }
    Ok(())
}
