// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! `containariumd`: the API surface binary (C8, spec.md §4.8). Builds one
//! shared [`ApiContext`] and serves it over both tonic (gRPC) and axum
//! (HTTP+JSON+WebSocket), refusing to start if the hypervisor daemon is
//! below the minimum supported API version.

use std::sync::Arc;
use std::time::Instant;

use containarium_api::config;
use containarium_api::context::ApiContext;
use containarium_appmanager::AppManager;
use containarium_buildpacks::BuildpackRegistry;
use containarium_containers::{AptBootstrapAdapter, ContainerManager};
use containarium_core::SystemClock;
use containarium_hypervisor::{HypervisorClient, LxdClient};
use containarium_jumphost::SystemHostAccountAdapter;
use containarium_proxy::{HttpProxyAdmin, ProxyController};
use containarium_store::{connect, run_migrations, PgAppStore, PgCollaboratorStore, PgDaemonConfigStore, PgRouteStore};
use containarium_wire::ContainariumServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let hypervisor: Arc<dyn HypervisorClient> = Arc::new(LxdClient::new(config::lxd_socket_path()));
    match hypervisor.check_daemon_version().await {
        Ok(containarium_hypervisor::VersionCheck::Ok) => {}
        Ok(containarium_hypervisor::VersionCheck::UnknownButNewer(v)) => {
            tracing::warn!(version = %v, "hypervisor reports a newer API version than this build has seen tested");
        }
        Err(e) => {
            tracing::error!(error = %e, "hypervisor API version check failed; refusing to start");
            return Err(Box::new(e));
        }
    }

    let database_url = config::database_url().ok_or("CONTAINARIUM_DATABASE_URL must be set")?;
    let pool = connect(&database_url, config::database_max_connections()).await?;
    run_migrations(&pool).await?;

    let base_domain = config::base_domain().ok_or("CONTAINARIUM_BASE_DOMAIN must be set")?;

    let host_accounts = Arc::new(SystemHostAccountAdapter);
    let bootstrap = Arc::new(AptBootstrapAdapter);
    let containers = Arc::new(ContainerManager::new(hypervisor.clone(), host_accounts, bootstrap));

    let proxy_admin = Arc::new(HttpProxyAdmin::new(config::proxy_admin_url()));
    let proxy = Arc::new(ProxyController::new(proxy_admin));

    let apps_store = Arc::new(PgAppStore::new(pool.clone()));
    let buildpacks = Arc::new(BuildpackRegistry::default());
    let apps = Arc::new(AppManager::new(apps_store, hypervisor.clone(), proxy.clone(), buildpacks, SystemClock, base_domain.clone()));

    let ctx = ApiContext {
        hypervisor,
        containers,
        apps,
        proxy,
        collaborators: Arc::new(PgCollaboratorStore::new(pool.clone())),
        routes: Arc::new(PgRouteStore::new(pool.clone())),
        daemon_config: Arc::new(PgDaemonConfigStore::new(pool)),
        jwt_secret: Arc::new(config::jwt_secret(None)),
        base_domain: Arc::new(base_domain),
        start_time: Instant::now(),
    };

    let rpc_addr: std::net::SocketAddr = config::rpc_addr().parse()?;
    let http_addr = config::http_addr();

    let grpc_ctx = ctx.clone();
    let grpc_server = tonic::transport::Server::builder().add_service(ContainariumServer::new(grpc_ctx)).serve(rpc_addr);

    let http_router = containarium_api::http::router(ctx);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, http_router);

    tracing::info!(%rpc_addr, %http_addr, "containariumd listening");

    tokio::select! {
        result = grpc_server => result.map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?,
        result = http_server => result.map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(drain_timeout = ?config::shutdown_drain_timeout(), "shutdown signal received, draining");
        }
    }

    Ok(())
}
