// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! `containarium-sentinel`: the HA front-end process (C9, spec.md §4.9).
//! Owns the NAT chain that fronts one backend `containariumd`, a health
//! prober and a cloud-preemption watcher that both drive a shared mode
//! controller, and the MAINTENANCE-mode branded listeners that take over
//! when the backend is unreachable.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use containarium_core::SystemClock;
use containarium_sentinel::certs::{generate_self_signed, CertCache, CertSyncer};
use containarium_sentinel::config;
use containarium_sentinel::events::{MetadataPreemptionSource, PreemptionWatcher};
use containarium_sentinel::health::HealthProber;
use containarium_sentinel::mode::{Mode, ModeController};
use containarium_sentinel::nat::{IptablesRunner, NatProgrammer};
use containarium_sentinel::server::{run_binary_server, run_maintenance_http, run_maintenance_https, SentinelStats};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    rustls::crypto::ring::default_provider().install_default().map_err(|_| "failed to install rustls crypto provider")?;

    let clock = SystemClock;
    let mode = ModeController::new(clock, Mode::Proxy);
    let stats = Arc::new(SentinelStats::default());

    let backend_ip = config::backend_ip();
    let forwarded_ports = config::forwarded_ports();
    let nat = Arc::new(NatProgrammer::new(Arc::new(IptablesRunner), config::nat_chain_name()));
    nat.enter_proxy_mode(&backend_ip, &forwarded_ports).await?;

    let fallback_cert = generate_self_signed(&config::self_signed_common_name())?;
    let cert_cache = Arc::new(CertCache::new(fallback_cert));
    let (force_sync_tx, force_sync_rx) = mpsc::channel::<()>(1);
    let syncer = CertSyncer::new(config::certs_endpoint_url(), cert_cache.clone());

    let root_cancel = CancellationToken::new();

    let health_prober = HealthProber::new(config::backend_health_addr(), config::health_check_interval(), config::unhealthy_threshold(), config::healthy_threshold(), mode.clone(), clock);
    let preemption_source = Arc::new(MetadataPreemptionSource::new(config::preemption_endpoint_url()));
    let preemption_watcher = PreemptionWatcher::new(preemption_source, config::preemption_poll_interval(), mode.clone(), clock);

    let health_task = tokio::spawn(health_prober.run(root_cancel.clone()));
    let preemption_task = tokio::spawn(preemption_watcher.run(root_cancel.clone()));
    let cert_sync_task = tokio::spawn(syncer.run(config::cert_sync_interval(), force_sync_rx, root_cancel.clone()));

    let binary_server_addr = format!("0.0.0.0:{}", config::binary_server_port()).parse()?;
    let binary_server_task = tokio::spawn(run_binary_server(
        binary_server_addr,
        mode.clone(),
        stats.clone(),
        cert_cache.clone(),
        config::worker_binary_path(),
        clock,
        root_cancel.clone(),
    ));

    let mode_reactor_task = tokio::spawn(run_mode_reactor(mode.clone(), nat.clone(), backend_ip, forwarded_ports, cert_cache, stats, force_sync_tx, root_cancel.clone()));

    tracing::info!("sentinel started in PROXY mode");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    root_cancel.cancel();

    let _ = tokio::join!(health_task, preemption_task, cert_sync_task, binary_server_task, mode_reactor_task);
    Ok(())
}

/// Reacts to mode transitions: reprograms the NAT chain and starts or stops
/// the MAINTENANCE branded listeners. Runs for the process lifetime; its
/// own cancellation tears down whatever listener tasks it currently owns.
#[allow(clippy::too_many_arguments)]
async fn run_mode_reactor(
    mode: Arc<ModeController<SystemClock>>,
    nat: Arc<NatProgrammer>,
    backend_ip: String,
    forwarded_ports: Vec<u16>,
    cert_cache: Arc<CertCache>,
    stats: Arc<SentinelStats>,
    force_sync_tx: mpsc::Sender<()>,
    root_cancel: CancellationToken,
) {
    let mut rx = mode.subscribe();
    let mut maintenance_cancel: Option<CancellationToken> = None;

    loop {
        tokio::select! {
            _ = root_cancel.cancelled() => {
                if let Some(c) = maintenance_cancel.take() {
                    c.cancel();
                }
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let new_mode = *rx.borrow();
                match new_mode {
                    Mode::Maintenance => {
                        stats.preemption_count.fetch_add(1, Ordering::Relaxed);
                        stats.last_preemption_epoch_ms.store(SystemClock.epoch_ms(), Ordering::Relaxed);
                        if let Err(e) = nat.enter_maintenance_mode(&backend_ip).await {
                            tracing::error!(error = %e, "failed to clear NAT chain entering MAINTENANCE");
                        }
                        let cancel = CancellationToken::new();
                        maintenance_cancel = Some(cancel.clone());
                        let addrs: Result<(std::net::SocketAddr, std::net::SocketAddr), std::net::AddrParseError> = (|| {
                            Ok((format!("0.0.0.0:{}", config::maintenance_http_port()).parse()?, format!("0.0.0.0:{}", config::maintenance_https_port()).parse()?))
                        })();
                        let Ok((http_addr, https_addr)) = addrs else {
                            tracing::error!("invalid maintenance listener port configuration");
                            continue;
                        };
                        let certs = cert_cache.clone();
                        let http_cancel = cancel.clone();
                        tokio::spawn(async move {
                            if let Err(e) = run_maintenance_http(http_addr, http_cancel).await {
                                tracing::error!(error = %e, "maintenance HTTP listener exited");
                            }
                        });
                        tokio::spawn(async move {
                            if let Err(e) = run_maintenance_https(https_addr, certs, cancel).await {
                                tracing::error!(error = %e, "maintenance HTTPS listener exited");
                            }
                        });
                        if let Some(cmd) = config::backend_restart_command() {
                            tokio::spawn(async move {
                                let Some((program, args)) = cmd.split_first() else { return };
                                match tokio::process::Command::new(program).args(args).status().await {
                                    Ok(status) => tracing::info!(%status, "backend restart command invoked"),
                                    Err(e) => tracing::error!(error = %e, "failed to invoke backend restart command"),
                                }
                            });
                        }
                    }
                    Mode::Proxy => {
                        if let Some(c) = maintenance_cancel.take() {
                            c.cancel();
                        }
                        if let Err(e) = nat.enter_proxy_mode(&backend_ip, &forwarded_ports).await {
                            tracing::error!(error = %e, "failed to program NAT chain entering PROXY");
                        }
                        let _ = force_sync_tx.send(()).await;
                    }
                }
            }
        }
    }
}
