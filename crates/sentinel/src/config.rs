// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Centralized environment variable access for the sentinel, following the
//! one-function-per-variable idiom used by `containarium-api::config`.

use std::time::Duration;

/// Internal IP of the backend `containariumd` instance this sentinel fronts.
pub fn backend_ip() -> String {
    std::env::var("SENTINEL_BACKEND_IP").unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// `host:port` probed by the health prober (spec.md §4.9). Defaults to the
/// backend's HTTP port.
pub fn backend_health_addr() -> String {
    std::env::var("SENTINEL_BACKEND_HEALTH_ADDR").unwrap_or_else(|_| format!("{}:8080", backend_ip()))
}

/// Ports DNAT'd to the backend while in PROXY mode. Port 22 is reserved for
/// an SSH-pipe process and is never NAT'd (spec.md §4.9).
pub fn forwarded_ports() -> Vec<u16> {
    std::env::var("SENTINEL_FORWARDED_PORTS")
        .ok()
        .map(|s| s.split(',').filter_map(|p| p.trim().parse().ok()).collect())
        .filter(|v: &Vec<u16>| !v.is_empty())
        .unwrap_or_else(|| vec![80, 443, 8080, 50051])
}

pub fn nat_chain_name() -> String {
    std::env::var("SENTINEL_NAT_CHAIN").unwrap_or_else(|_| "CONTAINARIUM-SENTINEL".to_string())
}

/// Plain-HTTP port serving the MAINTENANCE branded page.
pub fn maintenance_http_port() -> u16 {
    std::env::var("SENTINEL_MAINTENANCE_HTTP_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(80)
}

/// TLS port serving the MAINTENANCE branded page, cert chosen per-SNI.
pub fn maintenance_https_port() -> u16 {
    std::env::var("SENTINEL_MAINTENANCE_HTTPS_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(443)
}

pub fn health_check_interval() -> Duration {
    Duration::from_secs(std::env::var("SENTINEL_CHECK_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(15))
}

pub fn unhealthy_threshold() -> u32 {
    std::env::var("SENTINEL_UNHEALTHY_THRESHOLD").ok().and_then(|s| s.parse().ok()).unwrap_or(2)
}

pub fn healthy_threshold() -> u32 {
    std::env::var("SENTINEL_HEALTHY_THRESHOLD").ok().and_then(|s| s.parse().ok()).unwrap_or(2)
}

/// Logged as a warning when a MAINTENANCE episode runs past this without
/// recovering (spec.md §4.9 recovery timeline contract).
pub fn recovery_timeout() -> Duration {
    Duration::from_secs(std::env::var("SENTINEL_RECOVERY_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(90))
}

/// Backend endpoint returning `[{host, cert_pem, key_pem}, ...]`.
pub fn certs_endpoint_url() -> String {
    std::env::var("SENTINEL_CERTS_URL").unwrap_or_else(|_| format!("http://{}:8080/v1/certs", backend_ip()))
}

pub fn cert_sync_interval() -> Duration {
    Duration::from_secs(std::env::var("SENTINEL_CERT_SYNC_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(6 * 3600))
}

/// Common name baked into the startup self-signed fallback certificate.
pub fn self_signed_common_name() -> String {
    std::env::var("SENTINEL_SELF_SIGNED_CN").unwrap_or_else(|_| "sentinel.local".to_string())
}

/// Cloud preemption-notice endpoint, polled by the event watcher. Defaults
/// to GCP's instance metadata preemption flag.
pub fn preemption_endpoint_url() -> String {
    std::env::var("SENTINEL_PREEMPTION_URL")
        .unwrap_or_else(|_| "http://metadata.google.internal/computeMetadata/v1/instance/preempted".to_string())
}

pub fn preemption_poll_interval() -> Duration {
    Duration::from_secs(std::env::var("SENTINEL_PREEMPTION_POLL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5))
}

/// Binary server port (spec.md §6 network port table): serves the worker
/// binary plus a JSON `/status` endpoint.
pub fn binary_server_port() -> u16 {
    std::env::var("SENTINEL_BINARY_SERVER_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8888)
}

pub fn worker_binary_path() -> Option<std::path::PathBuf> {
    std::env::var("SENTINEL_WORKER_BINARY_PATH").ok().map(std::path::PathBuf::from)
}

/// Attempt to restart/autostart the backend once MAINTENANCE is entered.
pub fn backend_restart_command() -> Option<Vec<String>> {
    std::env::var("SENTINEL_BACKEND_RESTART_CMD").ok().map(|s| s.split_whitespace().map(str::to_string).collect())
}
