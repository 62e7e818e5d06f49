// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Centralized environment variable access for the API surface (spec.md
//! §6: "Configuration precedence (JWT secret)").

use std::path::PathBuf;
use std::time::Duration;

/// RPC (tonic) listen address, default `0.0.0.0:50051` (spec.md §6).
pub fn rpc_addr() -> String {
    std::env::var("CONTAINARIUM_RPC_ADDR").unwrap_or_else(|_| "0.0.0.0:50051".to_string())
}

/// HTTP (axum) listen address, default `0.0.0.0:8080` (spec.md §6).
pub fn http_addr() -> String {
    std::env::var("CONTAINARIUM_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn database_url() -> Option<String> {
    std::env::var("CONTAINARIUM_DATABASE_URL").ok().filter(|s| !s.is_empty())
}

pub fn proxy_admin_url() -> String {
    std::env::var("CONTAINARIUM_PROXY_ADMIN_URL").unwrap_or_else(|_| "http://127.0.0.1:2019".to_string())
}

pub fn base_domain() -> Option<String> {
    std::env::var("CONTAINARIUM_BASE_DOMAIN").ok().filter(|s| !s.is_empty())
}

pub fn is_development() -> bool {
    std::env::var("ENVIRONMENT").map(|v| v.eq_ignore_ascii_case("development")).unwrap_or(false)
}

/// mTLS CA bundle path, when mTLS client-certificate verification is enabled.
pub fn mtls_ca_path() -> Option<PathBuf> {
    std::env::var("CONTAINARIUM_MTLS_CA").ok().map(PathBuf::from)
}

pub fn mtls_cert_path() -> Option<PathBuf> {
    std::env::var("CONTAINARIUM_MTLS_CERT").ok().map(PathBuf::from)
}

pub fn mtls_key_path() -> Option<PathBuf> {
    std::env::var("CONTAINARIUM_MTLS_KEY").ok().map(PathBuf::from)
}

/// JWT signing secret, resolved in the exact order spec.md §6 names: env
/// var, then secret file, then CLI flag, then an auto-generated random
/// value (logged only under `ENVIRONMENT=development`, per §4.8).
pub fn jwt_secret(cli_flag: Option<&str>) -> String {
    if let Ok(secret) = std::env::var("CONTAINARIUM_JWT_SECRET") {
        if !secret.is_empty() {
            return secret;
        }
    }
    if let Ok(path) = std::env::var("CONTAINARIUM_JWT_SECRET_FILE") {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if let Some(flag) = cli_flag {
        if !flag.is_empty() {
            return flag.to_string();
        }
    }
    let generated = generate_dev_secret();
    if is_development() {
        tracing::warn!(secret = %generated, "no JWT secret configured; generated a random development-only secret");
    } else {
        tracing::warn!("no JWT secret configured; generated a random secret for this process lifetime only");
    }
    generated
}

fn generate_dev_secret() -> String {
    nanoid::nanoid!(48)
}

pub fn max_tarball_bytes() -> u64 {
    std::env::var("CONTAINARIUM_MAX_TARBALL_BYTES").ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(containarium_appmanager::DEFAULT_MAX_TARBALL_BYTES)
}

pub fn shutdown_drain_timeout() -> Duration {
    std::env::var("CONTAINARIUM_DRAIN_TIMEOUT_MS").ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis).unwrap_or(Duration::from_secs(10))
}

/// LXD's local REST API is reached over a Unix socket, never TCP (spec.md §4.1).
pub fn lxd_socket_path() -> PathBuf {
    std::env::var("CONTAINARIUM_LXD_SOCKET").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/var/lib/lxd/unix.socket"))
}

pub fn database_max_connections() -> u32 {
    std::env::var("CONTAINARIUM_DATABASE_MAX_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(10)
}
