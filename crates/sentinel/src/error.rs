// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("iptables invocation failed: {0}")]
    Nat(String),

    #[error("cert sync request failed: {0}")]
    CertSync(#[from] reqwest::Error),

    #[error("invalid certificate or key material for {host}: {reason}")]
    InvalidCert { host: String, reason: String },

    #[error("self-signed fallback certificate generation failed: {0}")]
    SelfSigned(String),

    #[error("tls server configuration failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
