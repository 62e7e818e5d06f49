// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("route not found: {0}")]
    RouteNotFound(String),

    #[error("proxy admin API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("proxy admin API returned {status}: {body}")]
    BadResponse { status: u16, body: String },
}

impl From<ProxyError> for containarium_core::Error {
    fn from(e: ProxyError) -> Self {
        use containarium_core::ErrorKind as K;
        match e {
            ProxyError::RouteNotFound(ref m) => containarium_core::Error::new(K::NotFound, m.clone()),
            ProxyError::Request(_) | ProxyError::BadResponse { .. } => containarium_core::Error::new(K::Unavailable, e.to_string()),
        }
    }
}
