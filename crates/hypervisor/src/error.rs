// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Hypervisor client error taxonomy (spec.md §4.1: "distinguish NotFound,
//! AlreadyExists, Conflict, Unavailable, Internal").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HypervisorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("hypervisor daemon unavailable: {0}")]
    Unavailable(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<HypervisorError> for containarium_core::Error {
    fn from(e: HypervisorError) -> Self {
        use containarium_core::ErrorKind as K;
        let kind = match &e {
            HypervisorError::NotFound(_) => K::NotFound,
            HypervisorError::AlreadyExists(_) => K::AlreadyExists,
            HypervisorError::Conflict(_) => K::Conflict,
            HypervisorError::Unavailable(_) => K::Unavailable,
            HypervisorError::Timeout(_) => K::DeadlineExceeded,
            HypervisorError::Internal(_) => K::Internal,
        };
        containarium_core::Error::new(kind, e.to_string())
    }
}

impl From<std::io::Error> for HypervisorError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                HypervisorError::Unavailable(e.to_string())
            }
            std::io::ErrorKind::TimedOut => HypervisorError::Timeout(e.to_string()),
            _ => HypervisorError::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for HypervisorError {
    fn from(e: serde_json::Error) -> Self {
        HypervisorError::Internal(format!("malformed daemon response: {e}"))
    }
}
