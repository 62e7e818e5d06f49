// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Jump-host syncer error taxonomy (spec.md §4.2).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JumphostError {
    #[error("no readable SSH key inside container {0}")]
    KeyUnavailable(String),

    #[error("host account {0} already exists")]
    AccountExists(String),

    #[error("host account {0} not found")]
    AccountNotFound(String),

    #[error("host command {0:?} failed: {1}")]
    CommandFailed(String, String),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hypervisor(#[from] containarium_hypervisor::HypervisorError),
}

impl From<JumphostError> for containarium_core::Error {
    fn from(e: JumphostError) -> Self {
        use containarium_core::ErrorKind as K;
        match e {
            JumphostError::Hypervisor(inner) => containarium_core::Error::from(inner),
            JumphostError::KeyUnavailable(ref msg) => containarium_core::Error::new(K::FailedPrecondition, msg.clone()),
            JumphostError::AccountExists(ref msg) => containarium_core::Error::new(K::AlreadyExists, msg.clone()),
            JumphostError::AccountNotFound(ref msg) => containarium_core::Error::new(K::NotFound, msg.clone()),
            JumphostError::CommandFailed(..) | JumphostError::Io(_) => {
                containarium_core::Error::new(K::Internal, e.to_string())
            }
        }
    }
}
