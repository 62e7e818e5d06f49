// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerManagerError {
    #[error("invalid username {0:?}")]
    InvalidUsername(String),

    #[error("container for owner {0} already exists")]
    AlreadyExists(String),

    #[error("container for owner {0} not found")]
    NotFound(String),

    #[error("container for owner {0} is running; pass force to delete")]
    RunningWithoutForce(String),

    #[error("bootstrap timed out waiting for an interior IPv4 address")]
    NetworkTimeout,

    #[error(transparent)]
    Hypervisor(#[from] containarium_hypervisor::HypervisorError),

    #[error(transparent)]
    Jumphost(#[from] containarium_jumphost::JumphostError),

    #[error(transparent)]
    Core(#[from] containarium_core::Error),
}

impl From<ContainerManagerError> for containarium_core::Error {
    fn from(e: ContainerManagerError) -> Self {
        use containarium_core::ErrorKind as K;
        match e {
            ContainerManagerError::Hypervisor(inner) => inner.into(),
            ContainerManagerError::Jumphost(inner) => inner.into(),
            ContainerManagerError::Core(inner) => inner,
            ContainerManagerError::InvalidUsername(ref m) => containarium_core::Error::new(K::InvalidArgument, m.clone()),
            ContainerManagerError::AlreadyExists(ref m) => containarium_core::Error::new(K::AlreadyExists, m.clone()),
            ContainerManagerError::NotFound(ref m) => containarium_core::Error::new(K::NotFound, m.clone()),
            ContainerManagerError::RunningWithoutForce(ref m) => containarium_core::Error::new(K::FailedPrecondition, m.clone()),
            ContainerManagerError::NetworkTimeout => containarium_core::Error::new(K::DeadlineExceeded, e.to_string()),
        }
    }
}
