// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppManagerError {
    #[error("invalid application name {0:?}")]
    InvalidName(String),

    #[error("invalid environment variable key {0:?}")]
    InvalidEnvKey(String),

    #[error("source tarball is {actual} bytes, exceeding the {cap} byte limit")]
    SourceTooLarge { actual: u64, cap: u64 },

    #[error("owner container is not running")]
    OwnerContainerNotRunning,

    #[error("a build is already in flight for {0}")]
    BuildInProgress(String),

    #[error("application {0}/{1} not found")]
    NotFound(String, String),

    #[error("application {0}/{1} already exists")]
    AlreadyExists(String, String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error(transparent)]
    Buildpack(#[from] containarium_buildpacks::BuildpackError),

    #[error(transparent)]
    Hypervisor(#[from] containarium_hypervisor::HypervisorError),

    #[error(transparent)]
    Proxy(#[from] containarium_proxy::ProxyError),

    #[error(transparent)]
    Store(#[from] containarium_store::StoreError),

    #[error(transparent)]
    Core(#[from] containarium_core::Error),
}

impl From<AppManagerError> for containarium_core::Error {
    fn from(e: AppManagerError) -> Self {
        use containarium_core::ErrorKind as K;
        match e {
            AppManagerError::Buildpack(inner) => inner.into(),
            AppManagerError::Hypervisor(inner) => inner.into(),
            AppManagerError::Proxy(inner) => inner.into(),
            AppManagerError::Store(inner) => inner.into(),
            AppManagerError::Core(inner) => inner,
            AppManagerError::InvalidName(ref m) | AppManagerError::InvalidEnvKey(ref m) => {
                containarium_core::Error::new(K::InvalidArgument, m.clone())
            }
            AppManagerError::SourceTooLarge { .. } => containarium_core::Error::new(K::ResourceExhausted, e.to_string()),
            AppManagerError::OwnerContainerNotRunning => containarium_core::Error::new(K::FailedPrecondition, e.to_string()),
            AppManagerError::BuildInProgress(ref m) => containarium_core::Error::new(K::Conflict, m.clone()),
            AppManagerError::NotFound(..) => containarium_core::Error::new(K::NotFound, e.to_string()),
            AppManagerError::AlreadyExists(..) => containarium_core::Error::new(K::AlreadyExists, e.to_string()),
            AppManagerError::BuildFailed(ref m) => containarium_core::Error::new(K::Internal, m.clone()),
        }
    }
}
