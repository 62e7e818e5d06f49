// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildpackError {
    #[error("no buildpack matched this source tree")]
    NoMatch,

    #[error("source tree is {actual} bytes, exceeding the {cap} byte cap")]
    SourceTooLarge { actual: u64, cap: u64 },

    #[error("malformed user-provided build spec: {0}")]
    MalformedUserSpec(String),
}

impl From<BuildpackError> for containarium_core::Error {
    fn from(e: BuildpackError) -> Self {
        use containarium_core::ErrorKind as K;
        let kind = match &e {
            BuildpackError::NoMatch | BuildpackError::MalformedUserSpec(_) => K::InvalidArgument,
            BuildpackError::SourceTooLarge { .. } => K::ResourceExhausted,
        };
        containarium_core::Error::new(kind, e.to_string())
    }
}
