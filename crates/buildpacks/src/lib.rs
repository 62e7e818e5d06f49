// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! C4: the buildpack registry.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod buildpack;
pub mod error;
pub mod registry;
pub mod source_tree;
pub mod spec;

pub use buildpack::Buildpack;
pub use error::BuildpackError;
pub use registry::{BuildpackRegistry, DEFAULT_SOURCE_SIZE_CAP_BYTES};
pub use source_tree::{FsSourceTree, MemorySourceTree, SourceTree};
pub use spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};
