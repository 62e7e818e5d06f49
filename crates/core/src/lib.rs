// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! containarium-core: domain types shared by every Containarium crate.
//!
//! Pure data and validation — no I/O, no async. Every other crate in the
//! workspace depends on this one; this one depends on nothing in the
//! workspace.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod macros;

pub mod application;
pub mod clock;
pub mod collaborator;
pub mod container;
pub mod daemon_config;
pub mod error;
pub mod id;
pub mod names;
pub mod route;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use application::{Application, ApplicationId, AppState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use collaborator::Collaborator;
pub use container::{Container, ContainerState, ResizeRequest, ResourceCaps};
pub use daemon_config::DaemonConfig;
pub use error::{Error, ErrorKind};
pub use id::short;
pub use names::{is_valid_env_key, is_valid_subdomain_label, is_valid_username};
pub use route::{Route, RouteId};
