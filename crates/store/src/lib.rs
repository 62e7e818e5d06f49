// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! containarium-store: the Postgres-backed app store (spec.md §4.5, §6).
//!
//! Every table's row is either a denormalized index over an authoritative
//! `data` JSON snapshot (apps) or a thin relational mapping with no nested
//! structure (collaborators, routes, daemon_config).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod apps;
pub mod collaborators;
pub mod daemon_config;
pub mod error;
pub mod pool;
pub mod routes;

pub use apps::{AppStore, PgAppStore};
pub use collaborators::{CollaboratorStore, PgCollaboratorStore};
pub use daemon_config::{DaemonConfigStore, PgDaemonConfigStore};
pub use error::{map_unique_violation, StoreError};
pub use pool::{connect, run_migrations};
pub use routes::{PgRouteStore, RouteStore};
