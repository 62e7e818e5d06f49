// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! C2: the jump-host account syncer.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod host_account;
pub mod sync;

pub use error::JumphostError;
pub use host_account::{HostAccountAdapter, SystemHostAccountAdapter};
pub use sync::{AccountSyncer, SyncReport};
