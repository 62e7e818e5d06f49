// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The API surface (C8, spec.md §4.8): one in-process implementation of
//! every RPC, served over both gRPC (tonic) and HTTP+JSON+WebSocket
//! (axum), so there is exactly one authoritative place per operation.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod grpc;
pub mod http;
pub mod ws_terminal;

pub use context::ApiContext;
pub use error::ApiError;
