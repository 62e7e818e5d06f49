// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Wire types shared by the gRPC service and the HTTP gateway (spec.md
//! §4.8: "a gateway translates HTTP requests into the RPC handlers so
//! there is a single authoritative implementation"). Generated from
//! `proto/containarium.proto`; [`convert`] maps these onto
//! `containarium-core`'s domain types at the boundary.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod convert;

pub mod proto {
    tonic::include_proto!("containarium.v1");
}

pub use proto::containarium_client::ContainariumClient;
pub use proto::containarium_server::{Containarium, ContainariumServer};
pub use proto::*;
