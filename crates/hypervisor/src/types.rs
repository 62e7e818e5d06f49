// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Wire DTOs for the hypervisor daemon's REST API. Distinct from
//! `containarium-core`'s domain types: these mirror the daemon's JSON shape
//! (config as a flat string map, devices as a nested map) so (de)serializing
//! never needs a lossy intermediate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CreateContainerRequest {
    pub name: String,
    pub source: ContainerSource,
    pub config: BTreeMap<String, String>,
    pub devices: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerStateResponse {
    pub status: String,
    pub network: Option<BTreeMap<String, NetworkInterface>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInterface {
    pub addresses: Vec<NetworkAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkAddress {
    pub family: String,
    pub address: String,
}

impl ContainerStateResponse {
    /// First IPv4 address on any interface except loopback.
    pub fn first_ipv4(&self) -> Option<std::net::Ipv4Addr> {
        self.network.as_ref()?.iter().filter(|(name, _)| name.as_str() != "lo").find_map(|(_, iface)| {
            iface.addresses.iter().find(|a| a.family == "inet").and_then(|a| a.address.parse().ok())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub status: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecRequest {
    pub command: Vec<String>,
    #[serde(rename = "wait-for-websocket")]
    pub wait_for_websocket: bool,
    pub interactive: bool,
    #[serde(rename = "record-output")]
    pub record_output: bool,
}

impl ExecRequest {
    pub fn new(command: Vec<String>) -> Self {
        Self { command, wait_for_websocket: false, interactive: false, record_output: true }
    }
}

/// Label prefix applied to config keys so labels live in the same
/// namespace the daemon already persists (spec.md §4.3).
pub const LABEL_PREFIX: &str = "containarium.label.";

pub fn label_key(key: &str) -> String {
    format!("{LABEL_PREFIX}{key}")
}

pub fn strip_label_prefix(config_key: &str) -> Option<&str> {
    config_key.strip_prefix(LABEL_PREFIX)
}
