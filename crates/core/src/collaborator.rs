// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Collaborator domain type (spec.md §3): a second SSH-able user on a
//! container, with independently grantable sudo/runtime/auditor flags.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub container_name: String,
    pub username: String,
    pub authorized_key: String,
    pub sudo_grant: bool,
    pub runtime_grant: bool,
    pub auditor: bool,
}

impl Collaborator {
    pub fn new(container_name: impl Into<String>, username: impl Into<String>, authorized_key: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            username: username.into(),
            authorized_key: authorized_key.into(),
            sudo_grant: false,
            runtime_grant: false,
            auditor: false,
        }
    }
}
