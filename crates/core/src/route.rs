// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Proxy route domain type (spec.md §3, §4.7).

use serde::{Deserialize, Serialize};

/// `<owner>-<appname>`, stable across redeploys (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteId(pub String);

impl RouteId {
    pub fn for_app(owner: &str, app_name: &str) -> Self {
        Self(crate::names::route_id(owner, app_name))
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `domain -> host:port`, optionally annotated with the owning application
/// (spec.md §3: "at most one active route per domain").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub domain: String,
    pub upstream_host: String,
    pub upstream_port: u16,
    pub app_id: Option<crate::application::ApplicationId>,
}

impl Route {
    pub fn new(id: RouteId, domain: impl Into<String>, upstream_host: impl Into<String>, upstream_port: u16) -> Self {
        Self { id, domain: domain.into(), upstream_host: upstream_host.into(), upstream_port, app_id: None }
    }

    pub fn upstream(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}
