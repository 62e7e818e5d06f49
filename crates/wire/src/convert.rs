// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Conversions between the generated protobuf messages and
//! `containarium-core`'s domain types.

use containarium_core::{Application, Collaborator, Container, ResourceCaps, Route, RouteId};

use crate::proto;

impl From<ResourceCaps> for proto::ResourceCaps {
    fn from(r: ResourceCaps) -> Self {
        Self { cpu_cores: r.cpu_cores, memory_bytes: r.memory_bytes, root_disk_bytes: r.root_disk_bytes }
    }
}

impl From<proto::ResourceCaps> for ResourceCaps {
    fn from(r: proto::ResourceCaps) -> Self {
        Self { cpu_cores: r.cpu_cores, memory_bytes: r.memory_bytes, root_disk_bytes: r.root_disk_bytes }
    }
}

impl From<&Container> for proto::Container {
    fn from(c: &Container) -> Self {
        Self {
            name: c.name.clone(),
            owner: c.owner.clone(),
            image: c.image.clone(),
            state: c.state.to_string(),
            resources: Some(c.resources.into()),
            labels: c.labels.clone(),
            auto_start: c.auto_start,
            nested_runtime: c.nested_runtime,
            static_address: c.static_address.map(|ip| ip.to_string()),
        }
    }
}

impl From<&Application> for proto::Application {
    fn from(a: &Application) -> Self {
        Self {
            id: a.id.as_str().to_string(),
            owner: a.owner.clone(),
            name: a.name.clone(),
            sub_domain: a.sub_domain.clone(),
            port: u32::from(a.port),
            state: a.state.to_string(),
            language_fingerprint: a.language_fingerprint.clone(),
            env: a.env.clone(),
            restart_count: a.restart_count,
            created_at_ms: a.created_at_ms,
            updated_at_ms: a.updated_at_ms,
            deployed_at_ms: a.deployed_at_ms,
        }
    }
}

impl From<&Collaborator> for proto::Collaborator {
    fn from(c: &Collaborator) -> Self {
        Self {
            container_name: c.container_name.clone(),
            username: c.username.clone(),
            authorized_key: c.authorized_key.clone(),
            sudo_grant: c.sudo_grant,
            runtime_grant: c.runtime_grant,
            auditor: c.auditor,
        }
    }
}

impl From<&Route> for proto::Route {
    fn from(r: &Route) -> Self {
        Self { id: r.id.to_string(), domain: r.domain.clone(), upstream_host: r.upstream_host.clone(), upstream_port: u32::from(r.upstream_port) }
    }
}

impl proto::PutRouteRequest {
    /// Builds a [`Route`] from the wire request, deriving a stable id from
    /// the target container when one is named, or from the domain
    /// otherwise (spec.md §6: route id is `<owner>-<appname>`, but ad hoc
    /// routes not tied to an application key off the domain instead).
    pub fn into_route(self) -> Route {
        let id = match &self.container {
            Some(container) => RouteId(container.clone()),
            None => RouteId(self.domain.clone()),
        };
        Route::new(id, self.domain, self.target_ip, self.target_port as u16)
    }
}
