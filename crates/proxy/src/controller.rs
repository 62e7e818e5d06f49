// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Single-writer front-end over [`ProxyAdmin`] (spec.md §4.7: "C7 is the
//! sole writer to the proxy's config"). Every write is serialized through
//! one mutex, and checks `ListRoutes` first so an out-of-band edit is
//! detected and re-PUT rather than silently compounding drift.

use std::collections::BTreeMap;
use std::sync::Arc;

use containarium_core::Route;
use tokio::sync::Mutex;
use tracing::warn;

use crate::client::{ProxyAdmin, RouteSpec};
use crate::error::ProxyError;

pub struct ProxyController {
    admin: Arc<dyn ProxyAdmin>,
    write_lock: Mutex<()>,
}

impl ProxyController {
    pub fn new(admin: Arc<dyn ProxyAdmin>) -> Self {
        Self { admin, write_lock: Mutex::new(()) }
    }

    pub async fn add_route(&self, route: &Route) -> Result<(), ProxyError> {
        let _guard = self.write_lock.lock().await;
        let spec = RouteSpec::from_route(route);
        self.reconcile_locked(&spec).await
    }

    pub async fn delete_route(&self, route_id: &str) -> Result<(), ProxyError> {
        let _guard = self.write_lock.lock().await;
        match self.admin.delete_route(route_id).await {
            Ok(()) | Err(ProxyError::RouteNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn provision_tls(&self, host: &str) -> Result<(), ProxyError> {
        let _guard = self.write_lock.lock().await;
        self.admin.provision_tls(host).await
    }

    pub async fn list_routes(&self) -> Result<Vec<RouteSpec>, ProxyError> {
        self.admin.list_routes().await
    }

    pub async fn setup_port_forwarding(&self, proxy_container_ip: &str) -> Result<(), ProxyError> {
        let _guard = self.write_lock.lock().await;
        self.admin.setup_port_forwarding(proxy_container_ip).await
    }

    /// Re-asserts one route. Called with `write_lock` already held.
    async fn reconcile_locked(&self, want: &RouteSpec) -> Result<(), ProxyError> {
        let current: BTreeMap<String, RouteSpec> = self.admin.list_routes().await?.into_iter().map(|r| (r.route_id.clone(), r)).collect();

        let drifted = match current.get(&want.route_id) {
            Some(have) => have.host != want.host || have.upstream != want.upstream,
            None => true,
        };

        if drifted {
            if current.contains_key(&want.route_id) {
                warn!(route_id = %want.route_id, "proxy route drifted from last-known-good state, re-applying");
            }
            self.admin.add_route(want).await?;
        }
        Ok(())
    }
}
