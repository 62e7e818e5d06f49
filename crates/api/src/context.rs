// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The shared handler context: every gRPC and HTTP handler closes over
//! one `ApiContext`, grounded on the teacher's `ListenCtx` (a single
//! struct of shared collaborators handed to every connection handler
//! regardless of transport).

use std::sync::Arc;
use std::time::Instant;

use containarium_appmanager::AppManager;
use containarium_containers::ContainerManager;
use containarium_core::SystemClock;
use containarium_hypervisor::HypervisorClient;
use containarium_proxy::ProxyController;
use containarium_store::{CollaboratorStore, DaemonConfigStore, RouteStore};

#[derive(Clone)]
pub struct ApiContext {
    pub hypervisor: Arc<dyn HypervisorClient>,
    pub containers: Arc<ContainerManager>,
    pub apps: Arc<AppManager<SystemClock>>,
    pub proxy: Arc<ProxyController>,
    pub collaborators: Arc<dyn CollaboratorStore>,
    pub routes: Arc<dyn RouteStore>,
    pub daemon_config: Arc<dyn DaemonConfigStore>,
    pub jwt_secret: Arc<String>,
    pub base_domain: Arc<String>,
    pub start_time: Instant,
}

impl ApiContext {
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
