// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The application manager (C6): validates a deploy request, runs it
//! through the pipeline, and implements the lifecycle table from spec.md
//! §4.6 (Stop/Start/Restart/Redeploy/Delete).

use std::collections::HashSet;
use std::sync::Arc;

use containarium_buildpacks::BuildpackRegistry;
use containarium_core::{AppState, Application, Clock};
use containarium_hypervisor::HypervisorClient;
use containarium_proxy::ProxyController;
use containarium_store::AppStore;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::error::AppManagerError;
use crate::logs::BuildLogStore;
use crate::pipeline::{standard_pipeline, DeployCtx, DeployDeps, DeployRequest};

pub const DEFAULT_MAX_TARBALL_BYTES: u64 = 200 * 1024 * 1024;

pub struct AppManager<C: Clock> {
    store: Arc<dyn AppStore>,
    hypervisor: Arc<dyn HypervisorClient>,
    proxy: Arc<ProxyController>,
    buildpacks: Arc<BuildpackRegistry>,
    logs: Arc<BuildLogStore>,
    clock: C,
    in_flight: Mutex<HashSet<String>>,
    base_domain: String,
    max_tarball_bytes: u64,
}

/// Removes the in-flight marker on drop, regardless of which exit path the
/// deploy took (success, pipeline error, or an early validation return).
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

impl<C: Clock + 'static> AppManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn AppStore>,
        hypervisor: Arc<dyn HypervisorClient>,
        proxy: Arc<ProxyController>,
        buildpacks: Arc<BuildpackRegistry>,
        clock: C,
        base_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hypervisor,
            proxy,
            buildpacks,
            logs: Arc::new(BuildLogStore::default()),
            clock,
            in_flight: Mutex::new(HashSet::new()),
            base_domain: base_domain.into(),
            max_tarball_bytes: DEFAULT_MAX_TARBALL_BYTES,
        }
    }

    fn validate(&self, req: &DeployRequest) -> Result<(), AppManagerError> {
        if !containarium_core::is_valid_username(&req.app_name) {
            return Err(AppManagerError::InvalidName(req.app_name.clone()));
        }
        for key in req.env.keys() {
            if !containarium_core::is_valid_env_key(key) {
                return Err(AppManagerError::InvalidEnvKey(key.clone()));
            }
        }
        let size: u64 = req.source_tarball.values().map(|v| v.len() as u64).sum();
        if size > self.max_tarball_bytes {
            return Err(AppManagerError::SourceTooLarge { actual: size, cap: self.max_tarball_bytes });
        }
        Ok(())
    }

    /// Deploy pipeline (spec.md §4.6): at most one in-flight build per
    /// `(owner, name)`; a concurrent attempt returns Conflict rather than
    /// queuing behind the lock, since a second build for the same app
    /// while one is running is never useful.
    #[instrument(skip(self, req), fields(owner = %req.owner, app = %req.app_name))]
    pub async fn deploy(&self, req: DeployRequest) -> Result<Application, AppManagerError> {
        self.validate(&req)?;

        let owner_container = containarium_core::names::container_name(&req.owner);
        if !self.owner_container_running(&owner_container).await? {
            return Err(AppManagerError::OwnerContainerNotRunning);
        }

        let key = format!("{}/{}", req.owner, req.app_name);
        if !self.in_flight.lock().insert(key.clone()) {
            return Err(AppManagerError::BuildInProgress(key));
        }
        let _guard = InFlightGuard { set: &self.in_flight, key };

        let owner_ip = self
            .hypervisor
            .container_ipv4(&owner_container)
            .await
            .map_err(AppManagerError::from)?
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        let now = self.clock.epoch_ms();
        let sub_domain = req.sub_domain.clone().unwrap_or_else(|| containarium_core::names::default_subdomain(&req.owner, &req.app_name));
        let app = Application::new(req.owner.clone(), req.app_name.clone(), sub_domain, req.declared_port, now);

        let mut ctx = DeployCtx {
            req,
            app,
            base_domain: self.base_domain.clone(),
            owner_container_name: owner_container,
            owner_container_ip: owner_ip,
            build_spec: None,
            image_tag: None,
        };
        let deps = self.deps();

        for step in standard_pipeline::<C>() {
            if let Err(e) = step.run(&mut ctx, &deps).await {
                warn!(step = step.name(), error = %e, "deploy pipeline step failed");
                return Err(e);
            }
        }
        Ok(ctx.app)
    }

    #[instrument(skip(self, app))]
    pub async fn stop(&self, app: &mut Application) -> Result<(), AppManagerError> {
        app.transition(AppState::Stopped, self.clock.epoch_ms())?;
        self.hypervisor.exec(&app.container_name, vec!["docker".into(), "stop".into(), app.name.clone()]).await?;
        self.store.update_state(&app.id, AppState::Stopped, self.clock.epoch_ms()).await?;
        Ok(())
    }

    #[instrument(skip(self, app))]
    pub async fn start(&self, app: &mut Application) -> Result<(), AppManagerError> {
        app.transition(AppState::Running, self.clock.epoch_ms())?;
        self.hypervisor.exec(&app.container_name, vec!["docker".into(), "start".into(), app.name.clone()]).await?;
        self.store.update_state(&app.id, AppState::Running, self.clock.epoch_ms()).await?;
        Ok(())
    }

    #[instrument(skip(self, app))]
    pub async fn restart(&self, app: &mut Application) -> Result<(), AppManagerError> {
        app.transition(AppState::Restarting, self.clock.epoch_ms())?;
        self.store.update_state(&app.id, AppState::Restarting, self.clock.epoch_ms()).await?;
        self.hypervisor.exec(&app.container_name, vec!["docker".into(), "restart".into(), app.name.clone()]).await?;
        app.transition(AppState::Running, self.clock.epoch_ms())?;
        self.store.update_state(&app.id, AppState::Running, self.clock.epoch_ms()).await?;
        info!(owner = %app.owner, name = %app.name, "restarted");
        Ok(())
    }

    /// Redeploy runs the full pipeline again (spec.md §4.6: "new tarball;
    /// new image; route points to new instance only after health passes").
    /// The route is only re-pointed by `ProgramRouteStep` once the new
    /// build and start succeed, so a failed redeploy leaves the prior
    /// instance serving traffic.
    pub async fn redeploy(&self, req: DeployRequest) -> Result<Application, AppManagerError> {
        self.deploy(req).await
    }

    #[instrument(skip(self, app))]
    pub async fn delete(&self, app: &Application) -> Result<(), AppManagerError> {
        self.hypervisor.exec(&app.container_name, vec!["docker".into(), "rm".into(), "-f".into(), app.name.clone()]).await.ok();
        let route_id = containarium_core::names::route_id(&app.owner, &app.name);
        self.proxy.delete_route(&route_id).await.ok();
        self.store.release_subdomain(&app.sub_domain).await.ok();
        match self.store.delete(&app.id).await {
            Ok(()) | Err(containarium_store::StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.logs.clear(&app.id);
        Ok(())
    }

    pub fn logs(&self, app: &Application) -> Vec<String> {
        self.logs.get(&app.id)
    }

    pub async fn get(&self, owner: &str, name: &str) -> Result<Application, AppManagerError> {
        Ok(self.store.get(owner, name).await?)
    }

    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<Application>, AppManagerError> {
        Ok(self.store.list(owner).await?)
    }

    fn deps(&self) -> DeployDeps<C> {
        DeployDeps {
            store: self.store.clone(),
            hypervisor: self.hypervisor.clone(),
            proxy: self.proxy.clone(),
            buildpacks: self.buildpacks.clone(),
            logs: self.logs.clone(),
            clock: self.clock.clone(),
        }
    }

    async fn owner_container_running(&self, name: &str) -> Result<bool, AppManagerError> {
        match self.hypervisor.get_container(name).await {
            Ok(info) => Ok(info.status == "Running"),
            Err(containarium_hypervisor::HypervisorError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
