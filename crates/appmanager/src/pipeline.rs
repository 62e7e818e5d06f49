// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The deploy pipeline (spec.md §4.6): Reserve → Upload → Detect → Build →
//! Run → ProgramRoute → Running, modeled as an ordered list of steps run
//! against one shared [`DeployCtx`] — the same sequential-effect-execution
//! shape the teacher's engine uses to run a job's steps in order, adapted
//! from "job steps" to "deploy pipeline steps".

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use containarium_buildpacks::{BuildSpec, BuildpackRegistry, GenerateOptions, MemorySourceTree};
use containarium_core::{AppState, Application, Clock, Route, RouteId};
use containarium_hypervisor::HypervisorClient;
use containarium_proxy::ProxyController;
use containarium_store::AppStore;
use tracing::info;

use crate::error::AppManagerError;
use crate::image::{docker_run_args, image_tag, render_dockerfile, resource_caps_from_config};
use crate::logs::BuildLogStore;

pub struct DeployRequest {
    pub owner: String,
    pub app_name: String,
    pub source_tarball: BTreeMap<String, Vec<u8>>,
    pub declared_port: u16,
    pub env: BTreeMap<String, String>,
    pub sub_domain: Option<String>,
}

pub struct DeployCtx {
    pub req: DeployRequest,
    pub app: Application,
    pub base_domain: String,
    pub owner_container_name: String,
    pub owner_container_ip: String,
    pub build_spec: Option<BuildSpec>,
    pub image_tag: Option<String>,
}

pub struct DeployDeps<C: Clock> {
    pub store: Arc<dyn AppStore>,
    pub hypervisor: Arc<dyn HypervisorClient>,
    pub proxy: Arc<ProxyController>,
    pub buildpacks: Arc<BuildpackRegistry>,
    pub logs: Arc<BuildLogStore>,
    pub clock: C,
}

#[async_trait]
pub trait DeployStep<C: Clock>: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError>;
}

pub fn standard_pipeline<C: Clock + 'static>() -> Vec<Box<dyn DeployStep<C>>> {
    vec![
        Box::new(ReserveStep),
        Box::new(UploadStep),
        Box::new(DetectStep),
        Box::new(BuildStep),
        Box::new(RunStep),
        Box::new(ProgramRouteStep),
    ]
}

/// Step 1: reserve the sub-domain and persist the Uploading row (spec.md
/// §4.6 step 1).
pub struct ReserveStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for ReserveStep {
    fn name(&self) -> &'static str {
        "reserve"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let now = deps.clock.epoch_ms();
        deps.store.reserve_subdomain(&ctx.app.sub_domain, &ctx.app.owner, now).await?;
        if let Err(e) = deps.store.create(&ctx.app).await {
            deps.store.release_subdomain(&ctx.app.sub_domain).await.ok();
            return Err(e.into());
        }
        Ok(())
    }
}

/// Step 2: upload the tarball into the owner container's filesystem at
/// `/var/lib/apps/<app>/src` (spec.md §4.6 step 2).
pub struct UploadStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for UploadStep {
    fn name(&self) -> &'static str {
        "upload"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let dest_root = format!("/var/lib/apps/{}/src", ctx.app.name);
        for (relative_path, contents) in &ctx.req.source_tarball {
            let dest = format!("{dest_root}/{relative_path}");
            deps.hypervisor.push_file(&ctx.owner_container_name, &dest, contents, 0o644).await?;
        }
        Ok(())
    }
}

/// Step 3: detect the language via C4 and transition Uploading → Building
/// (spec.md §4.6 step 3).
pub struct DetectStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for DetectStep {
    fn name(&self) -> &'static str {
        "detect"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let mut tree = MemorySourceTree::new();
        for (path, contents) in &ctx.req.source_tarball {
            tree = tree.with_file(path.clone(), contents.clone());
        }
        let opts = GenerateOptions { declared_port: ctx.req.declared_port };
        let spec = deps.buildpacks.generate(&tree, &opts)?;
        ctx.app.language_fingerprint = Some(spec.buildpack.to_string());
        ctx.build_spec = Some(spec);

        let now = deps.clock.epoch_ms();
        ctx.app.transition(AppState::Building, now)?;
        deps.store.update_state(&ctx.app.id, AppState::Building, now).await?;
        Ok(())
    }
}

/// Step 4: render the buildpack's `BuildSpec` into a Dockerfile, push it
/// alongside the uploaded source, and `docker build` it inside the owner
/// container, streaming output into the per-app ring buffer (spec.md §4.6
/// step 4). The resulting image reference is persisted onto the
/// application so `RunStep` and later redeploys/rollbacks can find it.
pub struct BuildStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for BuildStep {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let spec = ctx.build_spec.as_ref().expect("DetectStep runs before BuildStep").clone();
        let app_dir = format!("/var/lib/apps/{}", ctx.app.name);
        let dockerfile = render_dockerfile(&spec);
        deps.hypervisor.push_file(&ctx.owner_container_name, &format!("{app_dir}/Dockerfile"), dockerfile.as_bytes(), 0o644).await?;

        let now = deps.clock.epoch_ms();
        let tag = image_tag(&ctx.app.name, now);
        let build_cmd = format!("docker build -t {tag} -f {app_dir}/Dockerfile {app_dir}/src");
        deps.logs.append(&ctx.app.id, format!("$ {build_cmd}"));
        let result = deps.hypervisor.exec(&ctx.owner_container_name, vec!["bash".to_string(), "-lc".to_string(), build_cmd]).await?;
        deps.logs.append_chunk(&ctx.app.id, &result.stdout);
        deps.logs.append_chunk(&ctx.app.id, &result.stderr);
        if result.exit_code != 0 {
            let now = deps.clock.epoch_ms();
            ctx.app.transition(AppState::Failed, now).ok();
            deps.store.update_state(&ctx.app.id, AppState::Failed, now).await.ok();
            return Err(AppManagerError::BuildFailed(format!("docker build exited {}", result.exit_code)));
        }

        deps.store.update_image(&ctx.app.id, &tag, now).await?;
        ctx.app.image_ref = Some(tag.clone());
        ctx.app.updated_at_ms = now;
        ctx.image_tag = Some(tag);
        Ok(())
    }
}

/// Step 5: remove any prior sub-container with this name, then build the
/// new one from the image `BuildStep` produced. The sub-container is
/// named literally `<a.name>` (spec.md §4.6 step 5: "a sub-container
/// named `<a.name>` runs inside the owner container") and capped to the
/// owner container's resources so it can't exceed what its owner was
/// granted.
pub struct RunStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for RunStep {
    fn name(&self) -> &'static str {
        "run"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let spec = ctx.build_spec.as_ref().expect("DetectStep runs before RunStep");
        let image = ctx.image_tag.clone().expect("BuildStep runs before RunStep");

        deps.hypervisor.exec(&ctx.owner_container_name, vec!["docker".to_string(), "rm".to_string(), "-f".to_string(), ctx.app.name.clone()]).await.ok();

        let config = deps.hypervisor.get_config(&ctx.owner_container_name).await?;
        let caps = resource_caps_from_config(&config);
        let args = docker_run_args(&ctx.app.name, &image, ctx.req.declared_port, spec.exposed_port, &ctx.req.env, &caps);
        let result = deps.hypervisor.exec(&ctx.owner_container_name, args).await?;
        if result.exit_code != 0 {
            return Err(AppManagerError::BuildFailed(format!("failed to start sub-container {}: {}", ctx.app.name, result.stderr)));
        }

        ctx.app.port = ctx.req.declared_port;
        ctx.app.container_name = ctx.owner_container_name.clone();
        Ok(())
    }
}

/// Step 6-7: program the route via C7 and request TLS, then transition
/// Building → Running (spec.md §4.6 steps 6-7).
pub struct ProgramRouteStep;

#[async_trait]
impl<C: Clock> DeployStep<C> for ProgramRouteStep {
    fn name(&self) -> &'static str {
        "program_route"
    }

    async fn run(&self, ctx: &mut DeployCtx, deps: &DeployDeps<C>) -> Result<(), AppManagerError> {
        let host = format!("{}.{}", ctx.app.sub_domain, ctx.base_domain);
        let route = Route::new(RouteId::for_app(&ctx.app.owner, &ctx.app.name), host.clone(), ctx.owner_container_ip.clone(), ctx.app.port);

        if let Err(e) = deps.proxy.add_route(&route).await {
            let now = deps.clock.epoch_ms();
            ctx.app.transition(AppState::Failed, now).ok();
            deps.store.update_state(&ctx.app.id, AppState::Failed, now).await.ok();
            return Err(e.into());
        }
        deps.proxy.provision_tls(&host).await?;

        let now = deps.clock.epoch_ms();
        ctx.app.transition(AppState::Running, now)?;
        deps.store.update_state(&ctx.app.id, AppState::Running, now).await?;
        info!(owner = %ctx.app.owner, app = %ctx.app.name, host, "application deployed");
        Ok(())
    }
}
