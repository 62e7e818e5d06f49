// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The single authoritative implementation of every RPC (spec.md §4.8):
//! the axum HTTP gateway in [`crate::http`] builds the same request
//! structs and calls these same methods in-process, so there is exactly
//! one place per operation that talks to the manager layer.

use containarium_containers::CreateOptions;
use containarium_core::{Collaborator, Container, ResizeRequest, Route};
use containarium_wire::proto::containarium_server::Containarium;
use containarium_wire::proto::*;
use tonic::{Request, Response, Status};

use crate::context::ApiContext;
use crate::error::ApiError;

fn status(e: impl Into<ApiError>) -> Status {
    e.into().into()
}

#[tonic::async_trait]
impl Containarium for ApiContext {
    async fn create_container(&self, request: Request<CreateContainerRequest>) -> Result<Response<Container>, Status> {
        let req = request.into_inner();
        let resources = req.resources.map(containarium_core::ResourceCaps::from).unwrap_or(containarium_core::ResourceCaps::new(1, 1_000_000_000, 10_000_000_000));
        let mut container = Container::new(req.username, req.image, resources);
        container.authorized_keys = req.ssh_keys.into_iter().collect();
        container.labels = req.labels;
        container.nested_runtime = req.enable_docker;

        let created = self.containers.create(container, CreateOptions { force: false }).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&created).into()))
    }

    async fn get_container(&self, request: Request<GetContainerRequest>) -> Result<Response<Container>, Status> {
        let req = request.into_inner();
        let container = self.containers.get(&req.name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&container).into()))
    }

    async fn list_containers(&self, _request: Request<ListContainersRequest>) -> Result<Response<ListContainersResponse>, Status> {
        let containers = self.containers.list().await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(ListContainersResponse { containers: containers.iter().map(Into::into).collect() }))
    }

    async fn start_container(&self, request: Request<ContainerRef>) -> Result<Response<Container>, Status> {
        let req = request.into_inner();
        let mut container = self.containers.get(&req.name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.containers.start(&mut container).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&container).into()))
    }

    async fn stop_container(&self, request: Request<ContainerRef>) -> Result<Response<Container>, Status> {
        let req = request.into_inner();
        let mut container = self.containers.get(&req.name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.containers.stop(&mut container, true).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&container).into()))
    }

    async fn resize_container(&self, request: Request<ResizeContainerRequest>) -> Result<Response<Container>, Status> {
        let req = request.into_inner();
        let mut container = self.containers.get(&req.name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        let resize: ResizeRequest = match req.resources {
            Some(r) => {
                let caps = containarium_core::ResourceCaps::from(r);
                ResizeRequest { cpu_cores: Some(caps.cpu_cores), memory_bytes: Some(caps.memory_bytes), root_disk_bytes: Some(caps.root_disk_bytes) }
            }
            None => ResizeRequest::default(),
        };
        self.containers.resize(&mut container, resize).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&container).into()))
    }

    async fn delete_container(&self, request: Request<ContainerRef>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let container = self.containers.get(&req.name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.containers.delete(&container, false).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(Empty {}))
    }

    async fn exec_command(&self, request: Request<ExecCommandRequest>) -> Result<Response<ExecCommandResponse>, Status> {
        let req = request.into_inner();
        let result = self.hypervisor.exec(&req.container_name, req.command).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(ExecCommandResponse { exit_code: result.exit_code, stdout: result.stdout, stderr: result.stderr }))
    }

    async fn deploy_app(&self, request: Request<DeployAppRequest>) -> Result<Response<Application>, Status> {
        let req = request.into_inner();
        let source_tarball = containarium_appmanager::decode_tar_gz(&req.source_tarball).map_err(|e| status(containarium_core::Error::from(e)))?;
        let deploy_req = containarium_appmanager::DeployRequest {
            owner: req.owner,
            app_name: req.app_name,
            source_tarball,
            declared_port: req.port as u16,
            env: req.env,
            sub_domain: req.sub_domain,
        };
        let app = self.apps.deploy(deploy_req).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&app).into()))
    }

    async fn get_app(&self, request: Request<AppRef>) -> Result<Response<Application>, Status> {
        let req = request.into_inner();
        let app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&app).into()))
    }

    async fn list_apps(&self, request: Request<ListAppsRequest>) -> Result<Response<ListAppsResponse>, Status> {
        let req = request.into_inner();
        let apps = self.apps.list(req.owner.as_deref()).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(ListAppsResponse { apps: apps.iter().map(Into::into).collect() }))
    }

    async fn stop_app(&self, request: Request<AppRef>) -> Result<Response<Application>, Status> {
        let req = request.into_inner();
        let mut app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.apps.stop(&mut app).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&app).into()))
    }

    async fn start_app(&self, request: Request<AppRef>) -> Result<Response<Application>, Status> {
        let req = request.into_inner();
        let mut app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.apps.start(&mut app).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&app).into()))
    }

    async fn restart_app(&self, request: Request<AppRef>) -> Result<Response<Application>, Status> {
        let req = request.into_inner();
        let mut app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.apps.restart(&mut app).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&app).into()))
    }

    async fn delete_app(&self, request: Request<AppRef>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.apps.delete(&app).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(Empty {}))
    }

    async fn get_app_logs(&self, request: Request<GetAppLogsRequest>) -> Result<Response<GetAppLogsResponse>, Status> {
        let req = request.into_inner();
        let app = self.apps.get(&req.owner, &req.app_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        let mut lines = self.apps.logs(&app);
        if req.tail > 0 && (req.tail as usize) < lines.len() {
            lines = lines.split_off(lines.len() - req.tail as usize);
        }
        Ok(Response::new(GetAppLogsResponse { lines }))
    }

    async fn put_route(&self, request: Request<PutRouteRequest>) -> Result<Response<Route>, Status> {
        let route = request.into_inner().into_route();
        self.routes.put(&route).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        self.proxy.add_route(&route).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&route).into()))
    }

    async fn list_routes(&self, _request: Request<Empty>) -> Result<Response<ListRoutesResponse>, Status> {
        let routes = self.routes.list().await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(ListRoutesResponse { routes: routes.iter().map(Into::into).collect() }))
    }

    async fn put_collaborator(&self, request: Request<PutCollaboratorRequest>) -> Result<Response<Collaborator>, Status> {
        let req = request.into_inner();
        let grant = Collaborator::new(req.container_name, req.username, req.authorized_key);
        self.collaborators.upsert(&grant).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new((&grant).into()))
    }

    async fn list_collaborators(&self, request: Request<ListCollaboratorsRequest>) -> Result<Response<ListCollaboratorsResponse>, Status> {
        let req = request.into_inner();
        let collaborators = self.collaborators.list_for_container(&req.container_name).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(ListCollaboratorsResponse { collaborators: collaborators.iter().map(Into::into).collect() }))
    }

    async fn remove_collaborator(&self, request: Request<RemoveCollaboratorRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        self.collaborators.remove(&req.container_name, &req.username).await.map_err(|e| status(containarium_core::Error::from(e)))?;
        Ok(Response::new(Empty {}))
    }

    async fn system_info(&self, _request: Request<Empty>) -> Result<Response<SystemInfoResponse>, Status> {
        let hypervisor_ok = self.hypervisor.check_daemon_version().await.is_ok();
        let database_ok = self.daemon_config.load().await.is_ok();
        Ok(Response::new(SystemInfoResponse {
            hypervisor_version: env!("CARGO_PKG_VERSION").to_string(),
            hypervisor_ok,
            database_ok,
            uptime_seconds: self.uptime_seconds(),
        }))
    }
}
