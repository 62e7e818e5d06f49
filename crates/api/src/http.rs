// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The HTTP+JSON gateway (spec.md §4.8, §6): every handler builds the
//! same generated request struct the gRPC service uses and calls the
//! same [`Containarium`] trait method on [`ApiContext`], so there is
//! exactly one implementation per operation — this module only adapts
//! wire shape, never re-implements behavior.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tonic::{Code, Request, Status};

use containarium_wire::proto::containarium_server::Containarium;
use containarium_wire::proto::*;

use crate::auth::AuthenticatedUser;
use crate::context::ApiContext;

pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/v1/containers", post(create_container).get(list_containers))
        .route("/v1/containers/:name", get(get_container).delete(delete_container))
        .route("/v1/containers/:name/start", post(start_container))
        .route("/v1/containers/:name/stop", post(stop_container))
        .route("/v1/containers/:name/resize", post(resize_container))
        .route("/v1/containers/:name/exec", post(exec_command))
        .route("/v1/containers/:name/terminal", get(crate::ws_terminal::upgrade))
        .route("/v1/apps", post(deploy_app).get(list_apps))
        .route("/v1/apps/:owner/:name", get(get_app).delete(delete_app))
        .route("/v1/apps/:owner/:name/stop", post(stop_app))
        .route("/v1/apps/:owner/:name/start", post(start_app))
        .route("/v1/apps/:owner/:name/restart", post(restart_app))
        .route("/v1/apps/:owner/:name/logs", get(get_app_logs))
        .route("/v1/network/routes", post(put_route).get(list_routes))
        .route("/v1/collaborators", post(put_collaborator).get(list_collaborators))
        .route("/v1/collaborators/:container_name/:username", delete(remove_collaborator))
        .route("/v1/system/info", get(system_info))
        .with_state(ctx)
}

/// Wraps a `Result<Response<T>, Status>` from the shared `Containarium`
/// implementation into an axum JSON response, translating the gRPC status
/// code the same way a grpc-gateway would (spec.md §7: error kinds cross
/// the transport boundary unchanged, only the envelope differs).
fn to_json<T: Serialize>(result: Result<tonic::Response<T>, Status>) -> Response {
    match result {
        Ok(resp) => (StatusCode::OK, Json(resp.into_inner())).into_response(),
        Err(status) => status_response(status),
    }
}

fn status_response(status: Status) -> Response {
    #[derive(Serialize)]
    struct Body<'a> {
        code: &'a str,
        message: &'a str,
    }
    let http_status = match status.code() {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::Aborted => StatusCode::CONFLICT,
        Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Body { code: code_name(status.code()), message: status.message() };
    (http_status, Json(body)).into_response()
}

fn code_name(code: Code) -> &'static str {
    match code {
        Code::InvalidArgument => "invalid_argument",
        Code::Unauthenticated => "unauthenticated",
        Code::PermissionDenied => "permission_denied",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted | Code::ResourceExhausted => "conflict",
        Code::Unavailable => "unavailable",
        Code::DeadlineExceeded => "deadline_exceeded",
        _ => "internal",
    }
}

async fn create_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Json(body): Json<CreateContainerRequest>) -> Response {
    to_json(ctx.create_container(Request::new(body)).await)
}

#[derive(Deserialize)]
struct ListContainersQuery {
    username: Option<String>,
    state: Option<String>,
    #[serde(default)]
    label: Vec<String>,
}

async fn list_containers(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Query(q): Query<ListContainersQuery>) -> Response {
    let label_selector: HashMap<String, String> = q
        .label
        .iter()
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let req = ListContainersRequest { username: q.username, state: q.state, label_selector };
    to_json(ctx.list_containers(Request::new(req)).await)
}

async fn get_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(name): Path<String>) -> Response {
    to_json(ctx.get_container(Request::new(GetContainerRequest { name })).await)
}

async fn start_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(name): Path<String>) -> Response {
    to_json(ctx.start_container(Request::new(ContainerRef { name })).await)
}

async fn stop_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(name): Path<String>) -> Response {
    to_json(ctx.stop_container(Request::new(ContainerRef { name })).await)
}

async fn resize_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(name): Path<String>, Json(resources): Json<ResourceCaps>) -> Response {
    to_json(ctx.resize_container(Request::new(ResizeContainerRequest { name, resources: Some(resources) })).await)
}

async fn delete_container(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(name): Path<String>) -> Response {
    to_json(ctx.delete_container(Request::new(ContainerRef { name })).await)
}

async fn exec_command(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path(container_name): Path<String>, Json(body): Json<ExecBody>) -> Response {
    to_json(ctx.exec_command(Request::new(ExecCommandRequest { container_name, command: body.command })).await)
}

#[derive(Deserialize)]
struct ExecBody {
    command: Vec<String>,
}

/// `sourceCode` travels as a base64 string over HTTP (spec.md §6), unlike
/// the gRPC surface where `DeployAppRequest.source_tarball` is raw bytes.
#[derive(Deserialize)]
struct DeployAppBody {
    owner: String,
    app_name: String,
    source_code: String,
    port: u32,
    #[serde(default)]
    env: HashMap<String, String>,
    sub_domain: Option<String>,
}

async fn deploy_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Json(body): Json<DeployAppBody>) -> Response {
    let source_tarball = match base64::engine::general_purpose::STANDARD.decode(body.source_code) {
        Ok(bytes) => bytes,
        Err(e) => return status_response(Status::invalid_argument(format!("sourceCode is not valid base64: {e}"))),
    };
    let req = DeployAppRequest { owner: body.owner, app_name: body.app_name, source_tarball, port: body.port, env: body.env, sub_domain: body.sub_domain };
    to_json(ctx.deploy_app(Request::new(req)).await)
}

#[derive(Deserialize)]
struct ListAppsQuery {
    owner: Option<String>,
}

async fn list_apps(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Query(q): Query<ListAppsQuery>) -> Response {
    to_json(ctx.list_apps(Request::new(ListAppsRequest { owner: q.owner })).await)
}

async fn get_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((owner, app_name)): Path<(String, String)>) -> Response {
    to_json(ctx.get_app(Request::new(AppRef { owner, app_name })).await)
}

async fn stop_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((owner, app_name)): Path<(String, String)>) -> Response {
    to_json(ctx.stop_app(Request::new(AppRef { owner, app_name })).await)
}

async fn start_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((owner, app_name)): Path<(String, String)>) -> Response {
    to_json(ctx.start_app(Request::new(AppRef { owner, app_name })).await)
}

async fn restart_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((owner, app_name)): Path<(String, String)>) -> Response {
    to_json(ctx.restart_app(Request::new(AppRef { owner, app_name })).await)
}

async fn delete_app(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((owner, app_name)): Path<(String, String)>) -> Response {
    to_json(ctx.delete_app(Request::new(AppRef { owner, app_name })).await)
}

#[derive(Deserialize)]
struct LogsQuery {
    #[serde(default)]
    tail: u32,
}

async fn get_app_logs(
    State(ctx): State<ApiContext>,
    _user: AuthenticatedUser,
    Path((owner, app_name)): Path<(String, String)>,
    Query(q): Query<LogsQuery>,
) -> Response {
    to_json(ctx.get_app_logs(Request::new(GetAppLogsRequest { owner, app_name, tail: q.tail })).await)
}

async fn put_route(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Json(body): Json<PutRouteRequest>) -> Response {
    to_json(ctx.put_route(Request::new(body)).await)
}

async fn list_routes(State(ctx): State<ApiContext>, _user: AuthenticatedUser) -> Response {
    to_json(ctx.list_routes(Request::new(Empty {})).await)
}

async fn put_collaborator(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Json(body): Json<PutCollaboratorRequest>) -> Response {
    to_json(ctx.put_collaborator(Request::new(body)).await)
}

#[derive(Deserialize)]
struct ListCollaboratorsQuery {
    container_name: String,
}

async fn list_collaborators(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Query(q): Query<ListCollaboratorsQuery>) -> Response {
    to_json(ctx.list_collaborators(Request::new(ListCollaboratorsRequest { container_name: q.container_name })).await)
}

async fn remove_collaborator(State(ctx): State<ApiContext>, _user: AuthenticatedUser, Path((container_name, username)): Path<(String, String)>) -> Response {
    to_json(ctx.remove_collaborator(Request::new(RemoveCollaboratorRequest { container_name, username })).await)
}

async fn system_info(State(ctx): State<ApiContext>) -> Response {
    to_json(ctx.system_info(Request::new(Empty {})).await)
}
