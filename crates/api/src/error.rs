// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Maps the shared [`containarium_core::Error`] taxonomy onto both
//! `tonic::Status` and an axum JSON response (spec.md §7: "error kinds
//! cross component boundaries unchanged; only messages are adapted").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use containarium_core::{Error as CoreError, ErrorKind};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl From<ApiError> for tonic::Status {
    fn from(e: ApiError) -> Self {
        tonic::Status::new(tonic::Code::from_i32(e.0.kind.grpc_code() as i32), e.0.message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: String,
    message: &'a str,
    rolled_back: &'a [String],
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody { kind: self.0.kind.to_string(), message: &self.0.message, rolled_back: &self.0.rolled_back };
        (status, Json(body)).into_response()
    }
}

pub fn unauthenticated(message: impl Into<String>) -> ApiError {
    ApiError(CoreError::new(ErrorKind::Unauthenticated, message))
}

pub fn permission_denied(message: impl Into<String>) -> ApiError {
    ApiError(CoreError::new(ErrorKind::PermissionDenied, message))
}
