// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Shared error taxonomy (spec §7).
//!
//! Every component-local error type converts into this one at its public
//! boundary. The `ErrorKind` crosses component boundaries unchanged; only
//! the message is adapted, so a kind picked in `containarium-hypervisor`
//! still reads as the same kind by the time it reaches the API surface.

use std::fmt;

/// Surface-neutral error kind, matching spec.md §7's taxonomy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    Conflict,
    ResourceExhausted,
    Unavailable,
    DeadlineExceeded,
    Internal,
}

impl ErrorKind {
    /// The conventional HTTP status for this kind (spec.md §7 "Surfacing" column).
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::FailedPrecondition => 409,
            ErrorKind::Conflict => 409,
            ErrorKind::ResourceExhausted => 429,
            ErrorKind::Unavailable => 503,
            ErrorKind::DeadlineExceeded => 504,
            ErrorKind::Internal => 500,
        }
    }

    /// The matching gRPC status code (`tonic::Code` has the same repertoire;
    /// kept as `u32` here so this crate stays free of a `tonic` dependency).
    pub fn grpc_code(self) -> u32 {
        match self {
            ErrorKind::InvalidArgument => 3,
            ErrorKind::DeadlineExceeded => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::AlreadyExists => 6,
            ErrorKind::PermissionDenied => 7,
            ErrorKind::ResourceExhausted => 8,
            ErrorKind::FailedPrecondition => 9,
            ErrorKind::Conflict => 10,
            ErrorKind::Unauthenticated => 16,
            ErrorKind::Unavailable => 14,
            ErrorKind::Internal => 13,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A domain error carrying a kind, a human message, and (for multi-subsystem
/// mutations that partially failed) the list of side effects that were
/// rolled back vs. left in place, per spec.md §7's rollback-reporting rule.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub rolled_back: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), rolled_back: Vec::new() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Attach the list of side effects that were undone (or left dangling)
    /// after a multi-subsystem mutation failed partway through.
    pub fn with_rollback(mut self, undone: impl IntoIterator<Item = String>) -> Self {
        self.rolled_back = undone.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_matches_spec_table() {
        assert_eq!(ErrorKind::AlreadyExists.http_status(), 409);
        assert_eq!(ErrorKind::ResourceExhausted.http_status(), 429);
        assert_eq!(ErrorKind::Unavailable.http_status(), 503);
    }

    #[test]
    fn rollback_list_attaches() {
        let e = Error::internal("partial deploy failure")
            .with_rollback(["stopped sub-container".to_string(), "route left live".to_string()]);
        assert_eq!(e.rolled_back.len(), 2);
        assert_eq!(e.kind, ErrorKind::Internal);
    }
}
