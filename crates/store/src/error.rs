// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("concurrent update conflict on {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for containarium_core::Error {
    fn from(e: StoreError) -> Self {
        use containarium_core::ErrorKind as K;
        match e {
            StoreError::NotFound(ref m) => containarium_core::Error::new(K::NotFound, m.clone()),
            StoreError::AlreadyExists(ref m) => containarium_core::Error::new(K::AlreadyExists, m.clone()),
            StoreError::Conflict(ref m) => containarium_core::Error::new(K::Conflict, m.clone()),
            StoreError::Database(_) => containarium_core::Error::new(K::Internal, e.to_string()),
        }
    }
}

/// Postgres unique-violation code (`23505`); every `INSERT`/`UPDATE` that
/// can race on a unique index maps this to `StoreError::AlreadyExists`
/// instead of a raw `Database` error (spec.md §4.5: "uniqueness on
/// sub-domain is enforced by the database; collisions return AlreadyExists").
pub fn map_unique_violation(err: sqlx::Error, subject: impl Into<String>) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::AlreadyExists(subject.into());
        }
    }
    StoreError::Database(err)
}
