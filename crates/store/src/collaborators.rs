// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The collaborators table: grants onto a container keyed by
//! `(container_name, username)`. No `data` JSON column here — unlike
//! apps, a collaborator grant has no nested structure worth snapshotting.

use async_trait::async_trait;
use containarium_core::Collaborator;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::StoreError;

#[async_trait]
pub trait CollaboratorStore: Send + Sync {
    async fn upsert(&self, grant: &Collaborator) -> Result<(), StoreError>;
    async fn list_for_container(&self, container_name: &str) -> Result<Vec<Collaborator>, StoreError>;
    async fn remove(&self, container_name: &str, username: &str) -> Result<(), StoreError>;
}

pub struct PgCollaboratorStore {
    pool: PgPool,
}

impl PgCollaboratorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollaboratorStore for PgCollaboratorStore {
    async fn upsert(&self, grant: &Collaborator) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO collaborators (container_name, username, authorized_key, sudo_grant, runtime_grant, auditor)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (container_name, username)
             DO UPDATE SET authorized_key = EXCLUDED.authorized_key,
                           sudo_grant = EXCLUDED.sudo_grant,
                           runtime_grant = EXCLUDED.runtime_grant,
                           auditor = EXCLUDED.auditor",
        )
        .bind(&grant.container_name)
        .bind(&grant.username)
        .bind(&grant.authorized_key)
        .bind(grant.sudo_grant)
        .bind(grant.runtime_grant)
        .bind(grant.auditor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_container(&self, container_name: &str) -> Result<Vec<Collaborator>, StoreError> {
        let rows = sqlx::query("SELECT container_name, username, authorized_key, sudo_grant, runtime_grant, auditor FROM collaborators WHERE container_name = $1 ORDER BY username")
            .bind(container_name)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(decode_collaborator).collect()
    }

    async fn remove(&self, container_name: &str, username: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM collaborators WHERE container_name = $1 AND username = $2")
            .bind(container_name)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn decode_collaborator(row: sqlx::postgres::PgRow) -> Result<Collaborator, StoreError> {
    Ok(Collaborator {
        container_name: row.try_get("container_name")?,
        username: row.try_get("username")?,
        authorized_key: row.try_get("authorized_key")?,
        sudo_grant: row.try_get("sudo_grant")?,
        runtime_grant: row.try_get("runtime_grant")?,
        auditor: row.try_get("auditor")?,
    })
}
