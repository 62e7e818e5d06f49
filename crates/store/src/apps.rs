// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The apps table (spec.md §4.5): `data` JSON is the authoritative
//! snapshot; the other columns exist only so Postgres can index and
//! enforce uniqueness on them. Every mutation runs inside a single
//! transaction; readers only ever see committed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use containarium_core::{Application, ApplicationId, AppState};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{map_unique_violation, StoreError};

#[async_trait]
pub trait AppStore: Send + Sync {
    async fn create(&self, app: &Application) -> Result<(), StoreError>;
    async fn get(&self, owner: &str, name: &str) -> Result<Application, StoreError>;
    async fn get_by_domain(&self, sub_domain: &str) -> Result<Application, StoreError>;
    async fn list(&self, owner: Option<&str>) -> Result<Vec<Application>, StoreError>;
    async fn update_state(&self, id: &ApplicationId, next: AppState, now_ms: u64) -> Result<(), StoreError>;
    async fn update_image(&self, id: &ApplicationId, image_ref: &str, now_ms: u64) -> Result<(), StoreError>;
    async fn delete(&self, id: &ApplicationId) -> Result<(), StoreError>;
    async fn reserve_subdomain(&self, sub_domain: &str, owner: &str, now_ms: u64) -> Result<(), StoreError>;
    async fn release_subdomain(&self, sub_domain: &str) -> Result<(), StoreError>;
}

pub struct PgAppStore {
    pool: PgPool,
}

impl PgAppStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppStore for PgAppStore {
    async fn create(&self, app: &Application) -> Result<(), StoreError> {
        let data = serde_json::to_value(app).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        let deployed_at = app.deployed_at_ms.map(millis_to_timestamp);

        sqlx::query(
            "INSERT INTO apps (id, owner, name, sub_domain, state, port, container_name, created_at, updated_at, deployed_at, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(app.id.to_string())
        .bind(&app.owner)
        .bind(&app.name)
        .bind(&app.sub_domain)
        .bind(app.state.to_string())
        .bind(app.port as i32)
        .bind(&app.container_name)
        .bind(millis_to_timestamp(app.created_at_ms))
        .bind(millis_to_timestamp(app.updated_at_ms))
        .bind(deployed_at)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("{}/{}", app.owner, app.name)))?;
        Ok(())
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Application, StoreError> {
        let row = sqlx::query("SELECT data FROM apps WHERE owner = $1 AND name = $2")
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{owner}/{name}")))?;
        decode_app(row)
    }

    async fn get_by_domain(&self, sub_domain: &str) -> Result<Application, StoreError> {
        let row = sqlx::query("SELECT data FROM apps WHERE sub_domain = $1")
            .bind(sub_domain)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(sub_domain.to_string()))?;
        decode_app(row)
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<Application>, StoreError> {
        let rows = match owner {
            Some(owner) => sqlx::query("SELECT data FROM apps WHERE owner = $1 ORDER BY created_at").bind(owner).fetch_all(&self.pool).await?,
            None => sqlx::query("SELECT data FROM apps ORDER BY created_at").fetch_all(&self.pool).await?,
        };
        rows.into_iter().map(decode_app).collect()
    }

    /// Optimistic write (spec.md §5: "optimistic writes on `(id, updated_at)`
    /// detect races"): the row is read without a lock, mutated in Rust, then
    /// written back with `updated_at` pinned to the value just read. A
    /// concurrent writer that commits in between makes this `WHERE` clause
    /// match zero rows, surfaced as `StoreError::Conflict` rather than
    /// silently clobbering the other writer's change.
    async fn update_state(&self, id: &ApplicationId, next: AppState, now_ms: u64) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT data FROM apps WHERE id = $1").bind(id.to_string()).fetch_optional(&self.pool).await?;
        let row = row.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut app = decode_app(row)?;
        let expected_updated_at = millis_to_timestamp(app.updated_at_ms);

        app.transition(next, now_ms).map_err(|e| StoreError::Conflict(e.message))?;
        let data = serde_json::to_value(&app).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        let result = sqlx::query(
            "UPDATE apps SET state = $1, updated_at = $2, deployed_at = $3, data = $4 WHERE id = $5 AND updated_at = $6",
        )
        .bind(app.state.to_string())
        .bind(millis_to_timestamp(app.updated_at_ms))
        .bind(app.deployed_at_ms.map(millis_to_timestamp))
        .bind(data)
        .bind(id.to_string())
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("application {id} was concurrently modified")));
        }
        Ok(())
    }

    async fn update_image(&self, id: &ApplicationId, image_ref: &str, now_ms: u64) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT data FROM apps WHERE id = $1").bind(id.to_string()).fetch_optional(&self.pool).await?;
        let row = row.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut app = decode_app(row)?;
        let expected_updated_at = millis_to_timestamp(app.updated_at_ms);

        app.image_ref = Some(image_ref.to_string());
        app.updated_at_ms = now_ms;
        let data = serde_json::to_value(&app).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        let result = sqlx::query("UPDATE apps SET updated_at = $1, data = $2 WHERE id = $3 AND updated_at = $4")
            .bind(millis_to_timestamp(now_ms))
            .bind(data)
            .bind(id.to_string())
            .bind(expected_updated_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("application {id} was concurrently modified")));
        }
        Ok(())
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1").bind(id.to_string()).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn reserve_subdomain(&self, sub_domain: &str, owner: &str, now_ms: u64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO reserved_subdomains (sub_domain, owner, reserved_at) VALUES ($1, $2, $3)")
            .bind(sub_domain)
            .bind(owner)
            .bind(millis_to_timestamp(now_ms))
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, sub_domain.to_string()))?;
        Ok(())
    }

    async fn release_subdomain(&self, sub_domain: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM reserved_subdomains WHERE sub_domain = $1").bind(sub_domain).execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_app(row: sqlx::postgres::PgRow) -> Result<Application, StoreError> {
    let data: serde_json::Value = row.try_get("data")?;
    serde_json::from_value(data).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn millis_to_timestamp(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}
