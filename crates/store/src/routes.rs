// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The routes table (spec.md §3, §4.7): at most one active route per
//! domain, enforced by a `UNIQUE (domain)` constraint.

use async_trait::async_trait;
use containarium_core::{ApplicationId, Route, RouteId};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{map_unique_violation, StoreError};

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn put(&self, route: &Route) -> Result<(), StoreError>;
    async fn get_by_domain(&self, domain: &str) -> Result<Route, StoreError>;
    async fn list(&self) -> Result<Vec<Route>, StoreError>;
    async fn remove(&self, id: &RouteId) -> Result<(), StoreError>;
}

pub struct PgRouteStore {
    pool: PgPool,
}

impl PgRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteStore for PgRouteStore {
    async fn put(&self, route: &Route) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO routes (id, domain, upstream_host, upstream_port, app_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (domain)
             DO UPDATE SET upstream_host = EXCLUDED.upstream_host,
                           upstream_port = EXCLUDED.upstream_port,
                           app_id = EXCLUDED.app_id",
        )
        .bind(route.id.to_string())
        .bind(&route.domain)
        .bind(&route.upstream_host)
        .bind(route.upstream_port as i32)
        .bind(route.app_id.as_ref().map(ToString::to_string))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, route.domain.clone()))?;
        Ok(())
    }

    async fn get_by_domain(&self, domain: &str) -> Result<Route, StoreError> {
        let row = sqlx::query("SELECT id, domain, upstream_host, upstream_port, app_id FROM routes WHERE domain = $1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(domain.to_string()))?;
        decode_route(row)
    }

    async fn list(&self) -> Result<Vec<Route>, StoreError> {
        let rows = sqlx::query("SELECT id, domain, upstream_host, upstream_port, app_id FROM routes ORDER BY domain").fetch_all(&self.pool).await?;
        rows.into_iter().map(decode_route).collect()
    }

    async fn remove(&self, id: &RouteId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM routes WHERE id = $1").bind(id.to_string()).execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_route(row: sqlx::postgres::PgRow) -> Result<Route, StoreError> {
    let id: String = row.try_get("id")?;
    let app_id: Option<String> = row.try_get("app_id")?;
    Ok(Route {
        id: RouteId(id),
        domain: row.try_get("domain")?,
        upstream_host: row.try_get("upstream_host")?,
        upstream_port: { let p: i32 = row.try_get("upstream_port")?; p as u16 },
        app_id: app_id.map(ApplicationId::from_string),
    })
}
