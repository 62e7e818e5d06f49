// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The daemon_config table: a flat key-value map the daemon rehydrates
//! into [`containarium_core::DaemonConfig`] on startup (spec.md §3).

use async_trait::async_trait;
use containarium_core::DaemonConfig;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::StoreError;

#[async_trait]
pub trait DaemonConfigStore: Send + Sync {
    async fn load(&self) -> Result<DaemonConfig, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct PgDaemonConfigStore {
    pool: PgPool,
}

impl PgDaemonConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DaemonConfigStore for PgDaemonConfigStore {
    async fn load(&self) -> Result<DaemonConfig, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM daemon_config").fetch_all(&self.pool).await?;
        let mut config = DaemonConfig::default();
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            config.set(key, value);
        }
        Ok(config)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO daemon_config (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
