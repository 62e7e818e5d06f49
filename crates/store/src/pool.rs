// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StoreError;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))
}
