//! Database repositories for the dashwire platform.
//!
//! This module provides data access for:
//! - Dashboards
//! - Widgets and their webhook configurations
//! - Per-widget call statistics

pub mod dashboard;
pub mod widget;

pub use dashboard::{DashboardRecord, DashboardRepository};
pub use widget::{NewWebhook, NewWidget, WidgetRepository};

use crate::error::DbInitError;
use dashwire_core::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connects a pool and applies pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn init_pool(database_url: &str) -> Result<PgPool, DbInitError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| DbInitError::ConnectFailed {
            details: e.to_string(),
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DbInitError::MigrationFailed {
            details: e.to_string(),
        })?;

    Ok(pool)
}
