//! Database repository for dashboards.

use chrono::{DateTime, Utc};
use dashwire_core::DashboardId;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// A dashboard record from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRecord {
    /// Dashboard ID.
    pub id: DashboardId,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

/// Row type for dashboard queries.
#[derive(FromRow)]
struct DashboardRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DashboardRow {
    fn try_into_record(self) -> Result<DashboardRecord, sqlx::Error> {
        let id = DashboardId::new(self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid dashboard id '{}': {}", self.id, e),
            )))
        })?;

        Ok(DashboardRecord {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for dashboard operations.
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a dashboard by ID.
    pub async fn find_by_id(
        &self,
        id: DashboardId,
    ) -> Result<Option<DashboardRecord>, sqlx::Error> {
        let row: Option<DashboardRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM dashboards
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }

    /// Creates a new dashboard and returns its generated ID.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<DashboardId, sqlx::Error> {
        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO dashboards (name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        DashboardId::new(id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid generated dashboard id '{id}': {e}"),
            )))
        })
    }

    /// Deletes a dashboard and, via cascade, its widgets and their webhooks.
    pub async fn delete(&self, id: DashboardId) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM dashboards
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
