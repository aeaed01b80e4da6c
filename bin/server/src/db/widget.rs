//! Database repository for widgets, webhooks, and call statistics.
//!
//! The repository is the production implementation of the relay's
//! `WidgetStore` boundary. A widget's webhook lives in its own table with a
//! unique widget reference: saved alongside the widget, deleted with it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashwire_core::{DashboardId, WidgetId};
use dashwire_relay::{StoreError, WidgetRecord, WidgetStore};
use dashwire_widget::{
    CallOutcome, CallRecord, HeaderPair, HttpMethod, Position, WebhookConfig, WidgetConfig,
    WidgetSettings, WidgetStatus,
};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Data for creating a widget.
#[derive(Debug, Clone)]
pub struct NewWidget {
    /// Owning dashboard.
    pub dashboard_id: DashboardId,
    /// Panel title.
    pub title: String,
    /// Type-specific settings.
    pub settings: WidgetSettings,
    /// Grid placement.
    pub position: Position,
    /// Visibility status.
    pub status: WidgetStatus,
}

/// Data for saving a widget's webhook.
#[derive(Debug, Clone)]
pub struct NewWebhook {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Custom headers in configured order.
    pub headers: Vec<HeaderPair>,
    /// Static JSON body template.
    pub body_template: Option<serde_json::Value>,
}

/// Row type for widget queries, with webhook columns left-joined in.
#[derive(FromRow)]
struct WidgetRow {
    id: i64,
    dashboard_id: i64,
    title: String,
    settings: serde_json::Value,
    position_x: i32,
    position_y: i32,
    width: i32,
    height: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    webhook_url: Option<String>,
    webhook_method: Option<String>,
    webhook_headers: Option<serde_json::Value>,
    webhook_body_template: Option<serde_json::Value>,
    webhook_created_at: Option<DateTime<Utc>>,
    webhook_updated_at: Option<DateTime<Utc>>,
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

impl WidgetRow {
    fn try_into_record(self) -> Result<WidgetRecord, sqlx::Error> {
        let id = WidgetId::new(self.id)
            .map_err(|e| decode_error(format!("invalid widget id '{}': {}", self.id, e)))?;
        let dashboard_id = DashboardId::new(self.dashboard_id).map_err(|e| {
            decode_error(format!(
                "invalid dashboard id '{}': {}",
                self.dashboard_id, e
            ))
        })?;

        let settings: WidgetSettings = serde_json::from_value(self.settings)
            .map_err(|e| decode_error(format!("invalid settings for widget {id}: {e}")))?;

        let status = match self.status.as_str() {
            "active" => WidgetStatus::Active,
            "inactive" => WidgetStatus::Inactive,
            other => {
                return Err(decode_error(format!(
                    "invalid status '{other}' for widget {id}"
                )));
            }
        };

        let webhook = match (self.webhook_url, self.webhook_method) {
            (Some(url), Some(method)) => {
                let method = HttpMethod::from_str(&method)
                    .map_err(|e| decode_error(format!("widget {id}: {e}")))?;
                let headers: Vec<HeaderPair> = match self.webhook_headers {
                    Some(value) => serde_json::from_value(value).map_err(|e| {
                        decode_error(format!("invalid webhook headers for widget {id}: {e}"))
                    })?,
                    None => Vec::new(),
                };
                Some(WebhookConfig {
                    widget_id: id,
                    url,
                    method,
                    headers,
                    body_template: self.webhook_body_template,
                    created_at: self.webhook_created_at.unwrap_or(self.created_at),
                    updated_at: self.webhook_updated_at.unwrap_or(self.updated_at),
                })
            }
            _ => None,
        };

        Ok(WidgetRecord {
            widget: WidgetConfig {
                id,
                dashboard_id,
                title: self.title,
                settings,
                position: Position {
                    x: self.position_x,
                    y: self.position_y,
                    width: self.width,
                    height: self.height,
                },
                status,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            webhook,
        })
    }
}

/// Row type for call statistics queries.
#[derive(FromRow)]
struct CallStatsRow {
    widget_id: i64,
    last_called: DateTime<Utc>,
    last_response: serde_json::Value,
    call_count: i64,
}

impl CallStatsRow {
    fn try_into_record(self) -> Result<CallRecord, sqlx::Error> {
        let widget_id = WidgetId::new(self.widget_id).map_err(|e| {
            decode_error(format!("invalid widget id '{}': {}", self.widget_id, e))
        })?;
        Ok(CallRecord {
            widget_id,
            last_called: self.last_called,
            last_response: self.last_response,
            call_count: self.call_count,
        })
    }
}

const WIDGET_SELECT: &str = r#"
    SELECT w.id, w.dashboard_id, w.title, w.settings,
           w.position_x, w.position_y, w.width, w.height, w.status,
           w.created_at, w.updated_at,
           h.url AS webhook_url, h.method AS webhook_method,
           h.headers AS webhook_headers, h.body_template AS webhook_body_template,
           h.created_at AS webhook_created_at, h.updated_at AS webhook_updated_at
    FROM widgets w
    LEFT JOIN webhooks h ON h.widget_id = w.id
"#;

/// Repository for widget operations.
pub struct WidgetRepository {
    pool: PgPool,
}

impl WidgetRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a widget with its webhook configuration.
    pub async fn find_by_id(&self, id: WidgetId) -> Result<Option<WidgetRecord>, sqlx::Error> {
        let row: Option<WidgetRow> =
            sqlx::query_as(&format!("{WIDGET_SELECT} WHERE w.id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }

    /// Lists a dashboard's widgets with their webhook configurations,
    /// ordered by grid placement.
    pub async fn list_by_dashboard(
        &self,
        dashboard_id: DashboardId,
    ) -> Result<Vec<WidgetRecord>, sqlx::Error> {
        let rows: Vec<WidgetRow> = sqlx::query_as(&format!(
            "{WIDGET_SELECT} WHERE w.dashboard_id = $1 ORDER BY w.position_y, w.position_x, w.id"
        ))
        .bind(dashboard_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into_record()).collect()
    }

    /// Creates a widget, and its webhook when one is supplied, in one
    /// transaction. Returns the generated widget ID.
    pub async fn create(
        &self,
        widget: &NewWidget,
        webhook: Option<&NewWebhook>,
    ) -> Result<WidgetId, sqlx::Error> {
        let now = Utc::now();
        let settings = serde_json::to_value(&widget.settings)
            .map_err(|e| decode_error(format!("unserializable widget settings: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO widgets
                (dashboard_id, title, settings, position_x, position_y, width, height,
                 status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            "#,
        )
        .bind(widget.dashboard_id.as_i64())
        .bind(&widget.title)
        .bind(&settings)
        .bind(widget.position.x)
        .bind(widget.position.y)
        .bind(widget.position.width)
        .bind(widget.position.height)
        .bind(widget.status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let widget_id = WidgetId::new(id)
            .map_err(|e| decode_error(format!("invalid generated widget id '{id}': {e}")))?;

        if let Some(webhook) = webhook {
            upsert_webhook(&mut tx, widget_id, webhook, now).await?;
        }

        tx.commit().await?;
        Ok(widget_id)
    }

    /// Updates a widget's title, settings, placement, and status.
    pub async fn update(&self, widget: &WidgetConfig) -> Result<(), sqlx::Error> {
        let settings = serde_json::to_value(&widget.settings)
            .map_err(|e| decode_error(format!("unserializable widget settings: {e}")))?;

        sqlx::query(
            r#"
            UPDATE widgets
            SET title = $2, settings = $3, position_x = $4, position_y = $5,
                width = $6, height = $7, status = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(widget.id.as_i64())
        .bind(&widget.title)
        .bind(&settings)
        .bind(widget.position.x)
        .bind(widget.position.y)
        .bind(widget.position.width)
        .bind(widget.position.height)
        .bind(widget.status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates or replaces a widget's webhook configuration.
    pub async fn save_webhook(
        &self,
        widget_id: WidgetId,
        webhook: &NewWebhook,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        upsert_webhook(&mut tx, widget_id, webhook, Utc::now()).await?;
        tx.commit().await
    }

    /// Removes a widget's webhook configuration, leaving the widget in the
    /// not-configured state.
    pub async fn delete_webhook(&self, widget_id: WidgetId) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM webhooks
            WHERE widget_id = $1
            "#,
        )
        .bind(widget_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a widget and, via cascade, its webhook and call statistics.
    pub async fn delete(&self, widget_id: WidgetId) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM widgets
            WHERE id = $1
            "#,
        )
        .bind(widget_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a call outcome: increments the counter and overwrites the
    /// latest-call snapshot. Concurrent calls race last-write-wins on the
    /// snapshot; the counter counts every call.
    pub async fn record_call_stats(
        &self,
        widget_id: WidgetId,
        outcome: &CallOutcome,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO widget_call_stats (widget_id, last_called, last_response, call_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (widget_id)
            DO UPDATE SET call_count = widget_call_stats.call_count + 1,
                          last_called = EXCLUDED.last_called,
                          last_response = EXCLUDED.last_response
            "#,
        )
        .bind(widget_id.as_i64())
        .bind(outcome.called_at)
        .bind(&outcome.snapshot)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the call statistics for a widget, if any calls were recorded.
    pub async fn call_stats(&self, widget_id: WidgetId) -> Result<Option<CallRecord>, sqlx::Error> {
        let row: Option<CallStatsRow> = sqlx::query_as(
            r#"
            SELECT widget_id, last_called, last_response, call_count
            FROM widget_call_stats
            WHERE widget_id = $1
            "#,
        )
        .bind(widget_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }
}

async fn upsert_webhook(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    widget_id: WidgetId,
    webhook: &NewWebhook,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let headers = serde_json::to_value(&webhook.headers)
        .map_err(|e| decode_error(format!("unserializable webhook headers: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO webhooks (widget_id, url, method, headers, body_template, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (widget_id)
        DO UPDATE SET url = $2, method = $3, headers = $4, body_template = $5, updated_at = $6
        "#,
    )
    .bind(widget_id.as_i64())
    .bind(&webhook.url)
    .bind(webhook.method.as_str())
    .bind(&headers)
    .bind(&webhook.body_template)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn store_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        reason: e.to_string(),
    }
}

#[async_trait]
impl WidgetStore for WidgetRepository {
    async fn get_widget(&self, widget_id: WidgetId) -> Result<Option<WidgetRecord>, StoreError> {
        self.find_by_id(widget_id).await.map_err(store_error)
    }

    async fn get_dashboard_widgets(
        &self,
        dashboard_id: DashboardId,
    ) -> Result<Vec<WidgetRecord>, StoreError> {
        self.list_by_dashboard(dashboard_id)
            .await
            .map_err(store_error)
    }

    async fn record_call(
        &self,
        widget_id: WidgetId,
        outcome: &CallOutcome,
    ) -> Result<(), StoreError> {
        self.record_call_stats(widget_id, outcome)
            .await
            .map_err(store_error)
    }
}
