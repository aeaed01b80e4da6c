//! JSON API for widget refresh and submission.
//!
//! The wire contract is a success envelope `{success, data, timestamp}` or a
//! failure envelope `{success, message, code}`; error codes come from the
//! relay's typed failures, never from message matching.

use crate::db::WidgetRepository;
use crate::error::SubmitError;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dashwire_core::{DashboardId, WidgetId};
use dashwire_relay::{
    FileAttachment, FormField, OutboundBody, RelayError, ReqwestClient, WidgetRelay, WidgetStore,
    form,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::warn;

/// Shared application state.
pub struct AppState {
    /// The webhook relay over the production store and client.
    pub relay: WidgetRelay<WidgetRepository, ReqwestClient>,
    /// Maximum size of a single submitted file upload, in bytes.
    pub max_upload_bytes: u64,
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes as usize;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/widgets/{id}/refresh", post(refresh_widget))
        .route("/api/widgets/{id}/submit", post(submit_widget))
        .route("/api/dashboards/{id}/widgets", get(dashboard_widgets))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Serialize)]
struct SuccessEnvelope<T: Serialize> {
    success: bool,
    data: T,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct FailureEnvelope {
    success: bool,
    message: String,
    code: &'static str,
}

fn success<T: Serialize>(data: T) -> Response {
    Json(SuccessEnvelope {
        success: true,
        data,
        timestamp: Utc::now(),
    })
    .into_response()
}

fn failure(status: StatusCode, code: &'static str, message: String) -> Response {
    (
        status,
        Json(FailureEnvelope {
            success: false,
            message,
            code,
        }),
    )
        .into_response()
}

fn relay_failure(err: &RelayError) -> Response {
    failure(relay_status(err), err.code(), err.to_string())
}

/// Maps relay failures to HTTP statuses. A widget waiting to be configured
/// is a conflict with its own state, never a gateway problem.
fn relay_status(err: &RelayError) -> StatusCode {
    match err {
        RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
        RelayError::NotConfigured { .. } => StatusCode::CONFLICT,
        RelayError::NetworkFailure(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        RelayError::NetworkFailure(_)
        | RelayError::UpstreamStatus { .. }
        | RelayError::BadResponseShape(_) => StatusCode::BAD_GATEWAY,
        RelayError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
    }
}

fn submit_failure(err: &SubmitError) -> Response {
    let (status, code) = match err {
        SubmitError::InvalidPayload { .. } => (StatusCode::BAD_REQUEST, "invalid_payload"),
        SubmitError::UploadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "upload_too_large"),
        SubmitError::SpoolFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "spool_failed"),
    };
    failure(status, code, err.to_string())
}

fn parse_widget_id(raw: i64) -> Result<WidgetId, Response> {
    WidgetId::new(raw)
        .map_err(|e| failure(StatusCode::NOT_FOUND, "not_found", e.to_string()))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn refresh_widget(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let widget_id = match parse_widget_id(id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.relay.refresh(widget_id, None).await {
        Ok(data) => success(data),
        Err(e) => relay_failure(&e),
    }
}

async fn submit_widget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Response {
    let widget_id = match parse_widget_id(id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let body = match extract_submission(&state, request).await {
        Ok(body) => body,
        Err(e) => return submit_failure(&e),
    };

    // The spool directory lives until the relay call has completed.
    let (body, _spool) = body;

    match state.relay.refresh(widget_id, Some(body)).await {
        Ok(data) => success(data),
        Err(e) => relay_failure(&e),
    }
}

async fn dashboard_widgets(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let dashboard_id = match DashboardId::new(id) {
        Ok(id) => id,
        Err(e) => return failure(StatusCode::NOT_FOUND, "not_found", e.to_string()),
    };

    match state.relay.store().get_dashboard_widgets(dashboard_id).await {
        Ok(widgets) => success(widgets),
        Err(e) => {
            let err = RelayError::from(e);
            relay_failure(&err)
        }
    }
}

/// Pulls the submitted form data out of the request.
///
/// Multipart payloads spool their file uploads into a temporary directory
/// that must outlive the webhook call; JSON payloads carry fields only.
async fn extract_submission(
    state: &AppState,
    request: Request,
) -> Result<(OutboundBody, Option<TempDir>), SubmitError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart =
            Multipart::from_request(request, &()).await.map_err(|e| SubmitError::InvalidPayload {
                reason: e.to_string(),
            })?;
        let spool = tempfile::tempdir().map_err(|e| SubmitError::SpoolFailed {
            reason: e.to_string(),
        })?;
        let (fields, files) = read_multipart(multipart, &spool, state.max_upload_bytes).await?;
        Ok((form::prepare(fields, files), Some(spool)))
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), state.max_upload_bytes as usize)
            .await
            .map_err(|e| SubmitError::InvalidPayload {
                reason: e.to_string(),
            })?;
        let value: JsonValue =
            serde_json::from_slice(&bytes).map_err(|e| SubmitError::InvalidPayload {
                reason: e.to_string(),
            })?;
        let fields = json_fields(&value)?;
        Ok((form::prepare(fields, Vec::new()), None))
    }
}

/// Flattens a submitted JSON object into form fields, stringifying scalars.
fn json_fields(value: &JsonValue) -> Result<Vec<FormField>, SubmitError> {
    let map = value.as_object().ok_or_else(|| SubmitError::InvalidPayload {
        reason: "expected a JSON object of form fields".to_string(),
    })?;

    Ok(map
        .iter()
        .map(|(name, value)| {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            FormField::new(name.clone(), value)
        })
        .collect())
}

/// Reads multipart parts, spooling file uploads into the given directory.
async fn read_multipart(
    mut multipart: Multipart,
    spool: &TempDir,
    max_upload_bytes: u64,
) -> Result<(Vec<FormField>, Vec<FileAttachment>), SubmitError> {
    let mut fields = Vec::new();
    let mut files = Vec::new();
    let mut index = 0u32;

    while let Some(part) = multipart.next_field().await.map_err(|e| {
        SubmitError::InvalidPayload {
            reason: e.to_string(),
        }
    })? {
        let name = part.name().unwrap_or_default().to_string();

        if let Some(file_name) = part.file_name().map(str::to_string) {
            let mime_type = part
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = part.bytes().await.map_err(|e| SubmitError::InvalidPayload {
                reason: e.to_string(),
            })?;
            if data.len() as u64 > max_upload_bytes {
                return Err(SubmitError::UploadTooLarge {
                    limit_bytes: max_upload_bytes,
                });
            }

            let path = spool.path().join(format!("upload-{index}"));
            index += 1;
            tokio::fs::write(&path, &data)
                .await
                .map_err(|e| SubmitError::SpoolFailed {
                    reason: e.to_string(),
                })?;

            files.push(FileAttachment {
                field_name: name,
                file_name,
                mime_type,
                path,
                size: data.len() as u64,
            });
        } else {
            let value = part.text().await.map_err(|e| SubmitError::InvalidPayload {
                reason: e.to_string(),
            })?;
            fields.push(FormField::new(name, value));
        }
    }

    if files.is_empty() && fields.is_empty() {
        warn!("submission carried no usable fields");
    }

    Ok((fields, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashwire_relay::NetworkError;
    use serde_json::json;

    #[test]
    fn relay_failures_map_to_distinct_statuses() {
        let widget_id = WidgetId::new(1).expect("positive id");

        assert_eq!(
            relay_status(&RelayError::NotFound { widget_id }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            relay_status(&RelayError::NotConfigured { widget_id }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            relay_status(&RelayError::NetworkFailure(NetworkError::Timeout {
                url: "https://hooks.example.net/run".to_string(),
            })),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            relay_status(&RelayError::UpstreamStatus { status: 500 }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            relay_status(&RelayError::StoreUnavailable {
                reason: "down".to_string(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            relay_status(&RelayError::PermissionDenied { widget_id }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn json_fields_stringify_scalars() {
        let fields = json_fields(&json!({
            "comment": "hello",
            "count": 3,
            "flag": true,
            "empty": null,
        }))
        .expect("object payload");

        let find = |name: &str| {
            fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.value.clone())
                .expect("field present")
        };
        assert_eq!(find("comment"), "hello");
        assert_eq!(find("count"), "3");
        assert_eq!(find("flag"), "true");
        assert_eq!(find("empty"), "");
    }

    #[test]
    fn json_fields_reject_non_objects() {
        assert!(json_fields(&json!(["a", "b"])).is_err());
        assert!(json_fields(&json!("bare")).is_err());
    }

    #[test]
    fn failure_envelope_shape() {
        let widget_id = WidgetId::new(2).expect("positive id");
        let err = RelayError::NotConfigured { widget_id };

        let envelope = FailureEnvelope {
            success: false,
            message: err.to_string(),
            code: err.code(),
        };
        let json = serde_json::to_value(&envelope).expect("serialize");

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "not_configured");
        assert!(json["message"].as_str().expect("message").contains("2"));
    }
}
