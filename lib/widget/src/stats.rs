//! Call statistics for widgets.
//!
//! The store keeps one row per widget holding only the latest call: a
//! monotonic counter plus a snapshot of the most recent outcome, success or
//! failure. Concurrent refreshes race last-write-wins on the snapshot; the
//! counter only ever increases.

use chrono::{DateTime, Utc};
use dashwire_core::WidgetId;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Persisted call statistics for a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Widget these statistics belong to.
    pub widget_id: WidgetId,
    /// When the most recent call finished.
    pub last_called: DateTime<Utc>,
    /// Snapshot of the most recent outcome.
    pub last_response: JsonValue,
    /// Total number of calls made for this widget.
    pub call_count: i64,
}

/// The outcome of one webhook call, handed to the stats recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    /// Whether the call produced a usable result.
    pub success: bool,
    /// Upstream HTTP status, when a response was received at all.
    pub upstream_status: Option<u16>,
    /// Snapshot persisted as the widget's `last_response`.
    pub snapshot: JsonValue,
    /// When the call finished.
    pub called_at: DateTime<Utc>,
}

impl CallOutcome {
    /// Builds a success outcome from an upstream status and decoded body.
    #[must_use]
    pub fn success(status: u16, body: JsonValue) -> Self {
        Self {
            success: true,
            upstream_status: Some(status),
            snapshot: json!({"status": status, "body": body}),
            called_at: Utc::now(),
        }
    }

    /// Builds a failure outcome.
    ///
    /// The snapshot embeds the error code and message; the upstream status
    /// and a best-effort body snapshot are included when a response arrived
    /// before the failure was determined.
    #[must_use]
    pub fn failure(
        code: &str,
        message: impl Into<String>,
        status: Option<u16>,
        body: Option<JsonValue>,
    ) -> Self {
        let mut snapshot = json!({
            "error": {"code": code, "message": message.into()},
        });
        if let Some(status) = status {
            snapshot["status"] = status.into();
        }
        if let Some(body) = body {
            snapshot["body"] = body;
        }
        Self {
            success: false,
            upstream_status: status,
            snapshot,
            called_at: Utc::now(),
        }
    }
}
