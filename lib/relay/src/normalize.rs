//! Response normalization per widget type.
//!
//! Maps a raw webhook response into the fixed shape each widget type renders.
//! The branch on content-type is a case-insensitive prefix match; the branch
//! on widget type is exhaustive. Absent fields fall back to defined defaults,
//! while a body that claims to be JSON and fails to parse is an error.

use crate::client::RawResponse;
use crate::error::NormalizeError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use dashwire_widget::{DataMode, WidgetSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Chart payload: labels plus a numeric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<f64>,
    /// Upper bound for the y axis; the configured override or the series
    /// maximum, absent for an empty series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
}

/// Direction classification for a KPI's second value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    None,
}

/// KPI payload: two headline values with an optional link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiData {
    pub value1: String,
    pub value2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    /// Derived from `value2`'s sign; never stored.
    pub trend: Trend,
}

/// One entry of a list payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub label: String,
    pub url: String,
}

/// List payload, with an explicit empty marker so callers can render an
/// empty state instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum ListData {
    Empty,
    Entries(Vec<ListItem>),
}

impl ListData {
    /// Returns true for the explicit empty marker.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The body of a custom payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomBody {
    /// Decoded JSON, preserved whole.
    Json { value: JsonValue },
    /// Plain text.
    Text { value: String },
    /// Uninterpreted binary content, carried as base64.
    Binary { bytes_len: usize, data: String },
}

/// Custom-widget payload: the richest shape the response offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPayload {
    /// Upstream content type.
    pub content_type: String,
    /// The decoded body.
    pub body: CustomBody,
    /// Explicit HTML fragment, when the response carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Plain message, when that was the richest shape available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Link to downloadable content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl CustomPayload {
    /// Returns the displayable content, applying the shape priority:
    /// html, then download link, then message, then pretty-printed JSON,
    /// then raw text.
    #[must_use]
    pub fn text(&self) -> String {
        if let Some(html) = &self.html {
            return html.clone();
        }
        if let Some(url) = &self.download_url {
            return url.clone();
        }
        if let Some(message) = &self.message {
            return message.clone();
        }
        match &self.body {
            CustomBody::Json { value } => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            CustomBody::Text { value } => value.clone(),
            CustomBody::Binary { bytes_len, .. } => format!("{bytes_len} bytes"),
        }
    }
}

/// Normalized relay output, tagged per widget rendering mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedResult {
    Chart(ChartData),
    Kpi(KpiData),
    List(ListData),
    Custom(CustomPayload),
}

/// The decoded response body, branched on content type.
enum DecodedBody {
    Json(JsonValue),
    Text(String),
    Binary,
}

/// Shapes a raw response for the given widget settings.
///
/// # Errors
///
/// Returns `NormalizeError::InvalidJson` when the body declares
/// `application/json` and fails to parse. Absent fields never error.
pub fn normalize(
    settings: &WidgetSettings,
    response: &RawResponse,
) -> Result<NormalizedResult, NormalizeError> {
    let decoded = decode_body(response)?;

    let result = match settings {
        WidgetSettings::Chart { y_max, .. } => {
            NormalizedResult::Chart(chart_data(&decoded, *y_max))
        }
        WidgetSettings::Data { mode, .. } => match mode {
            DataMode::Kpi => NormalizedResult::Kpi(kpi_data(&decoded)),
            DataMode::List => NormalizedResult::List(list_data(&decoded)),
        },
        WidgetSettings::Custom { .. } => {
            NormalizedResult::Custom(custom_payload(decoded, response))
        }
    };

    Ok(result)
}

fn decode_body(response: &RawResponse) -> Result<DecodedBody, NormalizeError> {
    let content_type = response.content_type().unwrap_or("");

    if prefix_matches(content_type, "application/json") {
        let value = serde_json::from_slice(&response.body).map_err(|e| {
            NormalizeError::InvalidJson {
                reason: e.to_string(),
            }
        })?;
        Ok(DecodedBody::Json(value))
    } else if prefix_matches(content_type, "text/") {
        Ok(DecodedBody::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        ))
    } else {
        Ok(DecodedBody::Binary)
    }
}

fn prefix_matches(content_type: &str, prefix: &str) -> bool {
    content_type.len() >= prefix.len()
        && content_type.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn chart_data(decoded: &DecodedBody, y_max_override: Option<f64>) -> ChartData {
    let (labels, series) = match decoded {
        DecodedBody::Json(JsonValue::Object(map)) => {
            let labels = map
                .get("labels")
                .and_then(JsonValue::as_array)
                .map(|items| items.iter().map(label_string).collect())
                .unwrap_or_default();
            let series = map
                .get("data")
                .and_then(JsonValue::as_array)
                .map(|items| items.iter().map(series_number).collect())
                .unwrap_or_default();
            (labels, series)
        }
        _ => (Vec::new(), Vec::new()),
    };

    let y_max = y_max_override.or_else(|| {
        series
            .iter()
            .copied()
            .reduce(f64::max)
            .filter(|max| max.is_finite())
    });

    ChartData {
        labels,
        series,
        y_max,
    }
}

fn label_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn series_number(value: &JsonValue) -> f64 {
    match value {
        JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
        JsonValue::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn kpi_data(decoded: &DecodedBody) -> KpiData {
    let (value1, value2, link_url) = match decoded {
        DecodedBody::Json(JsonValue::Object(map)) => (
            field_string(map, "value1"),
            field_string(map, "value2"),
            map.get("value3_url")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
        ),
        _ => (String::new(), String::new(), None),
    };

    let trend = classify_trend(&value2);

    KpiData {
        value1,
        value2,
        link_url,
        trend,
    }
}

fn field_string(map: &serde_json::Map<String, JsonValue>, key: &str) -> String {
    match map.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Classifies the second KPI value: a leading `-` reads as down, a positive
/// number as up, and zero, absent, or unparseable values as neither.
fn classify_trend(value2: &str) -> Trend {
    let trimmed = value2.trim();
    if trimmed.starts_with('-') {
        Trend::Down
    } else {
        match trimmed.parse::<f64>() {
            Ok(n) if n > 0.0 => Trend::Up,
            _ => Trend::None,
        }
    }
}

fn list_data(decoded: &DecodedBody) -> ListData {
    let entries: Vec<ListItem> = match decoded {
        DecodedBody::Json(JsonValue::Object(map)) => map
            .get("items")
            .and_then(JsonValue::as_array)
            .map(|items| items.iter().filter_map(list_item).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    if entries.is_empty() {
        ListData::Empty
    } else {
        ListData::Entries(entries)
    }
}

fn list_item(value: &JsonValue) -> Option<ListItem> {
    match value {
        JsonValue::Object(map) => {
            let label = field_string(map, "label");
            let url = field_string(map, "url");
            if label.is_empty() && url.is_empty() {
                None
            } else {
                Some(ListItem { label, url })
            }
        }
        JsonValue::String(s) => Some(ListItem {
            label: s.clone(),
            url: String::new(),
        }),
        _ => None,
    }
}

fn custom_payload(decoded: DecodedBody, response: &RawResponse) -> CustomPayload {
    let content_type = response
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    match decoded {
        DecodedBody::Json(value) => {
            // Shape priority, first match wins.
            let (html, download_url, message) = match value.as_object() {
                Some(map) => {
                    let html = map.get("html").and_then(JsonValue::as_str);
                    let download = map.get("download_url").and_then(JsonValue::as_str);
                    let msg = map.get("message").and_then(JsonValue::as_str);
                    if let Some(html) = html {
                        (Some(html.to_string()), None, None)
                    } else if let Some(download) = download {
                        (None, Some(download.to_string()), None)
                    } else if let Some(msg) = msg {
                        (None, None, Some(msg.to_string()))
                    } else {
                        (None, None, None)
                    }
                }
                None => (None, None, None),
            };

            let body = match value {
                JsonValue::String(s) => CustomBody::Text { value: s },
                other => CustomBody::Json { value: other },
            };

            CustomPayload {
                content_type,
                body,
                html,
                message,
                download_url,
            }
        }
        DecodedBody::Text(text) => CustomPayload {
            content_type,
            body: CustomBody::Text {
                value: text.clone(),
            },
            html: None,
            message: Some(text),
            download_url: None,
        },
        DecodedBody::Binary => CustomPayload {
            content_type,
            body: CustomBody::Binary {
                bytes_len: response.body.len(),
                data: BASE64.encode(&response.body),
            },
            html: None,
            message: None,
            download_url: None,
        },
    }
}
