//! Webhook configuration for widgets.
//!
//! Each widget has at most one webhook. The configuration is saved alongside
//! the widget and deleted with it; a widget without one cannot be refreshed.

use chrono::{DateTime, Utc};
use dashwire_core::WidgetId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// HTTP methods supported for webhook calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Returns true if this method carries a request body.
    ///
    /// GET data is serialized into query parameters instead.
    #[must_use]
    pub const fn sends_body(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown HTTP method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethodError {
    /// The rejected method name.
    pub method: String,
}

impl fmt::Display for UnknownMethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HTTP method: {}", self.method)
    }
}

impl std::error::Error for UnknownMethodError {}

impl FromStr for HttpMethod {
    type Err = UnknownMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownMethodError {
                method: s.to_string(),
            }),
        }
    }
}

/// A single outbound header.
///
/// Headers keep their configured order; when two entries share a name, the
/// later one wins in the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    /// Header name.
    pub name: String,
    /// Header value, applied verbatim.
    pub value: String,
}

impl HeaderPair {
    /// Creates a header pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Webhook call configuration, one per widget at most.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Widget this webhook belongs to.
    pub widget_id: WidgetId,
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Custom headers, in configured order.
    #[serde(default)]
    pub headers: Vec<HeaderPair>,
    /// Static JSON body template, merged over the widget's body defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<JsonValue>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_serializes_uppercase() {
        let json = serde_json::to_string(&HttpMethod::Post).expect("serialize");
        assert_eq!(json, "\"POST\"");
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().expect("parses"), HttpMethod::Get);
        assert_eq!(
            "DELETE".parse::<HttpMethod>().expect("parses"),
            HttpMethod::Delete
        );
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn get_sends_no_body() {
        assert!(!HttpMethod::Get.sends_body());
        assert!(HttpMethod::Post.sends_body());
        assert!(HttpMethod::Put.sends_body());
        assert!(HttpMethod::Delete.sends_body());
    }

    #[test]
    fn headers_default_to_empty_on_deserialize() {
        let config: WebhookConfig = serde_json::from_value(serde_json::json!({
            "widget_id": 1,
            "url": "https://hooks.example.net/run",
            "method": "GET",
            "created_at": "2026-01-05T10:00:00Z",
            "updated_at": "2026-01-05T10:00:00Z",
        }))
        .expect("deserialize");

        assert!(config.headers.is_empty());
        assert!(config.body_template.is_none());
    }
}
