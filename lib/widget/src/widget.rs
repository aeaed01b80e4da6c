//! Widget definitions and per-type settings.
//!
//! A widget is a dashboard panel bound to one external webhook and a
//! rendering mode. The rendering mode is carried by [`WidgetSettings`], a
//! tagged union matched exhaustively wherever behavior branches on it.

use chrono::{DateTime, Utc};
use dashwire_core::{DashboardId, WidgetId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The rendering mode of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// Labels plus a numeric series.
    Chart,
    /// A KPI pair or a link list.
    Data,
    /// Form-driven widget with a free-form payload.
    Custom,
}

impl WidgetType {
    /// Returns the type name as used on the wire and in the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Data => "data",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a widget is shown on its dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetStatus {
    /// Rendered on the dashboard.
    #[default]
    Active,
    /// Kept but hidden.
    Inactive,
}

impl WidgetStatus {
    /// Returns the status name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Grid placement of a widget on its dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column offset.
    pub x: i32,
    /// Row offset.
    pub y: i32,
    /// Width in grid units.
    pub width: i32,
    /// Height in grid units.
    pub height: i32,
}

/// How a chart widget draws its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Pie,
}

/// Whether a data widget renders a KPI pair or a link list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// Two headline values with an optional link.
    #[default]
    Kpi,
    /// A list of labeled links.
    List,
}

/// The input kind of a field in a custom widget's submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    #[default]
    Text,
    Number,
    File,
}

/// A field in a custom widget's submission form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldSpec {
    /// Field name, used as the outbound payload key.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Input kind.
    #[serde(default)]
    pub kind: FormFieldKind,
    /// Whether submission requires a value.
    #[serde(default)]
    pub required: bool,
}

/// Type-specific widget settings.
///
/// The serde tag doubles as the widget type, so a stored settings document
/// deserializes straight into the right variant and dispatch stays exhaustive
/// at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetSettings {
    /// Chart rendering: labels plus a numeric series.
    Chart {
        #[serde(default)]
        kind: ChartKind,
        /// Fixed upper bound for the y axis; derived from the series when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y_max: Option<f64>,
        /// Default JSON body merged under the webhook's body template.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_defaults: Option<JsonValue>,
    },
    /// KPI pair or link list.
    Data {
        #[serde(default)]
        mode: DataMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_defaults: Option<JsonValue>,
    },
    /// Custom form-driven widget.
    Custom {
        /// Fields rendered in the submission form.
        #[serde(default)]
        fields: Vec<FormFieldSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_defaults: Option<JsonValue>,
    },
}

impl WidgetSettings {
    /// Returns the widget type this settings document belongs to.
    #[must_use]
    pub const fn widget_type(&self) -> WidgetType {
        match self {
            Self::Chart { .. } => WidgetType::Chart,
            Self::Data { .. } => WidgetType::Data,
            Self::Custom { .. } => WidgetType::Custom,
        }
    }

    /// Returns the widget-level default webhook body, if configured.
    #[must_use]
    pub const fn body_defaults(&self) -> Option<&JsonValue> {
        match self {
            Self::Chart { body_defaults, .. }
            | Self::Data { body_defaults, .. }
            | Self::Custom { body_defaults, .. } => body_defaults.as_ref(),
        }
    }
}

/// A widget as stored on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Widget ID.
    pub id: WidgetId,
    /// Dashboard that owns this widget.
    pub dashboard_id: DashboardId,
    /// Panel title.
    pub title: String,
    /// Type-specific settings.
    pub settings: WidgetSettings,
    /// Grid placement.
    #[serde(default)]
    pub position: Position,
    /// Visibility status.
    #[serde(default)]
    pub status: WidgetStatus,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl WidgetConfig {
    /// Returns the widget's rendering mode.
    #[must_use]
    pub const fn widget_type(&self) -> WidgetType {
        self.settings.widget_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_tag_is_the_widget_type() {
        let settings = WidgetSettings::Chart {
            kind: ChartKind::Bar,
            y_max: Some(100.0),
            body_defaults: None,
        };
        let json = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(json["type"], "chart");
        assert_eq!(settings.widget_type(), WidgetType::Chart);
    }

    #[test]
    fn data_settings_default_to_kpi_mode() {
        let settings: WidgetSettings =
            serde_json::from_value(serde_json::json!({"type": "data"})).expect("deserialize");
        match settings {
            WidgetSettings::Data { mode, .. } => assert_eq!(mode, DataMode::Kpi),
            other => panic!("expected data settings, got {other:?}"),
        }
    }

    #[test]
    fn custom_settings_carry_form_fields() {
        let settings: WidgetSettings = serde_json::from_value(serde_json::json!({
            "type": "custom",
            "fields": [
                {"name": "query", "label": "Query", "required": true},
                {"name": "report", "label": "Report", "kind": "file"},
            ],
        }))
        .expect("deserialize");

        match settings {
            WidgetSettings::Custom { ref fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].kind, FormFieldKind::Text);
                assert!(fields[0].required);
                assert_eq!(fields[1].kind, FormFieldKind::File);
            }
            other => panic!("expected custom settings, got {other:?}"),
        }
    }

    #[test]
    fn body_defaults_accessor_spans_all_variants() {
        let defaults = serde_json::json!({"period": "7d"});
        let settings = WidgetSettings::Data {
            mode: DataMode::List,
            body_defaults: Some(defaults.clone()),
        };
        assert_eq!(settings.body_defaults(), Some(&defaults));

        let bare = WidgetSettings::Custom {
            fields: Vec::new(),
            body_defaults: None,
        };
        assert!(bare.body_defaults().is_none());
    }

    #[test]
    fn widget_status_defaults_to_active() {
        assert_eq!(WidgetStatus::default(), WidgetStatus::Active);
        assert_eq!(WidgetStatus::Inactive.as_str(), "inactive");
    }
}
