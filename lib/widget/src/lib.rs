//! Dashboard widget and webhook domain types for the dashwire platform.
//!
//! This crate provides:
//!
//! - **Widget types**: widget configuration with type-specific settings
//! - **Webhook types**: per-widget outbound call configuration
//! - **Call statistics**: latest-call records and in-flight outcomes

pub mod stats;
pub mod webhook;
pub mod widget;

pub use stats::{CallOutcome, CallRecord};
pub use webhook::{HeaderPair, HttpMethod, UnknownMethodError, WebhookConfig};
pub use widget::{
    ChartKind, DataMode, FormFieldKind, FormFieldSpec, Position, WidgetConfig, WidgetSettings,
    WidgetStatus, WidgetType,
};
