//! Widget webhook-relay pipeline for the dashwire platform.
//!
//! This crate provides:
//!
//! - **HTTP client adapter**: trait-seamed outbound webhook calls
//! - **Response normalizer**: raw responses shaped per widget type
//! - **Webhook relay**: resolve, call, normalize, record as one operation
//! - **Stats recorder**: unconditional latest-call bookkeeping
//! - **Form-submission adapter**: user-submitted data as the outbound body

pub mod client;
pub mod error;
pub mod form;
pub mod normalize;
pub mod relay;
pub mod stats;
pub mod store;

pub use client::{
    HttpClient, MockHttpClient, OutboundBody, RawResponse, ReqwestClient, WebhookRequest,
};
pub use error::{NetworkError, NormalizeError, RelayError, StoreError};
pub use form::{FileAttachment, FormField, RESERVED_FIELDS, prepare, sanitize_text};
pub use normalize::{
    ChartData, CustomBody, CustomPayload, KpiData, ListData, ListItem, NormalizedResult, Trend,
    normalize,
};
pub use relay::{RelayOptions, WidgetRelay};
pub use stats::StatsRecorder;
pub use store::{InMemoryStore, WidgetRecord, WidgetStore};
