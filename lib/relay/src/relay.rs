//! Webhook-relay orchestration.
//!
//! One refresh walks resolving, calling, normalizing, and recording in
//! order, with typed error exits at every stage. The store and the HTTP
//! client are injected at construction, so the pipeline is exercised in
//! tests without a database or a network.

use crate::client::{HttpClient, OutboundBody, RawResponse, WebhookRequest};
use crate::error::RelayError;
use crate::normalize::{NormalizedResult, normalize};
use crate::stats::StatsRecorder;
use crate::store::WidgetStore;
use dashwire_core::WidgetId;
use dashwire_widget::{CallOutcome, WebhookConfig, WidgetConfig};
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument};

/// Relay construction options.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Bound on each outbound webhook call.
    pub timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// The widget webhook-relay.
///
/// Ties widget resolution, the outbound call, response normalization, and
/// statistics recording into one operation.
pub struct WidgetRelay<S, C> {
    store: S,
    client: C,
    options: RelayOptions,
}

impl<S: WidgetStore, C: HttpClient> WidgetRelay<S, C> {
    /// Creates a relay over the given store and client.
    pub fn new(store: S, client: C, options: RelayOptions) -> Self {
        Self {
            store,
            client,
            options,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Refreshes a widget by calling its webhook and shaping the response.
    ///
    /// A form override (the submission path) replaces the stored body
    /// entirely. Every invocation that performs a webhook call records its
    /// outcome exactly once, success or failure.
    ///
    /// # Errors
    ///
    /// Returns a typed `RelayError`; `NotConfigured` is returned before any
    /// network activity when the widget has no webhook.
    #[instrument(skip(self, form_override), fields(widget_id = %widget_id))]
    pub async fn refresh(
        &self,
        widget_id: WidgetId,
        form_override: Option<OutboundBody>,
    ) -> Result<NormalizedResult, RelayError> {
        // Resolving
        let record = self.store.get_widget(widget_id).await?;
        let record = record.ok_or(RelayError::NotFound { widget_id })?;
        let webhook = record
            .webhook
            .as_ref()
            .ok_or(RelayError::NotConfigured { widget_id })?;

        // Calling
        let body = match form_override {
            Some(body) => body,
            None => static_body(&record.widget, webhook),
        };
        let request = WebhookRequest {
            url: webhook.url.clone(),
            method: webhook.method,
            headers: webhook.headers.clone(),
            body,
            timeout: self.options.timeout,
        };

        let recorder = StatsRecorder::new(&self.store);

        let response = match self.client.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = RelayError::from(e);
                let outcome = CallOutcome::failure(err.code(), err.to_string(), None, None);
                recorder.record(widget_id, &outcome).await;
                return Err(err);
            }
        };

        if !response.is_success() {
            let err = RelayError::UpstreamStatus {
                status: response.status,
            };
            let outcome = CallOutcome::failure(
                err.code(),
                err.to_string(),
                Some(response.status),
                Some(response_snapshot(&response)),
            );
            recorder.record(widget_id, &outcome).await;
            return Err(err);
        }

        // Normalizing
        let normalized = match normalize(&record.widget.settings, &response) {
            Ok(normalized) => normalized,
            Err(e) => {
                let err = RelayError::from(e);
                let outcome = CallOutcome::failure(
                    err.code(),
                    err.to_string(),
                    Some(response.status),
                    Some(response_snapshot(&response)),
                );
                recorder.record(widget_id, &outcome).await;
                return Err(err);
            }
        };

        // Recording
        let outcome = CallOutcome::success(response.status, response_snapshot(&response));
        recorder.record(widget_id, &outcome).await;

        debug!(widget_id = %widget_id, "widget refreshed");
        Ok(normalized)
    }
}

/// Builds the stored outbound body: the webhook's body template shallow-merged
/// over the widget's body defaults, template keys winning.
fn static_body(widget: &WidgetConfig, webhook: &WebhookConfig) -> OutboundBody {
    let defaults = widget.settings.body_defaults();
    let template = webhook.body_template.as_ref();

    match (defaults, template) {
        (None, None) => OutboundBody::Empty,
        (Some(defaults), None) => OutboundBody::Json(defaults.clone()),
        (None, Some(template)) => OutboundBody::Json(template.clone()),
        (Some(JsonValue::Object(defaults)), Some(JsonValue::Object(template))) => {
            let mut merged = defaults.clone();
            for (key, value) in template {
                merged.insert(key.clone(), value.clone());
            }
            OutboundBody::Json(JsonValue::Object(merged))
        }
        (Some(_), Some(template)) => OutboundBody::Json(template.clone()),
    }
}

/// Builds a best-effort JSON snapshot of a raw response for persistence.
fn response_snapshot(response: &RawResponse) -> JsonValue {
    if let Ok(value) = serde_json::from_slice::<JsonValue>(&response.body) {
        return value;
    }
    match std::str::from_utf8(&response.body) {
        Ok(text) => JsonValue::String(text.to_string()),
        Err(_) => json!({
            "content_type": response.content_type().unwrap_or("application/octet-stream"),
            "bytes_len": response.body.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockHttpClient;
    use crate::error::{NetworkError, StoreError};
    use crate::form::FormField;
    use crate::normalize::{ListData, Trend};
    use crate::store::{InMemoryStore, WidgetRecord};
    use chrono::Utc;
    use dashwire_core::DashboardId;
    use dashwire_widget::{
        ChartKind, DataMode, HeaderPair, HttpMethod, Position, WidgetSettings, WidgetStatus,
    };
    use serde_json::json;

    fn widget(widget_id: i64, settings: WidgetSettings) -> WidgetConfig {
        let now = Utc::now();
        WidgetConfig {
            id: WidgetId::new(widget_id).expect("positive id"),
            dashboard_id: DashboardId::new(1).expect("positive id"),
            title: "Test widget".to_string(),
            settings,
            position: Position::default(),
            status: WidgetStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn webhook(widget_id: i64) -> WebhookConfig {
        let now = Utc::now();
        WebhookConfig {
            widget_id: WidgetId::new(widget_id).expect("positive id"),
            url: "https://hooks.example.net/run".to_string(),
            method: HttpMethod::Post,
            headers: vec![HeaderPair::new("X-Token", "abc")],
            body_template: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn chart_settings() -> WidgetSettings {
        WidgetSettings::Chart {
            kind: ChartKind::Line,
            y_max: None,
            body_defaults: None,
        }
    }

    fn store_with(record: WidgetRecord) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert(record);
        store
    }

    fn make_relay<C: HttpClient>(store: InMemoryStore, client: C) -> WidgetRelay<InMemoryStore, C> {
        WidgetRelay::new(store, client, RelayOptions::default())
    }

    #[tokio::test]
    async fn refresh_succeeds_and_records_a_call() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"labels": ["a", "b"], "data": [1, 2]}),
        ));
        let relay = make_relay(store, client);

        let result = relay.refresh(widget_id, None).await.expect("refresh ok");

        match result {
            NormalizedResult::Chart(chart) => {
                assert_eq!(chart.labels, vec!["a", "b"]);
                assert_eq!(chart.series, vec![1.0, 2.0]);
            }
            other => panic!("expected chart, got {other:?}"),
        }

        let record = relay.store().call_record(widget_id).expect("call recorded");
        assert_eq!(record.call_count, 1);
        assert_eq!(record.last_response["status"], 200);
        assert_eq!(record.last_response["body"]["labels"][0], "a");
    }

    #[tokio::test]
    async fn missing_widget_is_not_found() {
        let relay = make_relay(
            InMemoryStore::new(),
            MockHttpClient::succeeding(MockHttpClient::json_response(200, &json!({}))),
        );
        let widget_id = WidgetId::new(99).expect("positive id");

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err, RelayError::NotFound { widget_id });
    }

    #[tokio::test]
    async fn unconfigured_widget_never_touches_the_network() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: None,
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(200, &json!({})));
        let relay = make_relay(store, client);

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err, RelayError::NotConfigured { widget_id });
        assert_eq!(relay.client.call_count(), 0);
        assert!(relay.store().call_record(widget_id).is_none());
    }

    #[tokio::test]
    async fn upstream_error_status_is_typed_and_recorded() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            500,
            &json!({"error": "boom"}),
        ));
        let relay = make_relay(store, client);

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err, RelayError::UpstreamStatus { status: 500 });
        let record = relay.store().call_record(widget_id).expect("call recorded");
        assert_eq!(record.call_count, 1);
        assert_eq!(record.last_response["error"]["code"], "upstream_status");
        assert_eq!(record.last_response["status"], 500);
    }

    #[tokio::test]
    async fn network_failure_is_typed_and_recorded() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::failing(NetworkError::Timeout {
            url: "https://hooks.example.net/run".to_string(),
        });
        let relay = make_relay(store, client);

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        match err {
            RelayError::NetworkFailure(ref network) => assert!(network.is_timeout()),
            ref other => panic!("expected network failure, got {other:?}"),
        }
        let record = relay.store().call_record(widget_id).expect("call recorded");
        assert_eq!(record.call_count, 1);
        assert_eq!(record.last_response["error"]["code"], "network_failure");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_response_shape_and_recorded() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(RawResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: b"{definitely not json".to_vec(),
        });
        let relay = make_relay(store, client);

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err.code(), "bad_response_shape");
        let record = relay.store().call_record(widget_id).expect("call recorded");
        assert_eq!(record.call_count, 1);
        assert_eq!(record.last_response["error"]["code"], "bad_response_shape");
    }

    #[tokio::test]
    async fn store_unavailable_short_circuits_without_stats() {
        let mut store = InMemoryStore::new();
        store.fail_with = Some(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(200, &json!({})));
        let relay = make_relay(store, client);
        let widget_id = WidgetId::new(1).expect("positive id");

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err.code(), "store_unavailable");
        assert_eq!(relay.client.call_count(), 0);
    }

    #[tokio::test]
    async fn permission_denied_passes_through() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let mut store = InMemoryStore::new();
        store.fail_with = Some(StoreError::PermissionDenied { widget_id });
        let relay = make_relay(
            store,
            MockHttpClient::succeeding(MockHttpClient::json_response(200, &json!({}))),
        );

        let err = relay.refresh(widget_id, None).await.expect_err("must fail");

        assert_eq!(err, RelayError::PermissionDenied { widget_id });
    }

    #[tokio::test]
    async fn form_override_replaces_the_stored_body() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let mut hook = webhook(1);
        hook.body_template = Some(json!({"source": "stored"}));
        let store = store_with(WidgetRecord {
            widget: widget(
                1,
                WidgetSettings::Custom {
                    fields: Vec::new(),
                    body_defaults: None,
                },
            ),
            webhook: Some(hook),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"message": "received"}),
        ));
        let relay = make_relay(store, client);

        let override_body = OutboundBody::Multipart {
            fields: vec![FormField::new("comment", "hello")],
            files: Vec::new(),
        };
        relay
            .refresh(widget_id, Some(override_body.clone()))
            .await
            .expect("refresh ok");

        let calls = relay.client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, override_body);
    }

    #[tokio::test]
    async fn stored_body_merges_template_over_defaults() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let mut hook = webhook(1);
        hook.body_template = Some(json!({"period": "30d", "source": "template"}));
        let store = store_with(WidgetRecord {
            widget: widget(
                1,
                WidgetSettings::Chart {
                    kind: ChartKind::Line,
                    y_max: None,
                    body_defaults: Some(json!({"period": "7d", "widget": "chart"})),
                },
            ),
            webhook: Some(hook),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"labels": [], "data": []}),
        ));
        let relay = make_relay(store, client);

        relay.refresh(widget_id, None).await.expect("refresh ok");

        let calls = relay.client.calls();
        let OutboundBody::Json(ref body) = calls[0].body else {
            panic!("expected json body");
        };
        assert_eq!(body["period"], "30d");
        assert_eq!(body["source"], "template");
        assert_eq!(body["widget"], "chart");
    }

    #[tokio::test]
    async fn kpi_and_list_paths_round_trip() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(
                1,
                WidgetSettings::Data {
                    mode: DataMode::Kpi,
                    body_defaults: None,
                },
            ),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"value1": "42", "value2": "-3"}),
        ));
        let relay = make_relay(store, client);

        match relay.refresh(widget_id, None).await.expect("refresh ok") {
            NormalizedResult::Kpi(kpi) => assert_eq!(kpi.trend, Trend::Down),
            other => panic!("expected kpi, got {other:?}"),
        }

        let store = store_with(WidgetRecord {
            widget: widget(
                1,
                WidgetSettings::Data {
                    mode: DataMode::List,
                    body_defaults: None,
                },
            ),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"items": []}),
        ));
        let relay = make_relay(store, client);

        match relay.refresh(widget_id, None).await.expect("refresh ok") {
            NormalizedResult::List(list) => assert_eq!(list, ListData::Empty),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_refreshes_each_count() {
        let widget_id = WidgetId::new(1).expect("positive id");
        let store = store_with(WidgetRecord {
            widget: widget(1, chart_settings()),
            webhook: Some(webhook(1)),
        });
        let client = MockHttpClient::succeeding(MockHttpClient::json_response(
            200,
            &json!({"labels": [], "data": []}),
        ));
        let relay = make_relay(store, client);

        let (a, b) = tokio::join!(relay.refresh(widget_id, None), relay.refresh(widget_id, None));
        a.expect("first refresh ok");
        b.expect("second refresh ok");

        let record = relay.store().call_record(widget_id).expect("call recorded");
        assert_eq!(record.call_count, 2);
    }

    #[test]
    fn binary_snapshot_references_content() {
        let response = RawResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/pdf".to_string())],
            body: vec![0xff, 0xfe, 0x00, 0x01],
        };

        let snapshot = response_snapshot(&response);

        assert_eq!(snapshot["content_type"], "application/pdf");
        assert_eq!(snapshot["bytes_len"], 4);
    }
}
