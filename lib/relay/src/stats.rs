//! Call-statistics recording.
//!
//! The recorder writes the outcome of every webhook call through the store.
//! The write is unconditional and must never fail the refresh itself: a
//! persistence failure is logged and swallowed, leaving the relay's
//! already-determined result untouched.

use crate::store::WidgetStore;
use dashwire_core::WidgetId;
use dashwire_widget::CallOutcome;
use tracing::warn;

/// Records call outcomes through the widget store.
pub struct StatsRecorder<'a, S: WidgetStore> {
    store: &'a S,
}

impl<'a, S: WidgetStore> StatsRecorder<'a, S> {
    /// Creates a recorder over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persists a call outcome for a widget.
    ///
    /// Never fails: a store error is reported via `tracing::warn!` and
    /// otherwise dropped.
    pub async fn record(&self, widget_id: WidgetId, outcome: &CallOutcome) {
        if let Err(e) = self.store.record_call(widget_id, outcome).await {
            warn!(widget_id = %widget_id, error = %e, "failed to record call statistics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn recorder_persists_outcomes() {
        let store = InMemoryStore::new();
        let widget_id = WidgetId::new(4).expect("positive id");
        let recorder = StatsRecorder::new(&store);

        recorder
            .record(widget_id, &CallOutcome::success(200, json!({"ok": true})))
            .await;

        let record = store.call_record(widget_id).expect("record exists");
        assert_eq!(record.call_count, 1);
        assert_eq!(record.last_response["body"]["ok"], true);
    }

    #[tokio::test]
    async fn recording_failure_is_swallowed() {
        let mut store = InMemoryStore::new();
        store.fail_recording_with = Some(StoreError::Unavailable {
            reason: "pool exhausted".to_string(),
        });
        let widget_id = WidgetId::new(4).expect("positive id");

        let recorder = StatsRecorder::new(&store);
        recorder
            .record(widget_id, &CallOutcome::success(200, json!({})))
            .await;

        assert!(store.call_record(widget_id).is_none());
    }
}
