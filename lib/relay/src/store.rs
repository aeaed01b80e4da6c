//! The widget store boundary.
//!
//! Dashboard/widget persistence and permission checks live behind this trait.
//! The relay treats the store as a potentially-failing collaborator; tests
//! use the in-memory implementation and production wires in a
//! database-backed one.

use crate::error::StoreError;
use async_trait::async_trait;
use dashwire_core::{DashboardId, WidgetId};
use dashwire_widget::{CallOutcome, WebhookConfig, WidgetConfig};
use serde::{Deserialize, Serialize};

/// A widget together with its webhook configuration, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    /// The widget itself.
    pub widget: WidgetConfig,
    /// The widget's webhook; absent for widgets that cannot be refreshed.
    pub webhook: Option<WebhookConfig>,
}

/// Trait for widget store access.
#[async_trait]
pub trait WidgetStore: Send + Sync {
    /// Looks up a widget with its webhook configuration.
    async fn get_widget(&self, widget_id: WidgetId) -> Result<Option<WidgetRecord>, StoreError>;

    /// Lists all widgets on a dashboard with their webhook configurations.
    async fn get_dashboard_widgets(
        &self,
        dashboard_id: DashboardId,
    ) -> Result<Vec<WidgetRecord>, StoreError>;

    /// Records a call outcome for a widget.
    ///
    /// Increments the widget's call counter and overwrites the latest-call
    /// snapshot, last write wins.
    async fn record_call(&self, widget_id: WidgetId, outcome: &CallOutcome)
    -> Result<(), StoreError>;
}

pub use self::memory::InMemoryStore;

mod memory {
    use super::*;
    use dashwire_widget::CallRecord;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory widget store for tests.
    #[derive(Default)]
    pub struct InMemoryStore {
        widgets: Mutex<HashMap<WidgetId, WidgetRecord>>,
        stats: Mutex<HashMap<WidgetId, CallRecord>>,
        /// If set, every operation fails with this error.
        pub fail_with: Option<StoreError>,
        /// If set, record_call alone fails with this error.
        pub fail_recording_with: Option<StoreError>,
    }

    impl InMemoryStore {
        /// Creates an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a widget record.
        pub fn insert(&self, record: WidgetRecord) {
            self.widgets
                .lock()
                .expect("store lock poisoned")
                .insert(record.widget.id, record);
        }

        /// Returns the call record for a widget, if any calls were recorded.
        #[must_use]
        pub fn call_record(&self, widget_id: WidgetId) -> Option<CallRecord> {
            self.stats
                .lock()
                .expect("store lock poisoned")
                .get(&widget_id)
                .cloned()
        }
    }

    #[async_trait]
    impl WidgetStore for InMemoryStore {
        async fn get_widget(
            &self,
            widget_id: WidgetId,
        ) -> Result<Option<WidgetRecord>, StoreError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            Ok(self
                .widgets
                .lock()
                .expect("store lock poisoned")
                .get(&widget_id)
                .cloned())
        }

        async fn get_dashboard_widgets(
            &self,
            dashboard_id: DashboardId,
        ) -> Result<Vec<WidgetRecord>, StoreError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            let mut records: Vec<WidgetRecord> = self
                .widgets
                .lock()
                .expect("store lock poisoned")
                .values()
                .filter(|record| record.widget.dashboard_id == dashboard_id)
                .cloned()
                .collect();
            records.sort_by_key(|record| record.widget.id);
            Ok(records)
        }

        async fn record_call(
            &self,
            widget_id: WidgetId,
            outcome: &CallOutcome,
        ) -> Result<(), StoreError> {
            if let Some(e) = self.fail_with.as_ref().or(self.fail_recording_with.as_ref()) {
                return Err(e.clone());
            }
            let mut stats = self.stats.lock().expect("store lock poisoned");
            stats
                .entry(widget_id)
                .and_modify(|record| {
                    record.call_count += 1;
                    record.last_called = outcome.called_at;
                    record.last_response = outcome.snapshot.clone();
                })
                .or_insert_with(|| CallRecord {
                    widget_id,
                    last_called: outcome.called_at,
                    last_response: outcome.snapshot.clone(),
                    call_count: 1,
                });
            Ok(())
        }
    }
}
