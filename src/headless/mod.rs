//! Headless mode - NDJSON event output over a fixture-backed engine
//!
//! The runner drives the attribute list engine from stdin commands and
//! writes one JSON object per line to stdout for every engine event. This
//! is how the engine is exercised end to end without a host UI.
//!
//! # Example Output
//!
//! ```json
//! {"event":"tabs_changed","tabs":[{"id":"tab-1","label":"Roads","source":"default"}],"selected_tab_id":"tab-1","timestamp":1704700001000}
//! {"event":"data_loaded","tab_id":"tab-1","page_index":0,"total_count":2,"rows":[...],"timestamp":1704700001010}
//! {"event":"notification","level":"info","message":"Export saved: ./roads.csv","timestamp":1704700002000}
//! ```

pub mod command;
pub mod runner;

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use attrlist_app::{AppState, EngineEvent, NotificationLevel};
use attrlist_core::{ExportFormat, Tab};

/// Tab as shown in the tab strip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabSummary {
    pub id: String,
    pub label: String,
    pub source: String,
}

impl From<&Tab> for TabSummary {
    fn from(tab: &Tab) -> Self {
        Self {
            id: tab.id.clone(),
            label: tab.label.clone(),
            source: tab.tab_source_id.clone(),
        }
    }
}

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    TabsChanged {
        tabs: Vec<TabSummary>,
        selected_tab_id: Option<String>,
        timestamp: i64,
    },

    LoadingStarted { tab_id: String, timestamp: i64 },

    /// A page finished loading; `rows` holds the visible attributes
    DataLoaded {
        tab_id: String,
        page_index: u32,
        total_count: Option<u64>,
        rows: Vec<Value>,
        timestamp: i64,
    },

    DataLoadFailed {
        tab_id: String,
        error: String,
        timestamp: i64,
    },

    /// Visible column ids in display order
    ColumnsChanged {
        tab_id: String,
        columns: Vec<String>,
        timestamp: i64,
    },

    HighlightChanged {
        tab_id: Option<String>,
        fid: Option<String>,
        timestamp: i64,
    },

    ExportFormats {
        tab_id: String,
        formats: Vec<ExportFormat>,
        timestamp: i64,
    },

    FeatureDetails {
        feature_id: String,
        blocks: Vec<String>,
        timestamp: i64,
    },

    Notification {
        level: NotificationLevel,
        message: String,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // NDJSON: one event per line
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Translate an engine event, reading rows and columns from `state`
    pub fn from_engine_event(event: &EngineEvent, state: &AppState) -> Self {
        let timestamp = Self::now();
        match event {
            EngineEvent::TabsChanged {
                tabs,
                selected_tab_id,
            } => Self::TabsChanged {
                tabs: tabs.iter().map(TabSummary::from).collect(),
                selected_tab_id: selected_tab_id.clone(),
                timestamp,
            },
            EngineEvent::LoadingStarted { tab_id } => Self::LoadingStarted {
                tab_id: tab_id.clone(),
                timestamp,
            },
            EngineEvent::DataLoaded {
                tab_id,
                dataset_id,
                page_index,
                total_count,
                ..
            } => Self::DataLoaded {
                tab_id: tab_id.clone(),
                page_index: *page_index,
                total_count: *total_count,
                rows: visible_rows(state, dataset_id),
                timestamp,
            },
            EngineEvent::DataLoadFailed { tab_id, error } => Self::DataLoadFailed {
                tab_id: tab_id.clone(),
                error: error.clone(),
                timestamp,
            },
            EngineEvent::ColumnsChanged { tab_id, columns } => Self::ColumnsChanged {
                tab_id: tab_id.clone(),
                columns: columns
                    .iter()
                    .filter(|c| c.visible)
                    .map(|c| c.id.clone())
                    .collect(),
                timestamp,
            },
            EngineEvent::HighlightedFeatureChanged { feature } => Self::HighlightChanged {
                tab_id: feature.as_ref().map(|h| h.tab_id.clone()),
                fid: feature.as_ref().and_then(|h| h.feature.fid.clone()),
                timestamp,
            },
            EngineEvent::ExportFormatsChanged { tab_id, formats } => Self::ExportFormats {
                tab_id: tab_id.clone(),
                formats: formats.clone(),
                timestamp,
            },
            EngineEvent::FeatureDetailsLoaded { details } => Self::FeatureDetails {
                feature_id: details.feature_id.clone(),
                blocks: details.details.iter().map(|b| b.title.clone()).collect(),
                timestamp,
            },
            EngineEvent::Notification(notification) => Self::Notification {
                level: notification.level,
                message: notification.message.clone(),
                timestamp,
            },
            EngineEvent::Shutdown => Self::Shutdown { timestamp },
        }
    }
}

/// Rows of a dataset reduced to their visible columns, plus the row id
fn visible_rows(state: &AppState, dataset_id: &str) -> Vec<Value> {
    let Some(dataset) = state.dataset(dataset_id) else {
        return Vec::new();
    };
    let visible = dataset.visible_column_ids();
    dataset
        .rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            object.insert("id".to_string(), Value::String(row.id.clone()));
            for column in &visible {
                if let Some(value) = row.attributes.get(column) {
                    object.insert(column.clone(), value.clone());
                }
            }
            Value::Object(object)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrlist_app::Notification;
    use attrlist_core::{Column, AttributeType, Dataset, Row};
    use serde_json::json;

    #[test]
    fn test_tabs_changed_serialization() {
        let tab = Tab::new("tab-1", "Roads", "default", Some("roads".to_string()), "dataset-1");
        let event = HeadlessEvent::from_engine_event(
            &EngineEvent::TabsChanged {
                tabs: vec![tab],
                selected_tab_id: Some("tab-1".to_string()),
            },
            &AppState::new(),
        );
        let json = serde_json::to_string(&event).expect("serialization failed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("invalid JSON");

        assert_eq!(value["event"], "tabs_changed");
        assert_eq!(value["tabs"][0]["label"], "Roads");
        assert_eq!(value["tabs"][0]["source"], "default");
        assert_eq!(value["selected_tab_id"], "tab-1");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_data_loaded_includes_visible_attributes() {
        let mut state = AppState::new();
        let mut dataset = Dataset::new("dataset-1", "tab-1", 10);
        dataset.columns = vec![
            Column {
                id: "name".to_string(),
                label: "Name".to_string(),
                attribute_type: AttributeType::String,
                visible: true,
            },
            Column {
                id: "secret".to_string(),
                label: "Secret".to_string(),
                attribute_type: AttributeType::String,
                visible: false,
            },
        ];
        let mut attributes = serde_json::Map::new();
        attributes.insert("name".to_string(), json!("Main"));
        attributes.insert("secret".to_string(), json!("x"));
        dataset.rows = vec![Row {
            id: "roads.1".to_string(),
            fid: Some("roads.1".to_string()),
            selected: false,
            attributes,
        }];
        state.datasets.push(dataset);

        let event = HeadlessEvent::from_engine_event(
            &EngineEvent::DataLoaded {
                tab_id: "tab-1".to_string(),
                dataset_id: "dataset-1".to_string(),
                page_index: 0,
                row_count: 1,
                total_count: Some(1),
            },
            &state,
        );
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "data_loaded");
        assert_eq!(value["rows"], json!([{"id": "roads.1", "name": "Main"}]));
        assert_eq!(value["total_count"], 1);
    }

    #[test]
    fn test_notification_serialization() {
        let event = HeadlessEvent::from_engine_event(
            &EngineEvent::Notification(Notification::error("Export failed")),
            &AppState::new(),
        );
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "notification");
        assert_eq!(value["level"], "error");
        assert_eq!(value["message"], "Export failed");
    }

    #[test]
    fn test_error_serialization() {
        let event = HeadlessEvent::error("Fixture not found".to_string(), true);
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "error");
        assert_eq!(value["fatal"], true);
    }
}
