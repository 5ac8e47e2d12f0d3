//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast after each message processing cycle via
//! `Engine::subscribe()`, so subscribers see a consistent view of state
//! changes.

use attrlist_core::{Column, ExportFormat, FeatureDetailsModel, HighlightedFeature, Tab};

use crate::notification::Notification;

#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Tabs
    // ─────────────────────────────────────────────────────────
    /// Tabs were opened or closed, or the selection moved
    TabsChanged {
        tabs: Vec<Tab>,
        selected_tab_id: Option<String>,
    },

    // ─────────────────────────────────────────────────────────
    // Data
    // ─────────────────────────────────────────────────────────
    LoadingStarted { tab_id: String },

    DataLoaded {
        tab_id: String,
        dataset_id: String,
        page_index: u32,
        row_count: usize,
        total_count: Option<u64>,
    },

    DataLoadFailed { tab_id: String, error: String },

    /// Column order or visibility changed
    ColumnsChanged { tab_id: String, columns: Vec<Column> },

    // ─────────────────────────────────────────────────────────
    // Map Bridge
    // ─────────────────────────────────────────────────────────
    HighlightedFeatureChanged { feature: Option<HighlightedFeature> },

    // ─────────────────────────────────────────────────────────
    // Export & Details
    // ─────────────────────────────────────────────────────────
    ExportFormatsChanged {
        tab_id: String,
        formats: Vec<ExportFormat>,
    },

    FeatureDetailsLoaded { details: FeatureDetailsModel },

    /// A transient message for the user
    Notification(Notification),

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TabsChanged { .. } => "tabs_changed",
            Self::LoadingStarted { .. } => "loading_started",
            Self::DataLoaded { .. } => "data_loaded",
            Self::DataLoadFailed { .. } => "data_load_failed",
            Self::ColumnsChanged { .. } => "columns_changed",
            Self::HighlightedFeatureChanged { .. } => "highlighted_feature_changed",
            Self::ExportFormatsChanged { .. } => "export_formats_changed",
            Self::FeatureDetailsLoaded { .. } => "feature_details_loaded",
            Self::Notification(_) => "notification",
            Self::Shutdown => "shutdown",
        }
    }
}
