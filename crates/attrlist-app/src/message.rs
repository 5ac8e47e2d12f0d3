//! Message types for the attribute list engine (TEA pattern)

use std::path::PathBuf;

use serde_json::Value;

use attrlist_core::{
    AppLayer, Dataset, ExportFormat, FeatureDetailsModel, FeatureModel, FeaturesResponse,
    FilterState, HighlightedFeature, LayerExport, LayerExportCapabilities, SortDirection, Tab,
    TabDescriptor,
};

use crate::state::UniqueValuesKey;

/// All possible messages/actions in the engine
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // External Inputs
    // ─────────────────────────────────────────────────────────
    /// The map's visible layer set changed
    VisibleLayersChanged { layers: Vec<AppLayer> },

    /// A non-default source published a new set of tab descriptors
    SourceTabsChanged {
        source_id: String,
        tabs: Vec<TabDescriptor>,
    },

    PanelVisibilityChanged { visible: bool },

    ApplicationChanged { application_id: Option<String> },

    FiltersChanged { filters: FilterState },

    // ─────────────────────────────────────────────────────────
    // Tabs
    // ─────────────────────────────────────────────────────────
    /// Open and close tabs in one transition. Each new tab arrives with
    /// its dataset in `new_data`.
    ChangeTabs {
        new_tabs: Vec<Tab>,
        new_data: Vec<Dataset>,
        closed_tabs: Vec<String>,
    },

    SelectTab { tab_id: String },

    // ─────────────────────────────────────────────────────────
    // Data Loading
    // ─────────────────────────────────────────────────────────
    LoadData { tab_id: String },

    LoadDataSuccess {
        tab_id: String,
        dataset_id: String,
        /// Load sequence the request was issued with
        sequence: u64,
        response: FeaturesResponse,
    },

    /// `dataset_id`/`sequence` are `None` when the load context could not
    /// be resolved. `error` falls back to the default load error.
    LoadDataFailed {
        tab_id: String,
        dataset_id: Option<String>,
        sequence: Option<u64>,
        error: Option<String>,
    },

    UpdatePage { dataset_id: String, page_index: u32 },

    ChangePageSize { dataset_id: String, page_size: u32 },

    UpdateSort {
        dataset_id: String,
        column: Option<String>,
        direction: SortDirection,
    },

    UpdateRowSelected {
        dataset_id: String,
        row_id: String,
        selected: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Columns
    // ─────────────────────────────────────────────────────────
    ToggleColumnVisible { dataset_id: String, column_id: String },

    SetColumnsVisibility { dataset_id: String, visible: bool },

    /// Move `column_id` to the position currently held by `target_column_id`
    ChangeColumnPosition {
        dataset_id: String,
        column_id: String,
        target_column_id: String,
    },

    // ─────────────────────────────────────────────────────────
    // Highlight
    // ─────────────────────────────────────────────────────────
    HighlightFeatureLoaded {
        tab_id: String,
        dataset_id: String,
        row_id: String,
        feature: Option<FeatureModel>,
    },

    HighlightFeatureFailed { tab_id: String, error: String },

    SetHighlightedFeature { feature: Option<HighlightedFeature> },

    // ─────────────────────────────────────────────────────────
    // Export
    // ─────────────────────────────────────────────────────────
    RequestExportFormats { tab_id: String },

    ExportCapabilitiesLoaded {
        tab_id: String,
        cache_key: String,
        capabilities: LayerExportCapabilities,
    },

    ExportCapabilitiesFailed {
        tab_id: String,
        cache_key: String,
        error: String,
    },

    Export { tab_id: String, format: ExportFormat },

    ExportCompleted {
        tab_id: String,
        format: ExportFormat,
        layer_name: String,
        export: Option<LayerExport>,
    },

    ExportFailed { tab_id: String, error: String },

    FileSaved { path: PathBuf },

    FileSaveFailed { error: String },

    // ─────────────────────────────────────────────────────────
    // Feature Details
    // ─────────────────────────────────────────────────────────
    CheckRowExpansion { tab_id: String },

    RowExpansionResolved { cache_key: String, can_expand: bool },

    RowExpansionFailed { cache_key: String, error: String },

    /// Load details for a feature of the selected tab
    LoadFeatureDetails { feature_id: String },

    FeatureDetailsLoaded {
        cache_key: String,
        feature_id: String,
        details: Option<FeatureDetailsModel>,
    },

    FeatureDetailsFailed {
        cache_key: String,
        feature_id: String,
        error: String,
    },

    // ─────────────────────────────────────────────────────────
    // Unique Values
    // ─────────────────────────────────────────────────────────
    LoadUniqueValues { tab_id: String, attribute: String },

    UniqueValuesLoaded {
        key: UniqueValuesKey,
        values: Vec<Value>,
    },

    UniqueValuesFailed { key: UniqueValuesKey, error: String },

    /// Stop the engine
    Quit,
}
