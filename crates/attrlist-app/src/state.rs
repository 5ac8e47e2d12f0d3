//! Engine state (Model in TEA pattern)

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde_json::Value;

use attrlist_core::{
    supported_formats, AppLayer, Column, Dataset, ExportFormat, FeatureDetailsModel, FilterState,
    HighlightedFeature, PagingData, Row, SortData, Tab, TabDescriptor,
};

use crate::cache::BoundedCache;
use crate::config::Settings;
use crate::notification::Notification;

/// Export capability cache key: `{application_id}-{layer_id}`
pub fn export_cache_key(application_id: &str, layer_id: &str) -> String {
    format!("{}-{}", application_id, layer_id)
}

/// Feature detail / row expansion cache key: `{application_id}_{layer_id}`
pub fn details_cache_key(application_id: &str, layer_id: &str) -> String {
    format!("{}_{}", application_id, layer_id)
}

/// Everything a loader request for one tab needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    pub application_id: String,
    pub layer_id: String,
    pub source_id: String,
    pub dataset_id: String,
}

/// Cache key for unique attribute values
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueValuesKey {
    pub application_id: String,
    pub layer_id: String,
    pub attribute: String,
}

/// Export capabilities declared by backends, plus the semantic formats
/// resolved for each tab
#[derive(Debug, Clone)]
pub struct ExportState {
    /// Declared output formats, only for layers reported exportable
    pub capabilities: BoundedCache<String, Vec<String>>,

    /// Keys with a capability fetch in flight
    pub pending: HashSet<String>,

    pub formats_by_tab: HashMap<String, BTreeSet<ExportFormat>>,
}

impl ExportState {
    pub fn new(max_entries: usize) -> Self {
        Self {
            capabilities: BoundedCache::new(max_entries),
            pending: HashSet::new(),
            formats_by_tab: HashMap::new(),
        }
    }

    /// Semantic formats for a cached key, if the key is cached
    pub fn cached_formats(&self, cache_key: &str) -> Option<BTreeSet<ExportFormat>> {
        self.capabilities
            .get(&cache_key.to_string())
            .map(|declared| supported_formats(declared.as_slice()))
    }
}

/// Feature details and row expansion flags, keyed per application and layer
#[derive(Debug, Clone)]
pub struct FeatureDetailsCache {
    pub entries: BoundedCache<String, HashMap<String, FeatureDetailsModel>>,
    pub loading: HashMap<String, HashSet<String>>,
    pub can_expand: BoundedCache<String, bool>,
    pub can_expand_pending: HashSet<String>,
}

impl FeatureDetailsCache {
    pub fn new(max_keys: usize) -> Self {
        Self {
            entries: BoundedCache::new(max_keys),
            loading: HashMap::new(),
            can_expand: BoundedCache::new(max_keys),
            can_expand_pending: HashSet::new(),
        }
    }

    pub fn get(&self, cache_key: &str, feature_id: &str) -> Option<&FeatureDetailsModel> {
        self.entries
            .get(&cache_key.to_string())
            .and_then(|features| features.get(feature_id))
    }

    pub fn is_loading(&self, cache_key: &str, feature_id: &str) -> bool {
        self.loading
            .get(cache_key)
            .is_some_and(|ids| ids.contains(feature_id))
    }

    pub fn set_loading(&mut self, cache_key: &str, feature_id: &str, loading: bool) {
        if loading {
            self.loading
                .entry(cache_key.to_string())
                .or_default()
                .insert(feature_id.to_string());
        } else if let Some(ids) = self.loading.get_mut(cache_key) {
            ids.remove(feature_id);
            if ids.is_empty() {
                self.loading.remove(cache_key);
            }
        }
    }

    pub fn insert(&mut self, cache_key: &str, details: FeatureDetailsModel) {
        self.entries
            .entry_or_default(cache_key.to_string())
            .insert(details.feature_id.clone(), details);
    }
}

/// Complete engine state (the Model in TEA)
#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,

    pub panel_visible: bool,
    pub application_id: Option<String>,
    pub visible_layers: Vec<AppLayer>,

    /// Descriptors published by non-default sources
    pub source_tabs: BTreeMap<String, Vec<TabDescriptor>>,

    pub tabs: Vec<Tab>,
    pub datasets: Vec<Dataset>,
    pub selected_tab_id: Option<String>,
    pub highlighted_feature: Option<HighlightedFeature>,

    pub filters: FilterState,

    pub export: ExportState,
    pub details: FeatureDetailsCache,

    pub unique_values: HashMap<UniqueValuesKey, Vec<Value>>,
    pub unique_values_pending: HashSet<UniqueValuesKey>,

    /// Notifications raised since the engine last drained them
    pub notifications: Vec<Notification>,

    should_quit: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            export: ExportState::new(settings.cache.max_export_capabilities),
            details: FeatureDetailsCache::new(settings.cache.max_feature_detail_keys),
            settings,
            panel_visible: false,
            application_id: None,
            visible_layers: Vec::new(),
            source_tabs: BTreeMap::new(),
            tabs: Vec::new(),
            datasets: Vec::new(),
            selected_tab_id: None,
            highlighted_feature: None,
            filters: FilterState::default(),
            unique_values: HashMap::new(),
            unique_values_pending: HashSet::new(),
            notifications: Vec::new(),
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    // ─────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────

    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    pub fn tab_mut(&mut self, tab_id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == tab_id)
    }

    pub fn dataset(&self, dataset_id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == dataset_id)
    }

    pub fn dataset_mut(&mut self, dataset_id: &str) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|d| d.id == dataset_id)
    }

    /// The dataset a tab currently shows
    pub fn tab_dataset(&self, tab_id: &str) -> Option<&Dataset> {
        let tab = self.tab(tab_id)?;
        self.dataset(&tab.selected_dataset_id)
    }

    /// Resolve application, layer, source and dataset for a tab
    pub fn load_context(&self, tab_id: &str) -> Option<LoadContext> {
        let application_id = self.application_id.clone()?;
        let tab = self.tab(tab_id)?;
        let layer_id = tab.layer_id.clone()?;
        let dataset = self.dataset(&tab.selected_dataset_id)?;
        Some(LoadContext {
            application_id,
            layer_id,
            source_id: tab.tab_source_id.clone(),
            dataset_id: dataset.id.clone(),
        })
    }

    /// Layer ids of all open tabs
    pub fn tab_layer_ids(&self) -> Vec<&str> {
        self.tabs
            .iter()
            .filter_map(|t| t.layer_id.as_deref())
            .collect()
    }

    // ─────────────────────────────────────────────────────────
    // Projections
    // ─────────────────────────────────────────────────────────

    pub fn selected_tab(&self) -> Option<&Tab> {
        self.selected_tab_id.as_deref().and_then(|id| self.tab(id))
    }

    fn selected_dataset(&self) -> Option<&Dataset> {
        self.selected_tab_id
            .as_deref()
            .and_then(|id| self.tab_dataset(id))
    }

    pub fn rows_for_selected_tab(&self) -> &[Row] {
        self.selected_dataset()
            .map(|d| d.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn columns_for_selected_tab(&self) -> &[Column] {
        self.selected_dataset()
            .map(|d| d.columns.as_slice())
            .unwrap_or_default()
    }

    pub fn paging_data_for_selected_tab(&self) -> Option<PagingData> {
        self.selected_dataset().map(Dataset::paging_data)
    }

    pub fn sort_for_selected_tab(&self) -> Option<SortData> {
        self.selected_dataset().map(|d| SortData {
            column: d.sorted_column.clone(),
            direction: d.sort_direction,
        })
    }

    pub fn loading_error_for_selected_tab(&self) -> Option<&str> {
        self.selected_tab().and_then(|t| t.loading_error.as_deref())
    }

    pub fn export_formats_for_selected_tab(&self) -> BTreeSet<ExportFormat> {
        self.selected_tab_id
            .as_deref()
            .and_then(|id| self.export.formats_by_tab.get(id))
            .cloned()
            .unwrap_or_default()
    }

    /// Loaded details for a feature of the selected tab
    pub fn feature_details(&self, feature_id: &str) -> Option<&FeatureDetailsModel> {
        let context = self.load_context(self.selected_tab_id.as_deref()?)?;
        let key = details_cache_key(&context.application_id, &context.layer_id);
        self.details.get(&key, feature_id)
    }

    /// Whether rows of the selected tab can be expanded. `false` until resolved.
    pub fn can_expand_rows(&self) -> bool {
        self.selected_tab_id
            .as_deref()
            .and_then(|id| self.load_context(id))
            .map(|context| details_cache_key(&context.application_id, &context.layer_id))
            .and_then(|key| self.details.can_expand.get(&key).copied())
            .unwrap_or(false)
    }

    pub fn unique_values(&self, key: &UniqueValuesKey) -> Option<&[Value]> {
        self.unique_values.get(key).map(Vec::as_slice)
    }
}
