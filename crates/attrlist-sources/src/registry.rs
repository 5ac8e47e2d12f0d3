//! Source registry: maps source ids to loaders and tab descriptor streams.
//!
//! The registry is an explicit instance owned by the engine for one panel
//! session. Clones share the same underlying map, so spawned load tasks can
//! dispatch through it.
//!
//! Dispatch never fails because a source is missing: an unknown source id
//! yields the same result as a loader without the capability (`false`,
//! `None`, or an empty response).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::watch;

use attrlist_core::prelude::*;
use attrlist_core::{
    CanExpandRowParams, FeatureDetailsModel, FeaturesResponse, GetFeatureDetailsParams,
    GetFeaturesParams, GetLayerExportCapabilitiesParams, GetLayerExportParams,
    GetUniqueValuesParams, LayerExport, LayerExportCapabilities, TabDescriptor,
};

use crate::loader::DataLoader;

/// Id of the source whose tabs follow the visible map layers
pub const DEFAULT_SOURCE_ID: &str = "default";

/// A pluggable backend: its loader and the tabs it contributes
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,

    /// Tab descriptors this source wants open. The default source leaves
    /// this unused; its tabs follow the visible layers.
    pub tabs: watch::Receiver<Vec<TabDescriptor>>,

    pub loader: Arc<dyn DataLoader>,
}

impl Source {
    /// A source with a fixed (possibly empty) tab list
    pub fn new(id: impl Into<String>, loader: Arc<dyn DataLoader>) -> Self {
        let (_tx, tabs) = watch::channel(Vec::new());
        Self {
            id: id.into(),
            tabs,
            loader,
        }
    }

    pub fn with_tabs(mut self, tabs: watch::Receiver<Vec<TabDescriptor>>) -> Self {
        self.tabs = tabs;
        self
    }
}

/// Registered sources, keyed by id
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Arc<RwLock<HashMap<String, Source>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. Fails if the id is already taken.
    pub fn register(&self, source: Source) -> Result<()> {
        let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
        if sources.contains_key(&source.id) {
            return Err(Error::SourceExists {
                source_id: source.id,
            });
        }
        info!("Registered attribute list source '{}'", source.id);
        sources.insert(source.id.clone(), source);
        Ok(())
    }

    pub fn unregister(&self, source_id: &str) -> Option<Source> {
        let removed = self
            .sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(source_id);
        if removed.is_some() {
            info!("Unregistered attribute list source '{}'", source_id);
        }
        removed
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.read().contains_key(source_id)
    }

    /// Sorted ids of all registered sources
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn loader(&self, source_id: &str) -> Option<Arc<dyn DataLoader>> {
        self.read().get(source_id).map(|s| s.loader.clone())
    }

    /// Tab descriptor streams of all sources except the default one
    pub fn tab_streams(&self) -> Vec<(String, watch::Receiver<Vec<TabDescriptor>>)> {
        self.read()
            .values()
            .filter(|s| s.id != DEFAULT_SOURCE_ID)
            .map(|s| (s.id.clone(), s.tabs.clone()))
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Source>> {
        self.sources.read().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────

    pub async fn get_features(
        &self,
        source_id: &str,
        params: GetFeaturesParams,
    ) -> Result<FeaturesResponse> {
        match self.loader(source_id) {
            Some(loader) => loader.get_features(params).await,
            None => {
                debug!("get_features: no source '{}'", source_id);
                Ok(FeaturesResponse::default())
            }
        }
    }

    pub async fn get_layer_export_capabilities(
        &self,
        source_id: &str,
        params: GetLayerExportCapabilitiesParams,
    ) -> Result<LayerExportCapabilities> {
        match self.loader(source_id) {
            Some(loader) => loader.get_layer_export_capabilities(params).await,
            None => Ok(LayerExportCapabilities::default()),
        }
    }

    pub async fn get_layer_export(
        &self,
        source_id: &str,
        params: GetLayerExportParams,
    ) -> Result<Option<LayerExport>> {
        match self.loader(source_id) {
            Some(loader) => loader.get_layer_export(params).await,
            None => Ok(None),
        }
    }

    pub async fn get_unique_values(
        &self,
        source_id: &str,
        params: GetUniqueValuesParams,
    ) -> Result<Vec<Value>> {
        match self.loader(source_id) {
            Some(loader) => loader.get_unique_values(params).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn can_expand_row(&self, source_id: &str, params: CanExpandRowParams) -> Result<bool> {
        match self.loader(source_id).and_then(|l| l.row_expansion()) {
            Some(expansion) => expansion.can_expand_row(params).await,
            None => Ok(false),
        }
    }

    pub async fn get_feature_details(
        &self,
        source_id: &str,
        params: GetFeatureDetailsParams,
    ) -> Result<Option<FeatureDetailsModel>> {
        match self.loader(source_id).and_then(|l| l.row_expansion()) {
            Some(expansion) => expansion.get_feature_details(params).await,
            None => Ok(None),
        }
    }
}
