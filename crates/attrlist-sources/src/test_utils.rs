//! Test utilities for sources
//!
//! Provides an in-memory [`StaticDataLoader`] that counts its invocations,
//! plus helpers for building layers, features and responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use attrlist_core::prelude::*;
use attrlist_core::{
    AppLayer, AttributeType, CanExpandRowParams, ColumnMetadata, FeatureDetailsModel,
    FeatureModel, FeaturesResponse, GetFeatureDetailsParams, GetFeaturesParams,
    GetLayerExportCapabilitiesParams, GetLayerExportParams, GetUniqueValuesParams, LayerExport,
    LayerExportCapabilities,
};

use crate::loader::{DataLoader, LoaderFuture, RowExpansion};

/// Creates a visible layer with the attribute list enabled.
pub fn test_layer(id: &str, title: &str) -> AppLayer {
    AppLayer::new(id, title)
}

/// Creates a feature with a `name` attribute.
pub fn test_feature(fid: Option<&str>, name: &str) -> FeatureModel {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(name));
    FeatureModel {
        fid: fid.map(str::to_string),
        geometry: Some("POINT(1 2)".to_string()),
        attributes,
    }
}

/// Creates a response with `count` features (`f0`, `f1`, ...) and a `name` column.
pub fn features_response(count: usize, total: Option<u64>) -> FeaturesResponse {
    FeaturesResponse {
        features: (0..count)
            .map(|i| test_feature(Some(&format!("f{}", i)), &format!("feature {}", i)))
            .collect(),
        column_metadata: vec![ColumnMetadata {
            key: "name".to_string(),
            alias: Some("Name".to_string()),
            attribute_type: AttributeType::String,
        }],
        total,
        page: None,
        page_size: None,
    }
}

/// Number of calls each loader operation received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoaderCalls {
    pub features: usize,
    pub capabilities: usize,
    pub export: usize,
    pub unique_values: usize,
    pub can_expand: usize,
    pub details: usize,
}

#[derive(Debug, Default)]
struct Counters {
    features: AtomicUsize,
    capabilities: AtomicUsize,
    export: AtomicUsize,
    unique_values: AtomicUsize,
    can_expand: AtomicUsize,
    details: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    features: Mutex<FeaturesResponse>,
    features_error: Mutex<Option<String>>,
    capabilities: Mutex<LayerExportCapabilities>,
    export: Mutex<Option<LayerExport>>,
    unique_values: Mutex<Vec<Value>>,
    details: Mutex<HashMap<String, FeatureDetailsModel>>,
    row_expansion: Mutex<bool>,
    last_features_params: Mutex<Option<GetFeaturesParams>>,
    last_export_params: Mutex<Option<GetLayerExportParams>>,
    counters: Counters,
}

/// In-memory loader for tests. Clones share state and counters.
#[derive(Debug, Clone, Default)]
pub struct StaticDataLoader {
    inner: Arc<Inner>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl StaticDataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(self, response: FeaturesResponse) -> Self {
        *lock(&self.inner.features) = response;
        self
    }

    /// Make `get_features` fail with a transport error
    pub fn failing_features(self, message: &str) -> Self {
        *lock(&self.inner.features_error) = Some(message.to_string());
        self
    }

    pub fn with_capabilities(self, exportable: bool, formats: &[&str]) -> Self {
        *lock(&self.inner.capabilities) = LayerExportCapabilities {
            exportable,
            output_formats: formats.iter().map(|f| f.to_string()).collect(),
        };
        self
    }

    pub fn with_export(self, export: LayerExport) -> Self {
        *lock(&self.inner.export) = Some(export);
        self
    }

    pub fn with_unique_values(self, values: Vec<Value>) -> Self {
        *lock(&self.inner.unique_values) = values;
        self
    }

    /// Enable row expansion and register details for one feature
    pub fn with_details(self, details: FeatureDetailsModel) -> Self {
        *lock(&self.inner.row_expansion) = true;
        lock(&self.inner.details).insert(details.feature_id.clone(), details);
        self
    }

    /// Enable row expansion without any details
    pub fn with_row_expansion(self) -> Self {
        *lock(&self.inner.row_expansion) = true;
        self
    }

    pub fn set_features(&self, response: FeaturesResponse) {
        *lock(&self.inner.features) = response;
    }

    pub fn calls(&self) -> LoaderCalls {
        let c = &self.inner.counters;
        LoaderCalls {
            features: c.features.load(Ordering::SeqCst),
            capabilities: c.capabilities.load(Ordering::SeqCst),
            export: c.export.load(Ordering::SeqCst),
            unique_values: c.unique_values.load(Ordering::SeqCst),
            can_expand: c.can_expand.load(Ordering::SeqCst),
            details: c.details.load(Ordering::SeqCst),
        }
    }

    pub fn last_features_params(&self) -> Option<GetFeaturesParams> {
        lock(&self.inner.last_features_params).clone()
    }

    pub fn last_export_params(&self) -> Option<GetLayerExportParams> {
        lock(&self.inner.last_export_params).clone()
    }
}

impl DataLoader for StaticDataLoader {
    fn get_features(&self, params: GetFeaturesParams) -> LoaderFuture<'_, FeaturesResponse> {
        Box::pin(async move {
            self.inner.counters.features.fetch_add(1, Ordering::SeqCst);
            *lock(&self.inner.last_features_params) = Some(params.clone());
            if let Some(message) = lock(&self.inner.features_error).clone() {
                return Err(Error::transport(message));
            }
            let mut response = lock(&self.inner.features).clone();
            if let Some(fid) = params.fid {
                response
                    .features
                    .retain(|f| f.fid.as_deref() == Some(fid.as_str()));
            }
            Ok(response)
        })
    }

    fn get_layer_export_capabilities(
        &self,
        _params: GetLayerExportCapabilitiesParams,
    ) -> LoaderFuture<'_, LayerExportCapabilities> {
        Box::pin(async move {
            self.inner.counters.capabilities.fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.inner.capabilities).clone())
        })
    }

    fn get_layer_export(
        &self,
        params: GetLayerExportParams,
    ) -> LoaderFuture<'_, Option<LayerExport>> {
        Box::pin(async move {
            self.inner.counters.export.fetch_add(1, Ordering::SeqCst);
            *lock(&self.inner.last_export_params) = Some(params);
            Ok(lock(&self.inner.export).clone())
        })
    }

    fn get_unique_values(&self, _params: GetUniqueValuesParams) -> LoaderFuture<'_, Vec<Value>> {
        Box::pin(async move {
            self.inner
                .counters
                .unique_values
                .fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.inner.unique_values).clone())
        })
    }

    fn row_expansion(&self) -> Option<Arc<dyn RowExpansion>> {
        if *lock(&self.inner.row_expansion) {
            Some(Arc::new(StaticRowExpansion {
                inner: self.inner.clone(),
            }))
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct StaticRowExpansion {
    inner: Arc<Inner>,
}

impl RowExpansion for StaticRowExpansion {
    fn can_expand_row(&self, _params: CanExpandRowParams) -> LoaderFuture<'_, bool> {
        Box::pin(async move {
            self.inner.counters.can_expand.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
    }

    fn get_feature_details(
        &self,
        params: GetFeatureDetailsParams,
    ) -> LoaderFuture<'_, Option<FeatureDetailsModel>> {
        Box::pin(async move {
            self.inner.counters.details.fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.inner.details).get(&params.feature_id).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_response_helper() {
        let response = features_response(2, Some(10));
        assert_eq!(response.features.len(), 2);
        assert_eq!(response.features[1].fid.as_deref(), Some("f1"));
        assert_eq!(response.total, Some(10));
    }

    #[tokio::test]
    async fn test_static_loader_filters_by_fid() {
        let loader = StaticDataLoader::new().with_features(features_response(3, Some(3)));
        let response = loader
            .get_features(GetFeaturesParams {
                fid: Some("f2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.features.len(), 1);
        assert_eq!(loader.calls().features, 1);
    }

    #[tokio::test]
    async fn test_static_loader_failure() {
        let loader = StaticDataLoader::new().failing_features("boom");
        let err = loader
            .get_features(GetFeaturesParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "boom");
    }
}
