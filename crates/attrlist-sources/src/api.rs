//! Transport seam for backend-backed sources.
//!
//! The engine does not own the network protocol. A host application injects
//! an [`AttributeListApi`] implementation (usually an HTTP client) and wraps it
//! in an [`ApiDataLoader`] to register it as a source.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use attrlist_core::prelude::*;
use attrlist_core::{
    CanExpandRowParams, FeatureDetailsModel, FeaturesResponse, GetFeatureDetailsParams,
    GetFeaturesParams, GetLayerExportCapabilitiesParams, GetLayerExportParams,
    GetUniqueValuesParams, LayerExport, LayerExportCapabilities,
};

use crate::loader::{DataLoader, LoaderFuture, RowExpansion};

/// Backend operations used by the attribute list.
///
/// Implementations translate transport failures into [`Error::Transport`];
/// the message is shown to the user when a load fails.
#[trait_variant::make(AttributeListApi: Send)]
pub trait LocalAttributeListApi {
    async fn get_features(&self, params: GetFeaturesParams) -> Result<FeaturesResponse>;

    async fn get_layer_export_capabilities(
        &self,
        params: GetLayerExportCapabilitiesParams,
    ) -> Result<LayerExportCapabilities>;

    async fn get_layer_export(&self, params: GetLayerExportParams) -> Result<Option<LayerExport>>;

    async fn get_unique_values(&self, params: GetUniqueValuesParams) -> Result<Vec<Value>>;

    async fn get_feature_details(
        &self,
        params: GetFeatureDetailsParams,
    ) -> Result<Option<FeatureDetailsModel>>;
}

/// Adapts an [`AttributeListApi`] to the [`DataLoader`] contract
pub struct ApiDataLoader<A> {
    api: Arc<A>,
    row_expansion: bool,
}

impl<A> fmt::Debug for ApiDataLoader<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDataLoader")
            .field("api", &std::any::type_name::<A>())
            .field("row_expansion", &self.row_expansion)
            .finish()
    }
}

impl<A> ApiDataLoader<A>
where
    A: AttributeListApi + Send + Sync + 'static,
{
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            row_expansion: false,
        }
    }

    /// Expose `get_feature_details` as the row expansion capability
    pub fn with_row_expansion(mut self) -> Self {
        self.row_expansion = true;
        self
    }
}

impl<A> DataLoader for ApiDataLoader<A>
where
    A: AttributeListApi + Send + Sync + 'static,
{
    fn get_features(&self, params: GetFeaturesParams) -> LoaderFuture<'_, FeaturesResponse> {
        Box::pin(self.api.get_features(params))
    }

    fn get_layer_export_capabilities(
        &self,
        params: GetLayerExportCapabilitiesParams,
    ) -> LoaderFuture<'_, LayerExportCapabilities> {
        Box::pin(self.api.get_layer_export_capabilities(params))
    }

    fn get_layer_export(
        &self,
        params: GetLayerExportParams,
    ) -> LoaderFuture<'_, Option<LayerExport>> {
        Box::pin(self.api.get_layer_export(params))
    }

    fn get_unique_values(&self, params: GetUniqueValuesParams) -> LoaderFuture<'_, Vec<Value>> {
        Box::pin(self.api.get_unique_values(params))
    }

    fn row_expansion(&self) -> Option<Arc<dyn RowExpansion>> {
        if !self.row_expansion {
            return None;
        }
        Some(Arc::new(ApiRowExpansion {
            api: self.api.clone(),
        }))
    }
}

struct ApiRowExpansion<A> {
    api: Arc<A>,
}

impl<A> fmt::Debug for ApiRowExpansion<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRowExpansion").finish_non_exhaustive()
    }
}

impl<A> RowExpansion for ApiRowExpansion<A>
where
    A: AttributeListApi + Send + Sync + 'static,
{
    fn can_expand_row(&self, _params: CanExpandRowParams) -> LoaderFuture<'_, bool> {
        Box::pin(async { Ok(true) })
    }

    fn get_feature_details(
        &self,
        params: GetFeatureDetailsParams,
    ) -> LoaderFuture<'_, Option<FeatureDetailsModel>> {
        Box::pin(self.api.get_feature_details(params))
    }
}
