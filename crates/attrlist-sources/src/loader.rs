//! The data loader capability contract every source implements.
//!
//! [`DataLoader`] is object safe so the registry can hold loaders from
//! different backends behind `Arc<dyn DataLoader>`. Row expansion is an
//! optional capability: a loader that does not support it returns `None`
//! from [`DataLoader::row_expansion`].

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use attrlist_core::prelude::*;
use attrlist_core::{
    CanExpandRowParams, FeatureDetailsModel, FeaturesResponse, GetFeatureDetailsParams,
    GetFeaturesParams, GetLayerExportCapabilitiesParams, GetLayerExportParams,
    GetUniqueValuesParams, LayerExport, LayerExportCapabilities,
};

/// Boxed future returned by loader calls
pub type LoaderFuture<'a, T> = BoxFuture<'a, Result<T>>;

/// Required loader operations
pub trait DataLoader: Send + Sync + fmt::Debug {
    /// Load one page of features plus column metadata and the total count
    fn get_features(&self, params: GetFeaturesParams) -> LoaderFuture<'_, FeaturesResponse>;

    fn get_layer_export_capabilities(
        &self,
        params: GetLayerExportCapabilitiesParams,
    ) -> LoaderFuture<'_, LayerExportCapabilities>;

    /// Export a layer. `None` means the backend produced no file.
    fn get_layer_export(&self, params: GetLayerExportParams)
        -> LoaderFuture<'_, Option<LayerExport>>;

    fn get_unique_values(&self, params: GetUniqueValuesParams) -> LoaderFuture<'_, Vec<Value>>;

    /// Optional row expansion capability
    fn row_expansion(&self) -> Option<Arc<dyn RowExpansion>> {
        None
    }
}

/// Optional capability: expandable rows with related-record details
pub trait RowExpansion: Send + Sync + fmt::Debug {
    fn can_expand_row(&self, params: CanExpandRowParams) -> LoaderFuture<'_, bool>;

    fn get_feature_details(
        &self,
        params: GetFeatureDetailsParams,
    ) -> LoaderFuture<'_, Option<FeatureDetailsModel>>;
}
