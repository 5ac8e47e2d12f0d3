//! # attrlist-core - Core Domain Types
//!
//! Foundation crate for the attribute list engine. Provides domain types,
//! error handling, filter-to-CQL conversion, export format mapping and logging.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`AppLayer`] - A visible map layer
//! - [`TabDescriptor`] - A tab a source wants open
//! - [`Tab`], [`Dataset`], [`Column`], [`Row`] - Attribute list grid state
//!
//! ### Loader Shapes (`feature`)
//! - [`FeatureModel`], [`FeaturesResponse`] - Feature pages
//! - [`LayerExportCapabilities`], [`LayerExport`] - Export negotiation
//! - [`FeatureDetailsModel`] - Expandable row details
//!
//! ### Filters (`filter`)
//! - [`FilterState`] - Externally owned filter groups, converted to CQL per layer
//!
//! ### Export (`export`)
//! - [`ExportFormat`] - Semantic export format with backend alias tables
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context

pub mod error;
pub mod export;
pub mod feature;
pub mod filter;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt, DEFAULT_LOAD_ERROR};
pub use export::{fallback_file_name, resolve_output_format, supported_formats, ExportFormat};
pub use feature::{
    CanExpandRowParams, ColumnMetadata, DetailBlock, FeatureDetailsModel, FeatureModel,
    FeaturesResponse, GetFeatureDetailsParams, GetFeaturesParams, GetLayerExportCapabilitiesParams,
    GetLayerExportParams, GetUniqueValuesParams, HighlightedFeature, LayerExport,
    LayerExportCapabilities,
};
pub use filter::{
    changed_layers, AttributeFilter, FilterCondition, FilterGroup, FilterOperator, FilterState,
};
pub use types::{
    AppLayer, AttributeType, Column, Dataset, PagingData, Row, SortData, SortDirection, Tab,
    TabDescriptor, ATTRIBUTE_LIST_FUNCTIONALITY,
};
