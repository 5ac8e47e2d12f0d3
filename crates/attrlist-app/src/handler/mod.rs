//! Handler module - TEA update function and message handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `tabs`: Tab changes, tab selection, input-driven reconciliation
//! - `data`: Data loading, paging, sorting, columns
//! - `filters`: Filter change propagation
//! - `selection`: Row selection and map highlight
//! - `export`: Export capability negotiation and export
//! - `details`: Row expansion and feature details

pub(crate) mod data;
pub(crate) mod details;
pub(crate) mod export;
pub(crate) mod filters;
pub(crate) mod selection;
pub(crate) mod tabs;
pub(crate) mod update;

#[cfg(test)]
mod tests;

use attrlist_core::{
    CanExpandRowParams, ExportFormat, GetFeatureDetailsParams, GetFeaturesParams,
    GetLayerExportCapabilitiesParams, GetLayerExportParams, GetUniqueValuesParams,
};

use crate::message::Message;
use crate::state::UniqueValuesKey;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Fetch one page of features for a dataset
    LoadFeatures {
        tab_id: String,
        dataset_id: String,
        source_id: String,
        /// Load sequence the response must echo back
        sequence: u64,
        params: GetFeaturesParams,
    },

    /// Re-fetch the selected row's feature by exact fid
    FetchHighlightFeature {
        tab_id: String,
        dataset_id: String,
        row_id: String,
        source_id: String,
        params: GetFeaturesParams,
    },

    FetchExportCapabilities {
        tab_id: String,
        source_id: String,
        cache_key: String,
        params: GetLayerExportCapabilitiesParams,
    },

    ExportLayer {
        tab_id: String,
        source_id: String,
        format: ExportFormat,
        layer_name: String,
        params: GetLayerExportParams,
    },

    /// Hand an exported file to the file saver
    SaveFile { file_name: String, content: Vec<u8> },

    CheckRowExpansion {
        source_id: String,
        cache_key: String,
        params: CanExpandRowParams,
    },

    FetchFeatureDetails {
        source_id: String,
        cache_key: String,
        params: GetFeatureDetailsParams,
    },

    FetchUniqueValues {
        source_id: String,
        key: UniqueValuesKey,
        params: GetUniqueValuesParams,
    },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    pub fn maybe_message(msg: Option<Message>) -> Self {
        Self {
            message: msg,
            action: None,
        }
    }
}
