//! Feature payloads and loader request/response shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{AttributeType, SortDirection};

/// A feature as returned by a data loader
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureModel {
    /// Backend feature id, when the backend has a stable one
    #[serde(rename = "__fid", default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<String>,

    /// Geometry as WKT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Column description returned alongside features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub key: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub attribute_type: AttributeType,
}

/// Response of `get_features`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesResponse {
    #[serde(default)]
    pub features: Vec<FeatureModel>,
    #[serde(default)]
    pub column_metadata: Vec<ColumnMetadata>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Export capabilities a backend declares for one layer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerExportCapabilities {
    pub exportable: bool,
    #[serde(default)]
    pub output_formats: Vec<String>,
}

/// An exported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerExport {
    pub file: Vec<u8>,
    pub file_name: Option<String>,
}

/// A related-record block shown when a row is expanded
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailBlock {
    pub title: String,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub attributes: Vec<Map<String, Value>>,
}

/// Details loaded for an expandable row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDetailsModel {
    pub feature_id: String,
    #[serde(default)]
    pub details: Vec<DetailBlock>,
}

/// The feature currently emphasized on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightedFeature {
    pub tab_id: String,
    pub feature: FeatureModel,
}

// ─────────────────────────────────────────────────────────────────
// Request parameters
// ─────────────────────────────────────────────────────────────────

/// Parameters for `get_features`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFeaturesParams {
    pub application_id: String,
    pub layer_id: String,

    /// 1-based page number
    pub page: Option<u32>,
    pub page_size: Option<u32>,

    /// CQL filter
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortDirection,

    /// Restrict the response to one exact feature id
    pub fid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLayerExportCapabilitiesParams {
    pub application_id: String,
    pub layer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLayerExportParams {
    pub application_id: String,
    pub layer_id: String,

    /// Concrete backend output format, e.g. `text/csv`
    pub output_format: String,
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortDirection,

    /// Attribute keys to include, in display order
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUniqueValuesParams {
    pub application_id: String,
    pub layer_id: String,
    pub attribute: String,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanExpandRowParams {
    pub application_id: String,
    pub layer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFeatureDetailsParams {
    pub application_id: String,
    pub layer_id: String,
    pub feature_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_model_deserializes_fid() {
        let feature: FeatureModel = serde_json::from_value(json!({
            "__fid": "roads.12",
            "attributes": {"name": "Main street"}
        }))
        .unwrap();

        assert_eq!(feature.fid.as_deref(), Some("roads.12"));
        assert_eq!(feature.attributes["name"], json!("Main street"));
        assert!(feature.geometry.is_none());
    }

    #[test]
    fn test_features_response_defaults() {
        let response: FeaturesResponse = serde_json::from_value(json!({
            "columnMetadata": [{"key": "name", "type": "string"}],
            "total": 25
        }))
        .unwrap();

        assert!(response.features.is_empty());
        assert_eq!(response.column_metadata.len(), 1);
        assert_eq!(response.total, Some(25));
    }

    #[test]
    fn test_unknown_attribute_type_is_other() {
        let meta: ColumnMetadata =
            serde_json::from_value(json!({"key": "blob", "type": "binary"})).unwrap();
        assert_eq!(meta.attribute_type, AttributeType::Other);
    }
}
