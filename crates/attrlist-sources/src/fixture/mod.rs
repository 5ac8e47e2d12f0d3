//! JSON fixture transport.
//!
//! [`FixtureApi`] serves layers and features from a JSON document, which lets
//! the headless runner drive the engine without a backend:
//!
//! ```json
//! {
//!   "applicationId": "demo",
//!   "layers": [{
//!     "id": "1", "title": "Roads",
//!     "columns": [{"key": "name", "type": "string"}],
//!     "features": [{"__fid": "roads.1", "attributes": {"name": "Main"}}],
//!     "exportFormats": ["text/csv", "application/geo+json"]
//!   }]
//! }
//! ```

mod cql;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use attrlist_core::prelude::*;
use attrlist_core::{
    AppLayer, ColumnMetadata, FeatureDetailsModel, FeatureModel, FeaturesResponse,
    GetFeatureDetailsParams, GetFeaturesParams, GetLayerExportCapabilitiesParams,
    GetLayerExportParams, GetUniqueValuesParams, LayerExport, LayerExportCapabilities,
    SortDirection,
};

use crate::api::AttributeListApi;

pub use cql::{compare_values, CqlFilter};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// One layer of a fixture document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureLayer {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub hidden_functionality: Vec<String>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub features: Vec<FeatureModel>,
    #[serde(default)]
    pub export_formats: Vec<String>,

    /// Related-record details by feature id
    #[serde(default)]
    pub details: HashMap<String, FeatureDetailsModel>,
}

/// A fixture document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub layers: Vec<FixtureLayer>,
}

/// In-memory [`AttributeListApi`] over a [`Fixture`]
#[derive(Debug, Clone, Default)]
pub struct FixtureApi {
    fixture: Fixture,
}

impl FixtureApi {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        info!(
            "Loaded fixture {} with {} layer(s)",
            path.display(),
            fixture.layers.len()
        );
        Ok(Self::new(fixture))
    }

    pub fn application_id(&self) -> Option<&str> {
        self.fixture.application_id.as_deref()
    }

    pub fn has_details(&self) -> bool {
        self.fixture.layers.iter().any(|l| !l.details.is_empty())
    }

    /// The fixture layers as map layers
    pub fn layers(&self) -> Vec<AppLayer> {
        self.fixture
            .layers
            .iter()
            .map(|l| AppLayer {
                id: l.id.clone(),
                title: l.title.clone(),
                hidden_functionality: l.hidden_functionality.clone(),
            })
            .collect()
    }

    fn layer(&self, layer_id: &str) -> Result<&FixtureLayer> {
        self.fixture
            .layers
            .iter()
            .find(|l| l.id == layer_id)
            .ok_or_else(|| Error::transport(format!("Layer {} not found", layer_id)))
    }

    fn filtered<'a>(
        &self,
        layer: &'a FixtureLayer,
        filter: Option<&str>,
    ) -> Result<Vec<&'a FeatureModel>> {
        let filter = filter
            .filter(|f| !f.trim().is_empty())
            .map(CqlFilter::parse)
            .transpose()?;
        Ok(layer
            .features
            .iter()
            .filter(|f| filter.as_ref().map_or(true, |c| c.matches(&f.attributes)))
            .collect())
    }

    fn sorted<'a>(
        features: &mut [&'a FeatureModel],
        sort_by: Option<&str>,
        order: SortDirection,
    ) {
        let Some(attr) = sort_by else {
            return;
        };
        if order == SortDirection::None {
            return;
        }
        features.sort_by(|a, b| {
            let ord = compare_values(
                a.attributes.get(attr).unwrap_or(&Value::Null),
                b.attributes.get(attr).unwrap_or(&Value::Null),
            );
            if order == SortDirection::Desc {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    fn export_columns(layer: &FixtureLayer, requested: &[String]) -> Vec<String> {
        if !requested.is_empty() {
            return requested.to_vec();
        }
        layer
            .columns
            .iter()
            .filter(|c| !c.attribute_type.is_geometry())
            .map(|c| c.key.clone())
            .collect()
    }

    fn export_csv(features: &[&FeatureModel], columns: &[String]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(columns)
            .map_err(|e| Error::export(e.to_string()))?;
        for feature in features {
            let record: Vec<String> = columns
                .iter()
                .map(|c| match feature.attributes.get(c) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| Error::export(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::export(e.to_string()))
    }

    fn export_geojson(features: &[&FeatureModel], columns: &[String]) -> Result<Vec<u8>> {
        let features: Vec<Value> = features
            .iter()
            .map(|f| {
                let properties: serde_json::Map<String, Value> = columns
                    .iter()
                    .filter_map(|c| f.attributes.get(c).map(|v| (c.clone(), v.clone())))
                    .collect();
                json!({
                    "type": "Feature",
                    "id": f.fid,
                    "geometry": Value::Null,
                    "properties": properties,
                })
            })
            .collect();
        Ok(serde_json::to_vec_pretty(&json!({
            "type": "FeatureCollection",
            "features": features,
        }))?)
    }
}

impl AttributeListApi for FixtureApi {
    async fn get_features(&self, params: GetFeaturesParams) -> Result<FeaturesResponse> {
        let layer = self.layer(&params.layer_id)?;
        let mut features = self.filtered(layer, params.filter.as_deref())?;
        if let Some(fid) = params.fid.as_deref() {
            features.retain(|f| f.fid.as_deref() == Some(fid));
        }
        Self::sorted(&mut features, params.sort_by.as_deref(), params.sort_order);

        let total = features.len() as u64;
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let start = ((page - 1) * page_size) as usize;

        let page_features = features
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(FeaturesResponse {
            features: page_features,
            column_metadata: layer.columns.clone(),
            total: Some(total),
            page: Some(page),
            page_size: Some(page_size),
        })
    }

    async fn get_layer_export_capabilities(
        &self,
        params: GetLayerExportCapabilitiesParams,
    ) -> Result<LayerExportCapabilities> {
        let layer = self.layer(&params.layer_id)?;
        Ok(LayerExportCapabilities {
            exportable: !layer.export_formats.is_empty(),
            output_formats: layer.export_formats.clone(),
        })
    }

    async fn get_layer_export(&self, params: GetLayerExportParams) -> Result<Option<LayerExport>> {
        let layer = self.layer(&params.layer_id)?;
        let mut features = self.filtered(layer, params.filter.as_deref())?;
        Self::sorted(&mut features, params.sort_by.as_deref(), params.sort_order);
        let columns = Self::export_columns(layer, &params.attributes);

        if params.output_format.contains("csv") {
            let file = Self::export_csv(&features, &columns)?;
            return Ok(Some(LayerExport {
                file,
                file_name: Some(format!("{}.csv", layer.title)),
            }));
        }
        if params.output_format.contains("json") {
            let file = Self::export_geojson(&features, &columns)?;
            return Ok(Some(LayerExport {
                file,
                file_name: None,
            }));
        }
        Err(Error::transport(format!(
            "Output format {} is not supported",
            params.output_format
        )))
    }

    async fn get_unique_values(&self, params: GetUniqueValuesParams) -> Result<Vec<Value>> {
        let layer = self.layer(&params.layer_id)?;
        let features = self.filtered(layer, params.filter.as_deref())?;

        let mut seen = BTreeSet::new();
        let mut values: Vec<Value> = features
            .iter()
            .filter_map(|f| f.attributes.get(&params.attribute))
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(v.to_string()))
            .cloned()
            .collect();
        values.sort_by(compare_values);
        Ok(values)
    }

    async fn get_feature_details(
        &self,
        params: GetFeatureDetailsParams,
    ) -> Result<Option<FeatureDetailsModel>> {
        let layer = self.layer(&params.layer_id)?;
        Ok(layer.details.get(&params.feature_id).cloned())
    }
}
