//! Attribute list domain types: layers, tabs, datasets, columns and rows

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::feature::{ColumnMetadata, FeatureModel};

/// Functionality key a layer uses to opt out of the attribute list
pub const ATTRIBUTE_LIST_FUNCTIONALITY: &str = "attributeList";

/// A layer as reported by the map's visible-layer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLayer {
    pub id: String,

    pub title: String,

    /// Functionality the layer hides from the viewer (e.g. `attributeList`)
    #[serde(default)]
    pub hidden_functionality: Vec<String>,
}

impl AppLayer {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            hidden_functionality: Vec::new(),
        }
    }

    /// Whether the layer may get an attribute list tab
    pub fn has_attribute_list(&self) -> bool {
        !self
            .hidden_functionality
            .iter()
            .any(|f| f == ATTRIBUTE_LIST_FUNCTIONALITY)
    }
}

/// A tab a source wants to have open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDescriptor {
    pub layer_id: String,
    pub label: String,
}

impl TabDescriptor {
    pub fn new(layer_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            label: label.into(),
        }
    }

    /// Descriptors for every visible layer that allows an attribute list
    pub fn from_layers(layers: &[AppLayer]) -> Vec<Self> {
        layers
            .iter()
            .filter(|layer| layer.has_attribute_list())
            .map(|layer| Self::new(layer.id.clone(), layer.title.clone()))
            .collect()
    }
}

/// One open tab: a layer's tabular data from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub label: String,

    /// Id of the owning source, resolved through the registry on use
    pub tab_source_id: String,

    pub layer_id: Option<String>,
    pub selected_dataset_id: String,
    pub initial_data_loaded: bool,
    pub loading_data: bool,
    pub loading_error: Option<String>,
}

impl Tab {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        tab_source_id: impl Into<String>,
        layer_id: Option<String>,
        selected_dataset_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tab_source_id: tab_source_id.into(),
            layer_id,
            selected_dataset_id: selected_dataset_id.into(),
            initial_data_loaded: false,
            loading_data: false,
            loading_error: None,
        }
    }
}

/// Sort direction for a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
    #[default]
    #[serde(rename = "")]
    None,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
            SortDirection::None => "",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => SortDirection::None,
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    String,
    Integer,
    Double,
    Boolean,
    Date,
    Timestamp,
    Geometry,
    #[serde(other)]
    Other,
}

impl AttributeType {
    pub fn is_geometry(&self) -> bool {
        matches!(self, AttributeType::Geometry)
    }
}

/// A column of a dataset. `id` is the backend attribute key and stays stable
/// across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub visible: bool,
}

impl Column {
    /// Geometry attributes are never shown in the grid
    pub fn from_metadata(metadata: &ColumnMetadata) -> Self {
        Self {
            id: metadata.key.clone(),
            label: metadata
                .alias
                .clone()
                .filter(|alias| !alias.is_empty())
                .unwrap_or_else(|| metadata.key.clone()),
            attribute_type: metadata.attribute_type,
            visible: !metadata.attribute_type.is_geometry(),
        }
    }
}

/// A grid row built from a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    #[serde(rename = "__fid", skip_serializing_if = "Option::is_none")]
    pub fid: Option<String>,
    pub selected: bool,
    pub attributes: Map<String, Value>,
}

impl Row {
    /// Build the rows for one loaded page.
    ///
    /// Row ids are the feature id when the backend provides one, otherwise
    /// `{dataset_id}_{page_index}_{index}`, so they are only unique per page.
    /// A feature id repeated within the page falls back to the positional id.
    pub fn from_features(
        features: &[FeatureModel],
        dataset_id: &str,
        page_index: u32,
        selected_row_id: Option<&str>,
    ) -> Vec<Row> {
        let mut seen = HashSet::new();
        features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                let fid = feature.fid.clone().filter(|fid| !fid.is_empty());
                let id = match &fid {
                    Some(fid) if seen.insert(fid.clone()) => fid.clone(),
                    _ => format!("{}_{}_{}", dataset_id, page_index, index),
                };
                let selected = selected_row_id == Some(id.as_str());
                Row {
                    id,
                    fid,
                    selected,
                    attributes: feature.attributes.clone(),
                }
            })
            .collect()
    }
}

/// The paginated, sorted payload belonging to a tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub tab_id: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub page_index: u32,
    pub page_size: u32,

    /// `None` means not resolved yet, never zero
    pub total_count: Option<u64>,

    pub sorted_column: Option<String>,
    pub sort_direction: SortDirection,
    pub selected_row_id: Option<String>,

    /// Sequence number of the latest load issued for this dataset
    #[serde(skip)]
    pub load_sequence: u64,
}

impl Dataset {
    pub fn new(id: impl Into<String>, tab_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            id: id.into(),
            tab_id: tab_id.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            page_index: 0,
            page_size,
            total_count: None,
            sorted_column: None,
            sort_direction: SortDirection::None,
            selected_row_id: None,
            load_sequence: 0,
        }
    }

    /// Mark exactly one row as selected (or none).
    pub fn select_row(&mut self, row_id: Option<&str>) {
        self.selected_row_id = row_id.map(str::to_string);
        for row in &mut self.rows {
            row.selected = Some(row.id.as_str()) == row_id;
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.selected)
    }

    pub fn visible_column_ids(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn paging_data(&self) -> PagingData {
        PagingData {
            page_index: self.page_index,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

/// Paging projection for the selected tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingData {
    pub page_index: u32,
    pub page_size: u32,
    pub total_count: Option<u64>,
}

/// Sort projection for the selected tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortData {
    pub column: Option<String>,
    pub direction: SortDirection,
}
