//! Semantic export formats and their mapping to backend-declared formats

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Backend-agnostic export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Shape,
    Geopackage,
    Geojson,
    Dxf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Csv,
        ExportFormat::Xlsx,
        ExportFormat::Shape,
        ExportFormat::Geopackage,
        ExportFormat::Geojson,
        ExportFormat::Dxf,
    ];

    /// Known format codes and MIME types backends use for this format.
    /// Matching is case-sensitive.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ExportFormat::Csv => &["csv", "text/csv"],
            ExportFormat::Xlsx => &[
                "excel",
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ],
            ExportFormat::Shape => &[
                "SHAPE-ZIP",
                "shape-zip",
                "application/x-zipped-shp",
                "application/vnd.shp",
                "shapefile",
            ],
            ExportFormat::Geopackage => &[
                "application/geopackage+sqlite3",
                "application/x-gpkg",
                "geopackage",
                "geopkg",
                "gpkg",
            ],
            ExportFormat::Geojson => &[
                "application/geo+json",
                "application/geojson",
                "application/json",
                "geojson",
                "json",
            ],
            ExportFormat::Dxf => &["DXF", "DXF-ZIP", "application/dxf", "dxf"],
        }
    }

    /// File extension used for generated file names
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Shape => "zip",
            ExportFormat::Geopackage => "gpkg",
            ExportFormat::Geojson => "geojson",
            ExportFormat::Dxf => "dxf",
        }
    }

    /// Whether a backend-declared format string denotes this format
    pub fn matches(&self, declared: &str) -> bool {
        self.aliases()
            .iter()
            .any(|alias| declared == *alias || declared.contains(alias))
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "shape" | "shp" | "shapefile" => Some(ExportFormat::Shape),
            "geopackage" | "gpkg" => Some(ExportFormat::Geopackage),
            "geojson" => Some(ExportFormat::Geojson),
            "dxf" => Some(ExportFormat::Dxf),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Xlsx => "XLSX",
            ExportFormat::Shape => "SHAPE",
            ExportFormat::Geopackage => "GEOPACKAGE",
            ExportFormat::Geojson => "GEOJSON",
            ExportFormat::Dxf => "DXF",
        };
        write!(f, "{}", name)
    }
}

/// Semantic formats with at least one matching declared format
pub fn supported_formats<S: AsRef<str>>(declared: &[S]) -> BTreeSet<ExportFormat> {
    ExportFormat::ALL
        .into_iter()
        .filter(|format| declared.iter().any(|d| format.matches(d.as_ref())))
        .collect()
}

/// First declared format string that satisfies `format`
pub fn resolve_output_format<S: AsRef<str>>(declared: &[S], format: ExportFormat) -> Option<String> {
    declared
        .iter()
        .map(AsRef::as_ref)
        .find(|d| format.matches(d))
        .map(str::to_string)
}

/// `Export_{layer}_{timestamp}.{ext}`, used when the backend sends no name
pub fn fallback_file_name<Tz>(layer: &str, format: ExportFormat, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let layer: String = layer
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!(
        "Export_{}_{}.{}",
        layer,
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}
