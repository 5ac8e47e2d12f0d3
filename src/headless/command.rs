//! Stdin commands understood by the headless runner
//!
//! One command per line, words separated by whitespace:
//!
//! ```text
//! select-tab 2          page 1            page-size 25
//! sort name desc        select-row f3     deselect
//! toggle-column name    show-columns      hide-columns
//! move-column a c       formats           export csv
//! details f3            unique name       filter 1 name Main
//! clear-filters         hide-layer 1      show-layer 1
//! hide-panel            show-panel        quit
//! ```

use attrlist_core::{ExportFormat, SortDirection};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Select a tab by 1-based position or id
    SelectTab(String),
    /// 1-based page number
    Page(u32),
    PageSize(u32),
    Sort {
        column: String,
        direction: SortDirection,
    },
    SelectRow(String),
    Deselect,
    ToggleColumn(String),
    SetColumnsVisible(bool),
    MoveColumn {
        column: String,
        target: String,
    },
    Formats,
    Export(ExportFormat),
    Details(String),
    UniqueValues(String),
    Filter {
        layer_id: String,
        attribute: String,
        value: String,
    },
    ClearFilters,
    HideLayer(String),
    ShowLayer(String),
    SetPanelVisible(bool),
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (name, args) {
            ("select-tab", [tab]) => Self::SelectTab(tab.to_string()),
            ("page", [page]) => Self::Page(parse_number(page)?),
            ("page-size", [size]) => Self::PageSize(parse_number(size)?),
            ("sort", [column]) => Self::Sort {
                column: column.to_string(),
                direction: SortDirection::Asc,
            },
            ("sort", [column, direction]) => Self::Sort {
                column: column.to_string(),
                direction: SortDirection::parse(direction),
            },
            ("select-row", [row]) => Self::SelectRow(row.to_string()),
            ("deselect", []) => Self::Deselect,
            ("toggle-column", [column]) => Self::ToggleColumn(column.to_string()),
            ("show-columns", []) => Self::SetColumnsVisible(true),
            ("hide-columns", []) => Self::SetColumnsVisible(false),
            ("move-column", [column, target]) => Self::MoveColumn {
                column: column.to_string(),
                target: target.to_string(),
            },
            ("formats", []) => Self::Formats,
            ("export", [format]) => Self::Export(
                ExportFormat::parse(format).ok_or_else(|| format!("Unknown format: {}", format))?,
            ),
            ("details", [feature]) => Self::Details(feature.to_string()),
            ("unique", [attribute]) => Self::UniqueValues(attribute.to_string()),
            ("filter", [layer_id, attribute, value @ ..]) if !value.is_empty() => Self::Filter {
                layer_id: layer_id.to_string(),
                attribute: attribute.to_string(),
                value: value.join(" "),
            },
            ("clear-filters", []) => Self::ClearFilters,
            ("hide-layer", [layer]) => Self::HideLayer(layer.to_string()),
            ("show-layer", [layer]) => Self::ShowLayer(layer.to_string()),
            ("hide-panel", []) => Self::SetPanelVisible(false),
            ("show-panel", []) => Self::SetPanelVisible(true),
            ("q" | "quit", []) => Self::Quit,
            _ => return Err(format!("Unknown command: {}", line.trim())),
        };
        Ok(Some(command))
    }
}

fn parse_number(s: &str) -> Result<u32, String> {
    s.parse().map_err(|_| format!("Not a number: {}", s))
}
