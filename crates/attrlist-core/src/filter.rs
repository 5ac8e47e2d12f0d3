//! Attribute filters and their CQL representation
//!
//! Filter state is owned outside the engine (the map's filter panel); the
//! engine only converts it to a CQL string per layer and reloads tabs whose
//! string changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by an [`AttributeFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    Null,
    NotNull,
    UniqueValues,
}

/// A single condition on one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    pub attribute: String,
    pub condition: FilterCondition,
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub invert_condition: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl AttributeFilter {
    pub fn new(attribute: impl Into<String>, condition: FilterCondition, value: Vec<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            condition,
            value,
            case_sensitive: false,
            invert_condition: false,
            disabled: false,
        }
    }

    /// CQL for this condition, `None` when the filter cannot apply (e.g. no value)
    pub fn to_cql(&self) -> Option<String> {
        let attr = &self.attribute;
        let like = if self.case_sensitive { "LIKE" } else { "ILIKE" };
        let first = self.value.first();

        let cql = match self.condition {
            FilterCondition::Null => format!("{} IS NULL", attr),
            FilterCondition::NotNull => format!("{} IS NOT NULL", attr),
            FilterCondition::Equals => format!("{} = {}", attr, cql_literal(first?)),
            FilterCondition::NotEquals => format!("{} <> {}", attr, cql_literal(first?)),
            FilterCondition::Greater => format!("{} > {}", attr, cql_literal(first?)),
            FilterCondition::GreaterOrEqual => format!("{} >= {}", attr, cql_literal(first?)),
            FilterCondition::Less => format!("{} < {}", attr, cql_literal(first?)),
            FilterCondition::LessOrEqual => format!("{} <= {}", attr, cql_literal(first?)),
            FilterCondition::Contains => {
                format!("{} {} '%{}%'", attr, like, escape(&value_text(first?)))
            }
            FilterCondition::StartsWith => {
                format!("{} {} '{}%'", attr, like, escape(&value_text(first?)))
            }
            FilterCondition::EndsWith => {
                format!("{} {} '%{}'", attr, like, escape(&value_text(first?)))
            }
            FilterCondition::UniqueValues => {
                if self.value.is_empty() {
                    return None;
                }
                let values: Vec<String> = self.value.iter().map(cql_literal).collect();
                format!("{} IN ({})", attr, values.join(","))
            }
        };

        if self.invert_condition {
            Some(format!("NOT({})", cql))
        } else {
            Some(cql)
        }
    }
}

/// How filters in a group combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

/// A set of filters applied to one or more layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub id: String,
    pub layer_ids: Vec<String>,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub filters: Vec<AttributeFilter>,
    #[serde(default)]
    pub disabled: bool,
}

impl FilterGroup {
    fn to_cql(&self) -> Option<String> {
        if self.disabled {
            return None;
        }
        let parts: Vec<String> = self
            .filters
            .iter()
            .filter(|f| !f.disabled)
            .filter_map(AttributeFilter::to_cql)
            .collect();
        if parts.is_empty() {
            return None;
        }
        let joiner = match self.operator {
            FilterOperator::And => " AND ",
            FilterOperator::Or => " OR ",
        };
        Some(format!("({})", parts.join(joiner)))
    }
}

/// Externally owned filter state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

impl FilterState {
    /// Combined CQL for one layer; groups are AND-ed
    pub fn cql_for_layer(&self, layer_id: &str) -> Option<String> {
        let parts: Vec<String> = self
            .groups
            .iter()
            .filter(|g| g.layer_ids.iter().any(|id| id == layer_id))
            .filter_map(FilterGroup::to_cql)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        }
    }

    /// CQL per layer for the given layers, omitting unfiltered layers
    pub fn cql_by_layer<'a>(
        &self,
        layer_ids: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<String, String> {
        layer_ids
            .into_iter()
            .filter_map(|id| self.cql_for_layer(id).map(|cql| (id.to_string(), cql)))
            .collect()
    }
}

/// Layers whose filter differs between two CQL maps
pub fn changed_layers(
    previous: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut changed: Vec<String> = current
        .iter()
        .filter(|(layer, cql)| previous.get(*layer) != Some(*cql))
        .map(|(layer, _)| layer.clone())
        .collect();
    changed.extend(
        previous
            .keys()
            .filter(|layer| !current.contains_key(*layer))
            .cloned(),
    );
    changed.sort();
    changed
}

fn escape(text: &str) -> String {
    text.replace('\'', "''")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cql_literal(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", escape(&value_text(other))),
    }
}
