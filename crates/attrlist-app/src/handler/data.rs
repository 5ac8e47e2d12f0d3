//! Data loading, paging, sorting and column handlers

use attrlist_core::{
    Column, FeaturesResponse, GetFeaturesParams, Row, SortDirection, DEFAULT_LOAD_ERROR,
};

use crate::config::PAGE_SIZE_RANGE;
use crate::message::Message;
use crate::state::{details_cache_key, AppState};

use super::{UpdateAction, UpdateResult};

/// Issue a load for a tab's selected dataset.
///
/// The loading flag is set here, before the action leaves the reducer.
pub fn handle_load_data(state: &mut AppState, tab_id: &str) -> UpdateResult {
    let Some(application_id) = state.application_id.clone() else {
        tracing::debug!("LoadData for {} skipped: no application", tab_id);
        return UpdateResult::none();
    };

    let Some(tab) = state.tab(tab_id) else {
        return missing_context(tab_id, None);
    };
    let Some(layer_id) = tab.layer_id.clone() else {
        return missing_context(tab_id, None);
    };
    let source_id = tab.tab_source_id.clone();
    let dataset_id = tab.selected_dataset_id.clone();
    let filter = state.filters.cql_for_layer(&layer_id);

    let Some(dataset) = state.dataset_mut(&dataset_id) else {
        return missing_context(tab_id, None);
    };
    dataset.load_sequence += 1;
    let sequence = dataset.load_sequence;

    let sort_by = match dataset.sort_direction {
        SortDirection::None => None,
        _ => dataset.sorted_column.clone(),
    };
    let params = GetFeaturesParams {
        application_id,
        layer_id,
        page: Some(dataset.page_index + 1),
        page_size: Some(dataset.page_size),
        filter,
        sort_by,
        sort_order: dataset.sort_direction,
        fid: None,
    };

    if let Some(tab) = state.tab_mut(tab_id) {
        tab.loading_data = true;
        tab.loading_error = None;
    }

    UpdateResult::action(UpdateAction::LoadFeatures {
        tab_id: tab_id.to_string(),
        dataset_id,
        source_id,
        sequence,
        params,
    })
}

fn missing_context(tab_id: &str, dataset_id: Option<String>) -> UpdateResult {
    tracing::warn!("LoadData for {}: tab or dataset not found", tab_id);
    UpdateResult::message(Message::LoadDataFailed {
        tab_id: tab_id.to_string(),
        dataset_id,
        sequence: None,
        error: None,
    })
}

pub fn handle_load_success(
    state: &mut AppState,
    tab_id: &str,
    dataset_id: &str,
    sequence: u64,
    response: FeaturesResponse,
) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        tracing::debug!("Dropping load result for removed dataset {}", dataset_id);
        return UpdateResult::none();
    };
    if dataset.load_sequence != sequence {
        tracing::debug!(
            "Dropping stale load result for {} (seq {} != {})",
            dataset_id,
            sequence,
            dataset.load_sequence
        );
        return UpdateResult::none();
    }

    dataset.rows = Row::from_features(
        &response.features,
        &dataset.id,
        dataset.page_index,
        dataset.selected_row_id.as_deref(),
    );
    dataset.total_count = response.total;
    if dataset.columns.is_empty() {
        dataset.columns = response
            .column_metadata
            .iter()
            .map(Column::from_metadata)
            .collect();
    }
    tracing::debug!(
        "Loaded {} rows into {} (total {:?})",
        dataset.rows.len(),
        dataset_id,
        dataset.total_count
    );

    if let Some(tab) = state.tab_mut(tab_id) {
        tab.loading_data = false;
        tab.initial_data_loaded = true;
        tab.loading_error = None;
    }

    let needs_expansion_check = state.load_context(tab_id).is_some_and(|context| {
        let key = details_cache_key(&context.application_id, &context.layer_id);
        !state.details.can_expand.contains_key(&key)
            && !state.details.can_expand_pending.contains(&key)
    });
    if needs_expansion_check {
        UpdateResult::message(Message::CheckRowExpansion {
            tab_id: tab_id.to_string(),
        })
    } else {
        UpdateResult::none()
    }
}

pub fn handle_load_failed(
    state: &mut AppState,
    tab_id: &str,
    dataset_id: Option<&str>,
    sequence: Option<u64>,
    error: Option<String>,
) -> UpdateResult {
    let dataset_id = dataset_id
        .map(str::to_string)
        .or_else(|| state.tab(tab_id).map(|t| t.selected_dataset_id.clone()));

    if let Some(id) = dataset_id.as_deref() {
        if let Some(dataset) = state.dataset_mut(id) {
            if sequence.is_some_and(|seq| seq != dataset.load_sequence) {
                tracing::debug!("Dropping stale load failure for {}", dataset.id);
                return UpdateResult::none();
            }
            dataset.rows.clear();
            dataset.total_count = Some(0);
        }
    }

    let message = error
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOAD_ERROR.to_string());
    tracing::warn!("Load failed for tab {}: {}", tab_id, message);

    if let Some(tab) = state.tab_mut(tab_id) {
        tab.loading_data = false;
        tab.loading_error = Some(message);
    }
    UpdateResult::none()
}

pub fn handle_update_page(state: &mut AppState, dataset_id: &str, page_index: u32) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        return UpdateResult::none();
    };
    dataset.page_index = page_index;
    reload(&dataset.tab_id)
}

pub fn handle_change_page_size(
    state: &mut AppState,
    dataset_id: &str,
    page_size: u32,
) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        return UpdateResult::none();
    };
    dataset.page_size = page_size.clamp(*PAGE_SIZE_RANGE.start(), *PAGE_SIZE_RANGE.end());
    dataset.page_index = 0;
    reload(&dataset.tab_id)
}

/// A new sort starts again from the first page.
pub fn handle_update_sort(
    state: &mut AppState,
    dataset_id: &str,
    column: Option<String>,
    direction: SortDirection,
) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        return UpdateResult::none();
    };
    match (column, direction) {
        (Some(column), SortDirection::Asc | SortDirection::Desc) => {
            dataset.sorted_column = Some(column);
            dataset.sort_direction = direction;
        }
        _ => {
            dataset.sorted_column = None;
            dataset.sort_direction = SortDirection::None;
        }
    }
    dataset.page_index = 0;
    reload(&dataset.tab_id)
}

fn reload(tab_id: &str) -> UpdateResult {
    UpdateResult::message(Message::LoadData {
        tab_id: tab_id.to_string(),
    })
}

// ─────────────────────────────────────────────────────────
// Columns
// ─────────────────────────────────────────────────────────

pub fn handle_toggle_column(state: &mut AppState, dataset_id: &str, column_id: &str) -> UpdateResult {
    if let Some(dataset) = state.dataset_mut(dataset_id) {
        if let Some(column) = dataset.columns.iter_mut().find(|c| c.id == column_id) {
            column.visible = !column.visible;
        }
    }
    UpdateResult::none()
}

/// Show or hide every column. Geometry columns stay hidden.
pub fn handle_set_columns_visibility(
    state: &mut AppState,
    dataset_id: &str,
    visible: bool,
) -> UpdateResult {
    if let Some(dataset) = state.dataset_mut(dataset_id) {
        for column in &mut dataset.columns {
            column.visible = visible && !column.attribute_type.is_geometry();
        }
    }
    UpdateResult::none()
}

pub fn handle_change_column_position(
    state: &mut AppState,
    dataset_id: &str,
    column_id: &str,
    target_column_id: &str,
) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        return UpdateResult::none();
    };
    let from = dataset.columns.iter().position(|c| c.id == column_id);
    let to = dataset.columns.iter().position(|c| c.id == target_column_id);
    if let (Some(from), Some(to)) = (from, to) {
        if from != to {
            let column = dataset.columns.remove(from);
            dataset.columns.insert(to, column);
        }
    }
    UpdateResult::none()
}
