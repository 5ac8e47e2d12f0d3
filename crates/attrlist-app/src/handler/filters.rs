//! Filter change propagation

use attrlist_core::{changed_layers, FilterState};

use crate::message::Message;
use crate::state::AppState;

use super::UpdateResult;

/// Reload tabs whose layer filter changed.
///
/// Affected datasets go back to the first page. The selected tab reloads
/// now; other affected tabs are marked stale, drop any load in flight and
/// reload when selected.
pub fn handle_filters_changed(state: &mut AppState, filters: FilterState) -> UpdateResult {
    let layer_ids: Vec<String> = state
        .tab_layer_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let previous = state
        .filters
        .cql_by_layer(layer_ids.iter().map(String::as_str));
    let current = filters.cql_by_layer(layer_ids.iter().map(String::as_str));
    state.filters = filters;

    let changed = changed_layers(&previous, &current);
    if changed.is_empty() {
        return UpdateResult::none();
    }
    tracing::debug!("Filter changed for layers {:?}", changed);

    let selected = state.selected_tab_id.clone();
    let mut reload_selected = false;

    let affected: Vec<(String, String)> = state
        .tabs
        .iter()
        .filter(|t| t.layer_id.as_ref().is_some_and(|l| changed.contains(l)))
        .map(|t| (t.id.clone(), t.selected_dataset_id.clone()))
        .collect();

    for (tab_id, dataset_id) in affected {
        let background = selected.as_deref() != Some(tab_id.as_str());
        if let Some(dataset) = state.dataset_mut(&dataset_id) {
            dataset.page_index = 0;
            // Unfiltered loads still in flight must not land
            if background {
                dataset.load_sequence += 1;
            }
        }
        if !background {
            reload_selected = true;
        } else if let Some(tab) = state.tab_mut(&tab_id) {
            tab.initial_data_loaded = false;
            tab.loading_data = false;
        }
    }

    match selected {
        Some(tab_id) if reload_selected => UpdateResult::message(Message::LoadData { tab_id }),
        _ => UpdateResult::none(),
    }
}
