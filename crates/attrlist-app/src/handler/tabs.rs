//! Tab lifecycle handlers and input-driven reconciliation

use std::collections::HashSet;

use attrlist_core::{AppLayer, Dataset, Tab, TabDescriptor};

use crate::message::Message;
use crate::state::AppState;
use crate::tab_sync;

use super::UpdateResult;

pub fn handle_visible_layers(state: &mut AppState, layers: Vec<AppLayer>) -> UpdateResult {
    state.visible_layers = layers;
    UpdateResult::maybe_message(tab_sync::reconcile(state))
}

pub fn handle_source_tabs(
    state: &mut AppState,
    source_id: String,
    tabs: Vec<TabDescriptor>,
) -> UpdateResult {
    state.source_tabs.insert(source_id, tabs);
    UpdateResult::maybe_message(tab_sync::reconcile(state))
}

pub fn handle_panel_visibility(state: &mut AppState, visible: bool) -> UpdateResult {
    state.panel_visible = visible;
    if visible {
        UpdateResult::maybe_message(tab_sync::reconcile(state))
    } else {
        UpdateResult::none()
    }
}

/// A new application id makes every loaded page stale, including loads
/// still in flight.
pub fn handle_application_changed(
    state: &mut AppState,
    application_id: Option<String>,
) -> UpdateResult {
    if state.application_id == application_id {
        return UpdateResult::none();
    }
    tracing::info!("Application changed to {:?}", application_id);
    state.application_id = application_id;
    state.highlighted_feature = None;
    state.export.formats_by_tab.clear();

    for tab in &mut state.tabs {
        tab.initial_data_loaded = false;
        tab.loading_data = false;
        tab.loading_error = None;
    }
    for dataset in &mut state.datasets {
        dataset.page_index = 0;
        dataset.load_sequence += 1;
        dataset.select_row(None);
    }

    match (&state.application_id, &state.selected_tab_id) {
        (Some(_), Some(tab_id)) => UpdateResult::message(Message::LoadData {
            tab_id: tab_id.clone(),
        }),
        _ => UpdateResult::none(),
    }
}

/// Apply a tab change in one transition.
///
/// New tabs that duplicate an open `(source, layer)` pair are dropped along
/// with their datasets. Closed tabs lose all their datasets.
pub fn handle_change_tabs(
    state: &mut AppState,
    new_tabs: Vec<Tab>,
    new_data: Vec<Dataset>,
    closed_tabs: Vec<String>,
) -> UpdateResult {
    let closed: HashSet<&str> = closed_tabs.iter().map(String::as_str).collect();

    if !closed.is_empty() {
        state.tabs.retain(|t| !closed.contains(t.id.as_str()));
        state.datasets.retain(|d| !closed.contains(d.tab_id.as_str()));
        state
            .export
            .formats_by_tab
            .retain(|tab_id, _| !closed.contains(tab_id.as_str()));

        if state
            .highlighted_feature
            .as_ref()
            .is_some_and(|h| closed.contains(h.tab_id.as_str()))
        {
            state.highlighted_feature = None;
        }
    }

    let mut accepted: HashSet<String> = HashSet::new();
    for tab in new_tabs {
        let duplicate = state.tabs.iter().any(|open| {
            open.id == tab.id
                || (open.tab_source_id == tab.tab_source_id
                    && open.layer_id.is_some()
                    && open.layer_id == tab.layer_id)
        });
        if duplicate {
            tracing::debug!("Skipping duplicate tab for layer {:?}", tab.layer_id);
            continue;
        }
        accepted.insert(tab.id.clone());
        state.tabs.push(tab);
    }
    state.datasets.extend(
        new_data
            .into_iter()
            .filter(|d| accepted.contains(&d.tab_id)),
    );

    let selection_valid = state
        .selected_tab_id
        .as_deref()
        .is_some_and(|id| state.tab(id).is_some());
    if !selection_valid {
        state.selected_tab_id = state.tabs.first().map(|t| t.id.clone());
    }

    UpdateResult::maybe_message(initial_load_for_selected(state))
}

pub fn handle_select_tab(state: &mut AppState, tab_id: &str) -> UpdateResult {
    if state.tab(tab_id).is_none() {
        return UpdateResult::none();
    }
    state.selected_tab_id = Some(tab_id.to_string());
    UpdateResult::maybe_message(initial_load_for_selected(state))
}

/// `LoadData` for the selected tab if it has not loaded yet
fn initial_load_for_selected(state: &AppState) -> Option<Message> {
    let tab = state.selected_tab()?;
    if tab.initial_data_loaded || tab.loading_data {
        return None;
    }
    Some(Message::LoadData {
        tab_id: tab.id.clone(),
    })
}
