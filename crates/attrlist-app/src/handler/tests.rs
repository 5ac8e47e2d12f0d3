//! Tests for handler module

use std::collections::BTreeSet;

use serde_json::json;

use super::*;
use crate::message::Message;
use crate::notification::NotificationLevel;
use crate::state::AppState;
use attrlist_core::{
    AppLayer, AttributeFilter, AttributeType, Column, Dataset, ExportFormat, FeatureDetailsModel,
    FeaturesResponse, FilterCondition, FilterGroup, FilterOperator, FilterState, GetFeaturesParams,
    LayerExport, LayerExportCapabilities, SortDirection, Tab, DEFAULT_LOAD_ERROR,
};
use attrlist_sources::test_utils::{features_response, test_feature, test_layer};

/// Run a message and its follow-ups, collecting the actions they produce
fn dispatch(state: &mut AppState, message: Message) -> Vec<UpdateAction> {
    let mut actions = Vec::new();
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = update(state, m);
        actions.extend(result.action);
        msg = result.message;
    }
    actions
}

/// Visible panel for application `app` showing the given layers
fn panel(layers: &[(&str, &str)]) -> (AppState, Vec<UpdateAction>) {
    let mut state = AppState::new();
    state.application_id = Some("app".to_string());
    dispatch(&mut state, Message::PanelVisibilityChanged { visible: true });
    let layers = layers.iter().map(|(id, title)| test_layer(id, title)).collect();
    let actions = dispatch(&mut state, Message::VisibleLayersChanged { layers });
    (state, actions)
}

fn load_features(actions: &[UpdateAction]) -> (String, String, u64, GetFeaturesParams) {
    actions
        .iter()
        .find_map(|a| match a {
            UpdateAction::LoadFeatures {
                tab_id,
                dataset_id,
                sequence,
                params,
                ..
            } => Some((tab_id.clone(), dataset_id.clone(), *sequence, params.clone())),
            _ => None,
        })
        .expect("expected a LoadFeatures action")
}

/// Panel with one loaded `roads` tab of 10 rows
fn loaded_panel() -> (AppState, String, String) {
    let (mut state, actions) = panel(&[("roads", "Roads")]);
    let (tab_id, dataset_id, sequence, _) = load_features(&actions);
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: tab_id.clone(),
            dataset_id: dataset_id.clone(),
            sequence,
            response: features_response(10, Some(25)),
        },
    );
    (state, tab_id, dataset_id)
}

fn roads_filter(value: &str) -> FilterState {
    FilterState {
        groups: vec![FilterGroup {
            id: "g1".to_string(),
            layer_ids: vec!["roads".to_string()],
            operator: FilterOperator::And,
            filters: vec![AttributeFilter::new(
                "name",
                FilterCondition::Equals,
                vec![json!(value)],
            )],
            disabled: false,
        }],
    }
}

// ─────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────

#[test]
fn test_quit_message_requests_quit() {
    let mut state = AppState::new();
    assert!(!state.should_quit());

    update(&mut state, Message::Quit);

    assert!(state.should_quit());
}

#[test]
fn test_hidden_panel_opens_no_tabs() {
    let mut state = AppState::new();
    state.application_id = Some("app".to_string());
    dispatch(
        &mut state,
        Message::VisibleLayersChanged {
            layers: vec![test_layer("roads", "Roads")],
        },
    );
    assert!(state.tabs.is_empty());

    let actions = dispatch(&mut state, Message::PanelVisibilityChanged { visible: true });
    assert_eq!(state.tabs.len(), 1);
    assert!(state.tabs[0].loading_data);
    assert_eq!(actions.len(), 1);
}

// ─────────────────────────────────────────────────────────
// Tabs
// ─────────────────────────────────────────────────────────

#[test]
fn test_visible_layer_opens_and_loads_tab() {
    let (state, actions) = panel(&[("L1", "Layer 1")]);

    assert_eq!(state.tabs.len(), 1);
    assert_eq!(state.datasets.len(), 1);
    let tab = &state.tabs[0];
    assert_eq!(state.selected_tab_id.as_deref(), Some(tab.id.as_str()));

    let dataset = state.tab_dataset(&tab.id).unwrap();
    assert_eq!(dataset.page_index, 0);
    assert_eq!(dataset.page_size, 10);

    let (tab_id, dataset_id, _, params) = load_features(&actions);
    assert_eq!(tab_id, tab.id);
    assert_eq!(dataset_id, dataset.id);
    assert_eq!(params.application_id, "app");
    assert_eq!(params.layer_id, "L1");
    assert_eq!(params.page, Some(1));
    assert_eq!(params.page_size, Some(10));
    assert_eq!(params.filter, None);
    assert_eq!(params.sort_by, None);
}

#[test]
fn test_unchanged_layers_emit_nothing() {
    let (mut state, _) = panel(&[("roads", "Roads"), ("rivers", "Rivers")]);
    let tab_ids: Vec<String> = state.tabs.iter().map(|t| t.id.clone()).collect();

    let actions = dispatch(
        &mut state,
        Message::VisibleLayersChanged {
            layers: vec![test_layer("roads", "Roads"), test_layer("rivers", "Rivers")],
        },
    );

    assert!(actions.is_empty());
    let after: Vec<String> = state.tabs.iter().map(|t| t.id.clone()).collect();
    assert_eq!(tab_ids, after);
}

#[test]
fn test_closed_tab_removes_datasets_and_moves_selection() {
    let (mut state, _) = panel(&[("roads", "Roads"), ("rivers", "Rivers")]);
    let roads = state.tabs[0].id.clone();
    let rivers = state.tabs[1].id.clone();
    dispatch(
        &mut state,
        Message::SelectTab {
            tab_id: rivers.clone(),
        },
    );
    assert_eq!(state.selected_tab_id.as_deref(), Some(rivers.as_str()));

    dispatch(
        &mut state,
        Message::VisibleLayersChanged {
            layers: vec![test_layer("roads", "Roads")],
        },
    );

    assert!(state.tab(&rivers).is_none());
    assert!(state.datasets.iter().all(|d| d.tab_id != rivers));
    assert_eq!(state.datasets.len(), 1);
    assert_eq!(state.selected_tab_id.as_deref(), Some(roads.as_str()));
}

#[test]
fn test_closing_last_tab_clears_selection() {
    let (mut state, _) = panel(&[("roads", "Roads")]);

    dispatch(&mut state, Message::VisibleLayersChanged { layers: vec![] });

    assert!(state.tabs.is_empty());
    assert!(state.datasets.is_empty());
    assert!(state.selected_tab_id.is_none());
}

#[test]
fn test_change_tabs_drops_duplicates_with_their_datasets() {
    let (mut state, _) = panel(&[("roads", "Roads")]);

    dispatch(
        &mut state,
        Message::ChangeTabs {
            new_tabs: vec![Tab::new(
                "tab-dup",
                "Roads",
                "default",
                Some("roads".to_string()),
                "dataset-dup",
            )],
            new_data: vec![Dataset::new("dataset-dup", "tab-dup", 10)],
            closed_tabs: vec![],
        },
    );

    assert_eq!(state.tabs.len(), 1);
    assert_eq!(state.datasets.len(), 1);
    assert!(state.dataset("dataset-dup").is_none());
}

#[test]
fn test_select_tab_loads_once() {
    let (mut state, _) = panel(&[("roads", "Roads"), ("rivers", "Rivers")]);
    let rivers = state.tabs[1].id.clone();

    let actions = dispatch(
        &mut state,
        Message::SelectTab {
            tab_id: rivers.clone(),
        },
    );
    assert_eq!(actions.len(), 1);

    // Still loading: selecting again does not issue another load
    let actions = dispatch(&mut state, Message::SelectTab { tab_id: rivers });
    assert!(actions.is_empty());
}

#[test]
fn test_select_unknown_tab_is_ignored() {
    let (mut state, _) = panel(&[("roads", "Roads")]);
    let selected = state.selected_tab_id.clone();

    let actions = dispatch(
        &mut state,
        Message::SelectTab {
            tab_id: "tab-missing".to_string(),
        },
    );

    assert!(actions.is_empty());
    assert_eq!(state.selected_tab_id, selected);
}

#[test]
fn test_source_tabs_open_alongside_layers() {
    let (mut state, _) = panel(&[("roads", "Roads")]);

    dispatch(
        &mut state,
        Message::SourceTabsChanged {
            source_id: "wfs".to_string(),
            tabs: vec![attrlist_core::TabDescriptor::new("parcels", "Parcels")],
        },
    );

    assert_eq!(state.tabs.len(), 2);
    assert_eq!(state.tabs[1].tab_source_id, "wfs");

    dispatch(
        &mut state,
        Message::SourceTabsChanged {
            source_id: "wfs".to_string(),
            tabs: vec![],
        },
    );
    assert_eq!(state.tabs.len(), 1);
}

// ─────────────────────────────────────────────────────────
// Data Loading
// ─────────────────────────────────────────────────────────

#[test]
fn test_load_success_populates_dataset() {
    let (state, tab_id, dataset_id) = loaded_panel();

    let dataset = state.dataset(&dataset_id).unwrap();
    assert_eq!(dataset.rows.len(), 10);
    assert_eq!(dataset.total_count, Some(25));
    assert_eq!(dataset.columns.len(), 1);
    assert_eq!(dataset.columns[0].label, "Name");

    let tab = state.tab(&tab_id).unwrap();
    assert!(!tab.loading_data);
    assert!(tab.initial_data_loaded);
    assert!(tab.loading_error.is_none());
}

#[test]
fn test_load_success_checks_row_expansion() {
    let (mut state, actions) = panel(&[("roads", "Roads")]);
    let (tab_id, dataset_id, sequence, _) = load_features(&actions);

    let actions = dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id,
            dataset_id,
            sequence,
            response: features_response(1, Some(1)),
        },
    );

    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::CheckRowExpansion { cache_key, .. }] if cache_key == "app_roads"
    ));
}

#[test]
fn test_load_sets_loading_before_dispatch() {
    let (mut state, tab_id, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::LoadData {
            tab_id: tab_id.clone(),
        },
    );

    assert_eq!(actions.len(), 1);
    assert!(state.tab(&tab_id).unwrap().loading_data);
}

#[test]
fn test_load_without_application_is_noop() {
    let (mut state, tab_id, _) = loaded_panel();
    state.application_id = None;

    let actions = dispatch(
        &mut state,
        Message::LoadData {
            tab_id: tab_id.clone(),
        },
    );

    assert!(actions.is_empty());
    let tab = state.tab(&tab_id).unwrap();
    assert!(!tab.loading_data);
    assert!(tab.loading_error.is_none());
}

#[test]
fn test_load_unknown_tab_fails_quietly() {
    let (mut state, _, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::LoadData {
            tab_id: "tab-missing".to_string(),
        },
    );

    assert!(actions.is_empty());
    assert_eq!(state.tabs.len(), 1);
}

#[test]
fn test_load_failure_sets_error_and_clears_rows() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    let actions = dispatch(
        &mut state,
        Message::LoadData {
            tab_id: tab_id.clone(),
        },
    );
    let (_, _, sequence, _) = load_features(&actions);

    dispatch(
        &mut state,
        Message::LoadDataFailed {
            tab_id: tab_id.clone(),
            dataset_id: Some(dataset_id.clone()),
            sequence: Some(sequence),
            error: Some("503 Service Unavailable".to_string()),
        },
    );

    let tab = state.tab(&tab_id).unwrap();
    assert!(!tab.loading_data);
    assert_eq!(tab.loading_error.as_deref(), Some("503 Service Unavailable"));
    let dataset = state.dataset(&dataset_id).unwrap();
    assert!(dataset.rows.is_empty());
    assert_eq!(dataset.total_count, Some(0));
    assert_eq!(state.loading_error_for_selected_tab(), Some("503 Service Unavailable"));
}

#[test]
fn test_load_failure_without_message_uses_default() {
    let (mut state, tab_id, _) = loaded_panel();

    dispatch(
        &mut state,
        Message::LoadDataFailed {
            tab_id: tab_id.clone(),
            dataset_id: None,
            sequence: None,
            error: Some("   ".to_string()),
        },
    );

    assert_eq!(
        state.tab(&tab_id).unwrap().loading_error.as_deref(),
        Some(DEFAULT_LOAD_ERROR)
    );
}

#[test]
fn test_stale_response_is_dropped() {
    let (mut state, tab_id, dataset_id) = loaded_panel();

    let first = dispatch(&mut state, Message::UpdatePage {
        dataset_id: dataset_id.clone(),
        page_index: 1,
    });
    let second = dispatch(&mut state, Message::UpdatePage {
        dataset_id: dataset_id.clone(),
        page_index: 2,
    });
    let (_, _, first_seq, _) = load_features(&first);
    let (_, _, second_seq, _) = load_features(&second);
    assert!(second_seq > first_seq);

    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: tab_id.clone(),
            dataset_id: dataset_id.clone(),
            sequence: first_seq,
            response: features_response(3, Some(3)),
        },
    );
    assert_eq!(state.dataset(&dataset_id).unwrap().rows.len(), 10);
    assert!(state.tab(&tab_id).unwrap().loading_data);

    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: tab_id.clone(),
            dataset_id: dataset_id.clone(),
            sequence: second_seq,
            response: features_response(5, Some(25)),
        },
    );
    assert_eq!(state.dataset(&dataset_id).unwrap().rows.len(), 5);
    assert!(!state.tab(&tab_id).unwrap().loading_data);
}

#[test]
fn test_existing_columns_survive_reload() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    let actions = dispatch(&mut state, Message::LoadData { tab_id: tab_id.clone() });
    let (_, _, sequence, _) = load_features(&actions);

    let mut response = features_response(2, Some(2));
    response.column_metadata = vec![attrlist_core::ColumnMetadata {
        key: "other".to_string(),
        alias: None,
        attribute_type: AttributeType::Integer,
    }];
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id,
            dataset_id: dataset_id.clone(),
            sequence,
            response,
        },
    );

    let columns = &state.dataset(&dataset_id).unwrap().columns;
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].id, "name");
}

#[test]
fn test_row_ids_are_stable_across_reloads() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    let first: Vec<String> = state
        .dataset(&dataset_id)
        .unwrap()
        .rows
        .iter()
        .map(|r| r.id.clone())
        .collect();

    let actions = dispatch(&mut state, Message::LoadData { tab_id: tab_id.clone() });
    let (_, _, sequence, _) = load_features(&actions);
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id,
            dataset_id: dataset_id.clone(),
            sequence,
            response: features_response(10, Some(25)),
        },
    );

    let second: Vec<String> = state
        .dataset(&dataset_id)
        .unwrap()
        .rows
        .iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(first, second);
    assert_eq!(first[0], "f0");
}

#[test]
fn test_rows_without_fid_get_positional_ids() {
    let (mut state, actions) = panel(&[("roads", "Roads")]);
    let (tab_id, dataset_id, sequence, _) = load_features(&actions);

    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id,
            dataset_id: dataset_id.clone(),
            sequence,
            response: FeaturesResponse {
                features: vec![test_feature(None, "a"), test_feature(None, "b")],
                total: Some(2),
                ..Default::default()
            },
        },
    );

    let rows = &state.dataset(&dataset_id).unwrap().rows;
    assert_eq!(rows[0].id, format!("{}_0_0", dataset_id));
    assert_eq!(rows[1].id, format!("{}_0_1", dataset_id));
}

#[test]
fn test_update_page_requests_one_based_page() {
    let (mut state, _, dataset_id) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::UpdatePage {
            dataset_id: dataset_id.clone(),
            page_index: 2,
        },
    );

    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.page, Some(3));
    assert_eq!(state.paging_data_for_selected_tab().unwrap().page_index, 2);
}

#[test]
fn test_change_page_size_clamps_and_resets_page() {
    let (mut state, _, dataset_id) = loaded_panel();
    state.dataset_mut(&dataset_id).unwrap().page_index = 2;

    let actions = dispatch(
        &mut state,
        Message::ChangePageSize {
            dataset_id: dataset_id.clone(),
            page_size: 1000,
        },
    );

    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.page, Some(1));
    assert_eq!(params.page_size, Some(100));
}

#[test]
fn test_update_sort_passes_sort_and_resets_page() {
    let (mut state, _, dataset_id) = loaded_panel();
    state.dataset_mut(&dataset_id).unwrap().page_index = 2;

    let actions = dispatch(
        &mut state,
        Message::UpdateSort {
            dataset_id: dataset_id.clone(),
            column: Some("name".to_string()),
            direction: SortDirection::Desc,
        },
    );

    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.sort_by.as_deref(), Some("name"));
    assert_eq!(params.sort_order, SortDirection::Desc);
    assert_eq!(params.page, Some(1));

    let sort = state.sort_for_selected_tab().unwrap();
    assert_eq!(sort.column.as_deref(), Some("name"));
}

#[test]
fn test_clearing_sort_drops_column() {
    let (mut state, _, dataset_id) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::UpdateSort {
            dataset_id,
            column: Some("name".to_string()),
            direction: SortDirection::None,
        },
    );

    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.sort_by, None);
    assert_eq!(params.sort_order, SortDirection::None);
}

// ─────────────────────────────────────────────────────────
// Columns
// ─────────────────────────────────────────────────────────

fn set_columns(state: &mut AppState, dataset_id: &str, ids: &[&str]) {
    state.dataset_mut(dataset_id).unwrap().columns = ids
        .iter()
        .map(|id| Column {
            id: id.to_string(),
            label: id.to_string(),
            attribute_type: if *id == "geom" {
                AttributeType::Geometry
            } else {
                AttributeType::String
            },
            visible: *id != "geom",
        })
        .collect();
}

fn column_ids(state: &AppState, dataset_id: &str) -> Vec<String> {
    state
        .dataset(dataset_id)
        .unwrap()
        .columns
        .iter()
        .map(|c| c.id.clone())
        .collect()
}

#[test]
fn test_toggle_column_visible() {
    let (mut state, _, dataset_id) = loaded_panel();

    dispatch(
        &mut state,
        Message::ToggleColumnVisible {
            dataset_id: dataset_id.clone(),
            column_id: "name".to_string(),
        },
    );
    assert!(!state.columns_for_selected_tab()[0].visible);

    let before = state.columns_for_selected_tab().to_vec();
    let actions = dispatch(
        &mut state,
        Message::ToggleColumnVisible {
            dataset_id,
            column_id: "missing".to_string(),
        },
    );
    assert!(actions.is_empty());
    assert_eq!(state.columns_for_selected_tab(), before.as_slice());
}

#[test]
fn test_set_columns_visibility_keeps_geometry_hidden() {
    let (mut state, _, dataset_id) = loaded_panel();
    set_columns(&mut state, &dataset_id, &["a", "geom", "b"]);

    dispatch(
        &mut state,
        Message::SetColumnsVisibility {
            dataset_id: dataset_id.clone(),
            visible: false,
        },
    );
    assert!(state.columns_for_selected_tab().iter().all(|c| !c.visible));

    dispatch(
        &mut state,
        Message::SetColumnsVisibility {
            dataset_id,
            visible: true,
        },
    );
    let visible: Vec<bool> = state
        .columns_for_selected_tab()
        .iter()
        .map(|c| c.visible)
        .collect();
    assert_eq!(visible, vec![true, false, true]);
}

#[test]
fn test_change_column_position() {
    let (mut state, _, dataset_id) = loaded_panel();
    set_columns(&mut state, &dataset_id, &["a", "b", "c"]);

    dispatch(
        &mut state,
        Message::ChangeColumnPosition {
            dataset_id: dataset_id.clone(),
            column_id: "a".to_string(),
            target_column_id: "c".to_string(),
        },
    );
    assert_eq!(column_ids(&state, &dataset_id), vec!["b", "c", "a"]);

    dispatch(
        &mut state,
        Message::ChangeColumnPosition {
            dataset_id: dataset_id.clone(),
            column_id: "a".to_string(),
            target_column_id: "b".to_string(),
        },
    );
    assert_eq!(column_ids(&state, &dataset_id), vec!["a", "b", "c"]);
}

#[test]
fn test_change_column_position_unknown_id_is_ignored() {
    let (mut state, _, dataset_id) = loaded_panel();
    set_columns(&mut state, &dataset_id, &["a", "b"]);

    dispatch(
        &mut state,
        Message::ChangeColumnPosition {
            dataset_id: dataset_id.clone(),
            column_id: "a".to_string(),
            target_column_id: "zzz".to_string(),
        },
    );

    assert_eq!(column_ids(&state, &dataset_id), vec!["a", "b"]);
}

// ─────────────────────────────────────────────────────────
// Selection / Highlight
// ─────────────────────────────────────────────────────────

#[test]
fn test_at_most_one_row_selected() {
    let (mut state, _, dataset_id) = loaded_panel();
    let steps = [("f1", true), ("f2", true), ("f5", true), ("f2", false), ("f5", false)];

    for (row_id, selected) in steps {
        dispatch(
            &mut state,
            Message::UpdateRowSelected {
                dataset_id: dataset_id.clone(),
                row_id: row_id.to_string(),
                selected,
            },
        );
        let count = state
            .dataset(&dataset_id)
            .unwrap()
            .rows
            .iter()
            .filter(|r| r.selected)
            .count();
        assert!(count <= 1, "{} rows selected after {}", count, row_id);
    }
    assert!(state.dataset(&dataset_id).unwrap().selected_row().is_none());
}

#[test]
fn test_duplicate_fids_select_one_row() {
    let (mut state, actions) = panel(&[("roads", "Roads")]);
    let (tab_id, dataset_id, sequence, _) = load_features(&actions);
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id,
            dataset_id: dataset_id.clone(),
            sequence,
            response: FeaturesResponse {
                features: vec![test_feature(Some("x"), "a"), test_feature(Some("x"), "b")],
                total: Some(2),
                ..Default::default()
            },
        },
    );

    dispatch(
        &mut state,
        Message::UpdateRowSelected {
            dataset_id: dataset_id.clone(),
            row_id: "x".to_string(),
            selected: true,
        },
    );

    let dataset = state.dataset(&dataset_id).unwrap();
    assert_eq!(dataset.rows.iter().filter(|r| r.selected).count(), 1);
    assert!(dataset.rows[0].selected);
}

#[test]
fn test_select_row_refetches_feature_by_fid() {
    let (mut state, tab_id, dataset_id) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::UpdateRowSelected {
            dataset_id: dataset_id.clone(),
            row_id: "f3".to_string(),
            selected: true,
        },
    );

    match actions.as_slice() {
        [UpdateAction::FetchHighlightFeature {
            tab_id: action_tab,
            row_id,
            params,
            ..
        }] => {
            assert_eq!(action_tab, &tab_id);
            assert_eq!(row_id, "f3");
            assert_eq!(params.fid.as_deref(), Some("f3"));
            assert_eq!(params.layer_id, "roads");
        }
        other => panic!("Expected FetchHighlightFeature, got {:?}", other),
    }
}

#[test]
fn test_highlight_applied_for_selected_row() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    dispatch(
        &mut state,
        Message::UpdateRowSelected {
            dataset_id: dataset_id.clone(),
            row_id: "f3".to_string(),
            selected: true,
        },
    );

    dispatch(
        &mut state,
        Message::HighlightFeatureLoaded {
            tab_id: tab_id.clone(),
            dataset_id,
            row_id: "f3".to_string(),
            feature: Some(test_feature(Some("f3"), "feature 3")),
        },
    );

    let highlighted = state.highlighted_feature.as_ref().unwrap();
    assert_eq!(highlighted.tab_id, tab_id);
    assert_eq!(highlighted.feature.fid.as_deref(), Some("f3"));
}

#[test]
fn test_highlight_dropped_when_selection_moved() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    for row_id in ["f3", "f4"] {
        dispatch(
            &mut state,
            Message::UpdateRowSelected {
                dataset_id: dataset_id.clone(),
                row_id: row_id.to_string(),
                selected: true,
            },
        );
    }

    dispatch(
        &mut state,
        Message::HighlightFeatureLoaded {
            tab_id,
            dataset_id,
            row_id: "f3".to_string(),
            feature: Some(test_feature(Some("f3"), "feature 3")),
        },
    );

    assert!(state.highlighted_feature.is_none());
}

#[test]
fn test_highlight_dropped_for_closed_tab() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    dispatch(&mut state, Message::VisibleLayersChanged { layers: vec![] });

    dispatch(
        &mut state,
        Message::HighlightFeatureLoaded {
            tab_id,
            dataset_id,
            row_id: "f3".to_string(),
            feature: Some(test_feature(Some("f3"), "feature 3")),
        },
    );

    assert!(state.highlighted_feature.is_none());
}

#[test]
fn test_deselect_clears_highlight() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    dispatch(
        &mut state,
        Message::UpdateRowSelected {
            dataset_id: dataset_id.clone(),
            row_id: "f3".to_string(),
            selected: true,
        },
    );
    dispatch(
        &mut state,
        Message::HighlightFeatureLoaded {
            tab_id,
            dataset_id: dataset_id.clone(),
            row_id: "f3".to_string(),
            feature: Some(test_feature(Some("f3"), "feature 3")),
        },
    );
    assert!(state.highlighted_feature.is_some());

    let actions = dispatch(
        &mut state,
        Message::UpdateRowSelected {
            dataset_id,
            row_id: "f3".to_string(),
            selected: false,
        },
    );

    assert!(actions.is_empty());
    assert!(state.highlighted_feature.is_none());
}

// ─────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────

#[test]
fn test_filter_change_reloads_selected_tab() {
    let (mut state, _, dataset_id) = loaded_panel();
    state.dataset_mut(&dataset_id).unwrap().page_index = 2;

    let actions = dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );

    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.filter.as_deref(), Some("(name = 'Main')"));
    assert_eq!(params.page, Some(1));
}

#[test]
fn test_unchanged_filter_does_not_reload() {
    let (mut state, _, _) = loaded_panel();
    dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );

    let actions = dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );

    assert!(actions.is_empty());
}

#[test]
fn test_filter_change_marks_background_tab_stale() {
    let (mut state, actions) = panel(&[("rivers", "Rivers"), ("roads", "Roads")]);
    let (rivers, dataset_id, sequence, _) = load_features(&actions);
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: rivers,
            dataset_id,
            sequence,
            response: features_response(1, Some(1)),
        },
    );
    let roads = state.tabs[1].id.clone();
    state.tab_mut(&roads).unwrap().initial_data_loaded = true;

    let actions = dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );

    assert!(actions.is_empty());
    assert!(!state.tab(&roads).unwrap().initial_data_loaded);

    let actions = dispatch(&mut state, Message::SelectTab { tab_id: roads });
    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.filter.as_deref(), Some("(name = 'Main')"));
}

/// Two tabs where `roads` has a load in flight and `rivers` is selected.
/// Returns the roads tab, its dataset and the in-flight sequence.
fn roads_in_flight_rivers_selected() -> (AppState, String, String, u64) {
    let (mut state, actions) = panel(&[("roads", "Roads"), ("rivers", "Rivers")]);
    let (roads, dataset_id, sequence, _) = load_features(&actions);
    let rivers = state.tabs[1].id.clone();
    dispatch(&mut state, Message::SelectTab { tab_id: rivers });
    (state, roads, dataset_id, sequence)
}

#[test]
fn test_filter_change_drops_background_load_in_flight() {
    let (mut state, roads, dataset_id, sequence) = roads_in_flight_rivers_selected();

    dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: roads.clone(),
            dataset_id: dataset_id.clone(),
            sequence,
            response: features_response(10, Some(25)),
        },
    );

    let tab = state.tab(&roads).unwrap();
    assert!(!tab.initial_data_loaded);
    assert!(!tab.loading_data);
    assert!(state.dataset(&dataset_id).unwrap().rows.is_empty());

    let actions = dispatch(&mut state, Message::SelectTab { tab_id: roads });
    let (_, _, reload_sequence, params) = load_features(&actions);
    assert!(reload_sequence > sequence);
    assert_eq!(params.filter.as_deref(), Some("(name = 'Main')"));
}

// ─────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────

fn capabilities_loaded(state: &mut AppState, tab_id: &str, exportable: bool) {
    dispatch(
        state,
        Message::ExportCapabilitiesLoaded {
            tab_id: tab_id.to_string(),
            cache_key: "app-roads".to_string(),
            capabilities: LayerExportCapabilities {
                exportable,
                output_formats: vec!["text/csv".to_string(), "SHAPE-ZIP".to_string()],
            },
        },
    );
}

#[test]
fn test_export_formats_fetched_once() {
    let (mut state, tab_id, _) = loaded_panel();

    let actions = dispatch(&mut state, Message::RequestExportFormats { tab_id: tab_id.clone() });
    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::FetchExportCapabilities { cache_key, .. }] if cache_key == "app-roads"
    ));

    // In flight
    let actions = dispatch(&mut state, Message::RequestExportFormats { tab_id: tab_id.clone() });
    assert!(actions.is_empty());

    capabilities_loaded(&mut state, &tab_id, true);
    assert_eq!(
        state.export_formats_for_selected_tab(),
        BTreeSet::from([ExportFormat::Csv, ExportFormat::Shape])
    );

    // Cached
    let actions = dispatch(&mut state, Message::RequestExportFormats { tab_id });
    assert!(actions.is_empty());
}

#[test]
fn test_non_exportable_layer_is_not_cached() {
    let (mut state, tab_id, _) = loaded_panel();
    dispatch(&mut state, Message::RequestExportFormats { tab_id: tab_id.clone() });
    capabilities_loaded(&mut state, &tab_id, false);

    assert!(state.export_formats_for_selected_tab().is_empty());

    let actions = dispatch(&mut state, Message::RequestExportFormats { tab_id });
    assert_eq!(actions.len(), 1);
}

#[test]
fn test_export_without_capabilities_notifies() {
    let (mut state, tab_id, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::Export {
            tab_id,
            format: ExportFormat::Csv,
        },
    );

    assert!(actions.is_empty());
    assert_eq!(state.notifications.len(), 1);
    assert_eq!(state.notifications[0].level, NotificationLevel::Error);
}

#[test]
fn test_export_unsupported_format_notifies() {
    let (mut state, tab_id, _) = loaded_panel();
    dispatch(&mut state, Message::RequestExportFormats { tab_id: tab_id.clone() });
    capabilities_loaded(&mut state, &tab_id, true);

    let actions = dispatch(
        &mut state,
        Message::Export {
            tab_id,
            format: ExportFormat::Dxf,
        },
    );

    assert!(actions.is_empty());
    assert!(state.notifications[0].is_error());
}

#[test]
fn test_export_resolves_output_format() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    dispatch(
        &mut state,
        Message::FiltersChanged {
            filters: roads_filter("Main"),
        },
    );
    dispatch(&mut state, Message::RequestExportFormats { tab_id: tab_id.clone() });
    capabilities_loaded(&mut state, &tab_id, true);
    set_columns(&mut state, &dataset_id, &["a", "geom", "b"]);

    let actions = dispatch(
        &mut state,
        Message::Export {
            tab_id,
            format: ExportFormat::Shape,
        },
    );

    match actions.as_slice() {
        [UpdateAction::ExportLayer {
            format,
            layer_name,
            params,
            ..
        }] => {
            assert_eq!(*format, ExportFormat::Shape);
            assert_eq!(layer_name, "Roads");
            assert_eq!(params.output_format, "SHAPE-ZIP");
            assert_eq!(params.filter.as_deref(), Some("(name = 'Main')"));
            assert_eq!(params.attributes, vec!["a", "b"]);
        }
        other => panic!("Expected ExportLayer, got {:?}", other),
    }
}

#[test]
fn test_export_completed_uses_backend_name() {
    let (mut state, tab_id, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::ExportCompleted {
            tab_id,
            format: ExportFormat::Csv,
            layer_name: "Roads".to_string(),
            export: Some(LayerExport {
                file: b"name\n".to_vec(),
                file_name: Some("roads.csv".to_string()),
            }),
        },
    );

    assert_eq!(
        actions,
        vec![UpdateAction::SaveFile {
            file_name: "roads.csv".to_string(),
            content: b"name\n".to_vec(),
        }]
    );
}

#[test]
fn test_export_completed_falls_back_to_generated_name() {
    let (mut state, tab_id, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::ExportCompleted {
            tab_id,
            format: ExportFormat::Geojson,
            layer_name: "Main Roads".to_string(),
            export: Some(LayerExport {
                file: Vec::new(),
                file_name: None,
            }),
        },
    );

    match actions.as_slice() {
        [UpdateAction::SaveFile { file_name, .. }] => {
            assert!(file_name.starts_with("Export_Main_Roads_"));
            assert!(file_name.ends_with(".geojson"));
        }
        other => panic!("Expected SaveFile, got {:?}", other),
    }
}

#[test]
fn test_export_failures_notify() {
    let (mut state, tab_id, _) = loaded_panel();

    dispatch(
        &mut state,
        Message::ExportCompleted {
            tab_id: tab_id.clone(),
            format: ExportFormat::Csv,
            layer_name: "Roads".to_string(),
            export: None,
        },
    );
    dispatch(
        &mut state,
        Message::ExportFailed {
            tab_id,
            error: "timeout".to_string(),
        },
    );
    dispatch(
        &mut state,
        Message::FileSaveFailed {
            error: "disk full".to_string(),
        },
    );

    assert_eq!(state.notifications.len(), 3);
    assert!(state.notifications.iter().all(|n| n.is_error()));
    assert!(state.notifications[1].message.contains("timeout"));
}

// ─────────────────────────────────────────────────────────
// Feature Details
// ─────────────────────────────────────────────────────────

fn details(feature_id: &str) -> FeatureDetailsModel {
    FeatureDetailsModel {
        feature_id: feature_id.to_string(),
        details: Vec::new(),
    }
}

#[test]
fn test_feature_details_load_is_idempotent() {
    let (mut state, _, _) = loaded_panel();
    let load = || Message::LoadFeatureDetails {
        feature_id: "f1".to_string(),
    };

    let actions = dispatch(&mut state, load());
    let cache_key = match actions.as_slice() {
        [UpdateAction::FetchFeatureDetails { cache_key, params, .. }] => {
            assert_eq!(params.feature_id, "f1");
            cache_key.clone()
        }
        other => panic!("Expected FetchFeatureDetails, got {:?}", other),
    };
    assert_eq!(cache_key, "app_roads");

    // Loading
    assert!(dispatch(&mut state, load()).is_empty());

    dispatch(
        &mut state,
        Message::FeatureDetailsLoaded {
            cache_key,
            feature_id: "f1".to_string(),
            details: Some(details("f1")),
        },
    );
    assert!(state.feature_details("f1").is_some());

    // Cached
    assert!(dispatch(&mut state, load()).is_empty());
}

#[test]
fn test_missing_details_can_be_retried() {
    let (mut state, _, _) = loaded_panel();
    let load = || Message::LoadFeatureDetails {
        feature_id: "f1".to_string(),
    };
    dispatch(&mut state, load());

    dispatch(
        &mut state,
        Message::FeatureDetailsLoaded {
            cache_key: "app_roads".to_string(),
            feature_id: "f1".to_string(),
            details: None,
        },
    );
    assert!(state.feature_details("f1").is_none());
    assert_eq!(dispatch(&mut state, load()).len(), 1);

    dispatch(
        &mut state,
        Message::FeatureDetailsFailed {
            cache_key: "app_roads".to_string(),
            feature_id: "f1".to_string(),
            error: "boom".to_string(),
        },
    );
    assert!(!state.details.is_loading("app_roads", "f1"));
}

#[test]
fn test_row_expansion_checked_once() {
    let (mut state, tab_id, _) = loaded_panel();
    // Issued by the initial load
    assert!(state.details.can_expand_pending.contains("app_roads"));
    assert!(dispatch(&mut state, Message::CheckRowExpansion { tab_id: tab_id.clone() }).is_empty());

    dispatch(
        &mut state,
        Message::RowExpansionResolved {
            cache_key: "app_roads".to_string(),
            can_expand: true,
        },
    );
    assert!(state.can_expand_rows());
    assert!(dispatch(&mut state, Message::CheckRowExpansion { tab_id }).is_empty());
}

#[test]
fn test_failed_expansion_check_is_retried() {
    let (mut state, tab_id, _) = loaded_panel();
    dispatch(
        &mut state,
        Message::RowExpansionFailed {
            cache_key: "app_roads".to_string(),
            error: "boom".to_string(),
        },
    );

    assert!(!state.can_expand_rows());
    assert_eq!(
        dispatch(&mut state, Message::CheckRowExpansion { tab_id }).len(),
        1
    );
}

// ─────────────────────────────────────────────────────────
// Unique Values
// ─────────────────────────────────────────────────────────

#[test]
fn test_unique_values_cached_per_attribute() {
    let (mut state, tab_id, _) = loaded_panel();
    let load = |attribute: &str| Message::LoadUniqueValues {
        tab_id: tab_id.clone(),
        attribute: attribute.to_string(),
    };

    let actions = dispatch(&mut state, load("name"));
    let key = match actions.as_slice() {
        [UpdateAction::FetchUniqueValues { key, params, .. }] => {
            assert_eq!(params.attribute, "name");
            key.clone()
        }
        other => panic!("Expected FetchUniqueValues, got {:?}", other),
    };
    assert!(dispatch(&mut state, load("name")).is_empty());

    dispatch(
        &mut state,
        Message::UniqueValuesLoaded {
            key: key.clone(),
            values: vec![json!("Main"), json!("High")],
        },
    );
    assert_eq!(state.unique_values(&key).map(|v| v.len()), Some(2));
    assert!(dispatch(&mut state, load("name")).is_empty());
    assert_eq!(dispatch(&mut state, load("kind")).len(), 1);
}

// ─────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────

#[test]
fn test_application_change_reloads_selected_tab() {
    let (mut state, tab_id, dataset_id) = loaded_panel();
    state.dataset_mut(&dataset_id).unwrap().page_index = 2;

    let actions = dispatch(
        &mut state,
        Message::ApplicationChanged {
            application_id: Some("other".to_string()),
        },
    );

    let (load_tab, _, _, params) = load_features(&actions);
    assert_eq!(load_tab, tab_id);
    assert_eq!(params.application_id, "other");
    assert_eq!(params.page, Some(1));
}

#[test]
fn test_application_change_drops_background_load_in_flight() {
    let (mut state, roads, dataset_id, sequence) = roads_in_flight_rivers_selected();

    dispatch(
        &mut state,
        Message::ApplicationChanged {
            application_id: Some("other".to_string()),
        },
    );
    dispatch(
        &mut state,
        Message::LoadDataSuccess {
            tab_id: roads.clone(),
            dataset_id: dataset_id.clone(),
            sequence,
            response: features_response(10, Some(25)),
        },
    );

    assert!(!state.tab(&roads).unwrap().initial_data_loaded);
    assert_eq!(state.dataset(&dataset_id).unwrap().total_count, None);

    let actions = dispatch(&mut state, Message::SelectTab { tab_id: roads });
    let (_, _, _, params) = load_features(&actions);
    assert_eq!(params.application_id, "other");
}

#[test]
fn test_same_application_is_ignored() {
    let (mut state, _, _) = loaded_panel();

    let actions = dispatch(
        &mut state,
        Message::ApplicationChanged {
            application_id: Some("app".to_string()),
        },
    );

    assert!(actions.is_empty());
}

#[test]
fn test_layers_hiding_attribute_list_get_no_tab() {
    let mut layer = AppLayer::new("roads", "Roads");
    layer
        .hidden_functionality
        .push(attrlist_core::ATTRIBUTE_LIST_FUNCTIONALITY.to_string());
    let mut state = AppState::new();
    state.panel_visible = true;

    dispatch(&mut state, Message::VisibleLayersChanged { layers: vec![layer] });

    assert!(state.tabs.is_empty());
}
