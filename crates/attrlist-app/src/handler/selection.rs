//! Row selection and the map highlight bridge

use attrlist_core::{FeatureModel, GetFeaturesParams, HighlightedFeature};

use crate::message::Message;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Select or deselect a row. At most one row per dataset stays selected.
///
/// Selection re-fetches the row's feature by fid so the highlight reflects
/// the backend rather than the rendered page.
pub fn handle_row_selected(
    state: &mut AppState,
    dataset_id: &str,
    row_id: &str,
    selected: bool,
) -> UpdateResult {
    let Some(dataset) = state.dataset_mut(dataset_id) else {
        return UpdateResult::none();
    };
    let Some(fid) = dataset
        .rows
        .iter()
        .find(|r| r.id == row_id)
        .map(|r| r.fid.clone())
    else {
        return UpdateResult::none();
    };

    if selected {
        dataset.select_row(Some(row_id));
    } else if dataset.selected_row_id.as_deref() == Some(row_id) {
        dataset.select_row(None);
    } else {
        return UpdateResult::none();
    }
    let tab_id = dataset.tab_id.clone();
    state.highlighted_feature = None;

    if !selected {
        return UpdateResult::message(Message::SetHighlightedFeature { feature: None });
    }

    let Some(fid) = fid else {
        tracing::debug!("Row {} has no fid, nothing to highlight", row_id);
        return UpdateResult::none();
    };
    let Some(context) = state.load_context(&tab_id) else {
        return UpdateResult::none();
    };

    UpdateResult::action(UpdateAction::FetchHighlightFeature {
        tab_id,
        dataset_id: dataset_id.to_string(),
        row_id: row_id.to_string(),
        source_id: context.source_id,
        params: GetFeaturesParams {
            application_id: context.application_id,
            layer_id: context.layer_id,
            fid: Some(fid),
            ..Default::default()
        },
    })
}

/// Publish a re-fetched feature unless the selection moved on meanwhile
pub fn handle_highlight_loaded(
    state: &mut AppState,
    tab_id: String,
    dataset_id: &str,
    row_id: &str,
    feature: Option<FeatureModel>,
) -> UpdateResult {
    if state.tab(&tab_id).is_none() {
        tracing::debug!("Dropping highlight for closed tab {}", tab_id);
        return UpdateResult::none();
    }
    let still_selected = state
        .dataset(dataset_id)
        .is_some_and(|d| d.selected_row_id.as_deref() == Some(row_id));
    if !still_selected {
        return UpdateResult::none();
    }

    UpdateResult::message(Message::SetHighlightedFeature {
        feature: feature.map(|feature| HighlightedFeature { tab_id, feature }),
    })
}
