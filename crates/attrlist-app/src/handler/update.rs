//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{data, details, export, filters, selection, tabs, UpdateResult};

/// Process a message and update state
/// Returns an optional follow-up message and an optional action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // External Inputs
        // ─────────────────────────────────────────────────────────
        Message::VisibleLayersChanged { layers } => tabs::handle_visible_layers(state, layers),

        Message::SourceTabsChanged { source_id, tabs } => {
            tabs::handle_source_tabs(state, source_id, tabs)
        }

        Message::PanelVisibilityChanged { visible } => {
            tabs::handle_panel_visibility(state, visible)
        }

        Message::ApplicationChanged { application_id } => {
            tabs::handle_application_changed(state, application_id)
        }

        Message::FiltersChanged { filters } => filters::handle_filters_changed(state, filters),

        // ─────────────────────────────────────────────────────────
        // Tabs
        // ─────────────────────────────────────────────────────────
        Message::ChangeTabs {
            new_tabs,
            new_data,
            closed_tabs,
        } => tabs::handle_change_tabs(state, new_tabs, new_data, closed_tabs),

        Message::SelectTab { tab_id } => tabs::handle_select_tab(state, &tab_id),

        // ─────────────────────────────────────────────────────────
        // Data Loading
        // ─────────────────────────────────────────────────────────
        Message::LoadData { tab_id } => data::handle_load_data(state, &tab_id),

        Message::LoadDataSuccess {
            tab_id,
            dataset_id,
            sequence,
            response,
        } => data::handle_load_success(state, &tab_id, &dataset_id, sequence, response),

        Message::LoadDataFailed {
            tab_id,
            dataset_id,
            sequence,
            error,
        } => data::handle_load_failed(state, &tab_id, dataset_id.as_deref(), sequence, error),

        Message::UpdatePage {
            dataset_id,
            page_index,
        } => data::handle_update_page(state, &dataset_id, page_index),

        Message::ChangePageSize {
            dataset_id,
            page_size,
        } => data::handle_change_page_size(state, &dataset_id, page_size),

        Message::UpdateSort {
            dataset_id,
            column,
            direction,
        } => data::handle_update_sort(state, &dataset_id, column, direction),

        Message::UpdateRowSelected {
            dataset_id,
            row_id,
            selected,
        } => selection::handle_row_selected(state, &dataset_id, &row_id, selected),

        // ─────────────────────────────────────────────────────────
        // Columns
        // ─────────────────────────────────────────────────────────
        Message::ToggleColumnVisible {
            dataset_id,
            column_id,
        } => data::handle_toggle_column(state, &dataset_id, &column_id),

        Message::SetColumnsVisibility {
            dataset_id,
            visible,
        } => data::handle_set_columns_visibility(state, &dataset_id, visible),

        Message::ChangeColumnPosition {
            dataset_id,
            column_id,
            target_column_id,
        } => data::handle_change_column_position(state, &dataset_id, &column_id, &target_column_id),

        // ─────────────────────────────────────────────────────────
        // Highlight
        // ─────────────────────────────────────────────────────────
        Message::HighlightFeatureLoaded {
            tab_id,
            dataset_id,
            row_id,
            feature,
        } => selection::handle_highlight_loaded(state, tab_id, &dataset_id, &row_id, feature),

        Message::HighlightFeatureFailed { tab_id, error } => {
            tracing::warn!("Highlight fetch for tab {} failed: {}", tab_id, error);
            UpdateResult::none()
        }

        Message::SetHighlightedFeature { feature } => {
            state.highlighted_feature = feature;
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Export
        // ─────────────────────────────────────────────────────────
        Message::RequestExportFormats { tab_id } => export::handle_request_formats(state, &tab_id),

        Message::ExportCapabilitiesLoaded {
            tab_id,
            cache_key,
            capabilities,
        } => export::handle_capabilities_loaded(state, &tab_id, cache_key, capabilities),

        Message::ExportCapabilitiesFailed {
            tab_id,
            cache_key,
            error,
        } => export::handle_capabilities_failed(state, &tab_id, &cache_key, &error),

        Message::Export { tab_id, format } => export::handle_export(state, &tab_id, format),

        Message::ExportCompleted {
            tab_id,
            format,
            layer_name,
            export,
        } => export::handle_export_completed(state, &tab_id, format, &layer_name, export),

        Message::ExportFailed { tab_id, error } => {
            export::handle_export_failed(state, &tab_id, &error)
        }

        Message::FileSaved { path } => export::handle_file_saved(state, &path),

        Message::FileSaveFailed { error } => export::handle_file_save_failed(state, &error),

        // ─────────────────────────────────────────────────────────
        // Feature Details
        // ─────────────────────────────────────────────────────────
        Message::CheckRowExpansion { tab_id } => details::handle_check_row_expansion(state, &tab_id),

        Message::RowExpansionResolved {
            cache_key,
            can_expand,
        } => details::handle_row_expansion_resolved(state, cache_key, can_expand),

        Message::RowExpansionFailed { cache_key, error } => {
            details::handle_row_expansion_failed(state, &cache_key, &error)
        }

        Message::LoadFeatureDetails { feature_id } => {
            details::handle_load_feature_details(state, &feature_id)
        }

        Message::FeatureDetailsLoaded {
            cache_key,
            feature_id,
            details,
        } => details::handle_feature_details_loaded(state, &cache_key, &feature_id, details),

        Message::FeatureDetailsFailed {
            cache_key,
            feature_id,
            error,
        } => details::handle_feature_details_failed(state, &cache_key, &feature_id, &error),

        // ─────────────────────────────────────────────────────────
        // Unique Values
        // ─────────────────────────────────────────────────────────
        Message::LoadUniqueValues { tab_id, attribute } => {
            details::handle_load_unique_values(state, &tab_id, attribute)
        }

        Message::UniqueValuesLoaded { key, values } => {
            state.unique_values_pending.remove(&key);
            state.unique_values.insert(key, values);
            UpdateResult::none()
        }

        Message::UniqueValuesFailed { key, error } => {
            tracing::warn!(
                "Unique values for {}.{} failed: {}",
                key.layer_id,
                key.attribute,
                error
            );
            state.unique_values_pending.remove(&key);
            UpdateResult::none()
        }
    }
}
