//! Export capability negotiation and export handlers

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Local;

use attrlist_core::{
    fallback_file_name, resolve_output_format, supported_formats, ExportFormat,
    GetLayerExportCapabilitiesParams, GetLayerExportParams, LayerExport, LayerExportCapabilities,
    SortDirection,
};

use crate::notification::{
    Notification, EXPORT_EMPTY, EXPORT_FAILED, EXPORT_FORMAT_UNAVAILABLE, EXPORT_SAVED,
    FILE_SAVE_FAILED,
};
use crate::state::{export_cache_key, AppState};

use super::{UpdateAction, UpdateResult};

/// Resolve the export formats of a tab, fetching capabilities at most once
/// per `(application, layer)`.
pub fn handle_request_formats(state: &mut AppState, tab_id: &str) -> UpdateResult {
    let Some(context) = state.load_context(tab_id) else {
        return UpdateResult::none();
    };
    let cache_key = export_cache_key(&context.application_id, &context.layer_id);

    if let Some(formats) = state.export.cached_formats(&cache_key) {
        state
            .export
            .formats_by_tab
            .insert(tab_id.to_string(), formats);
        return UpdateResult::none();
    }
    if !state.export.pending.insert(cache_key.clone()) {
        return UpdateResult::none();
    }

    UpdateResult::action(UpdateAction::FetchExportCapabilities {
        tab_id: tab_id.to_string(),
        source_id: context.source_id,
        cache_key,
        params: GetLayerExportCapabilitiesParams {
            application_id: context.application_id,
            layer_id: context.layer_id,
        },
    })
}

/// Only exportable responses are cached; a non-exportable layer is asked
/// again next time.
pub fn handle_capabilities_loaded(
    state: &mut AppState,
    tab_id: &str,
    cache_key: String,
    capabilities: LayerExportCapabilities,
) -> UpdateResult {
    state.export.pending.remove(&cache_key);

    let formats = if capabilities.exportable {
        let formats = supported_formats(capabilities.output_formats.as_slice());
        state
            .export
            .capabilities
            .insert(cache_key, capabilities.output_formats);
        formats
    } else {
        BTreeSet::new()
    };

    if state.tab(tab_id).is_some() {
        state
            .export
            .formats_by_tab
            .insert(tab_id.to_string(), formats);
    }
    UpdateResult::none()
}

pub fn handle_capabilities_failed(
    state: &mut AppState,
    tab_id: &str,
    cache_key: &str,
    error: &str,
) -> UpdateResult {
    tracing::warn!("Export capabilities for {} failed: {}", cache_key, error);
    state.export.pending.remove(cache_key);
    if state.tab(tab_id).is_some() {
        state
            .export
            .formats_by_tab
            .insert(tab_id.to_string(), BTreeSet::new());
    }
    UpdateResult::none()
}

/// Export the tab's layer with its current filter, sort and visible columns
pub fn handle_export(state: &mut AppState, tab_id: &str, format: ExportFormat) -> UpdateResult {
    let Some(context) = state.load_context(tab_id) else {
        state.notify(Notification::error(EXPORT_FAILED));
        return UpdateResult::none();
    };
    let cache_key = export_cache_key(&context.application_id, &context.layer_id);

    let output_format = state
        .export
        .capabilities
        .get(&cache_key)
        .and_then(|declared| resolve_output_format(declared.as_slice(), format));
    let Some(output_format) = output_format else {
        tracing::warn!("No declared output format for {} on {}", format, cache_key);
        state.notify(Notification::error(EXPORT_FORMAT_UNAVAILABLE));
        return UpdateResult::none();
    };

    let (Some(tab), Some(dataset)) = (state.tab(tab_id), state.dataset(&context.dataset_id)) else {
        state.notify(Notification::error(EXPORT_FAILED));
        return UpdateResult::none();
    };
    let sort_by = dataset
        .sorted_column
        .clone()
        .filter(|_| dataset.sort_direction != SortDirection::None);

    let params = GetLayerExportParams {
        filter: state.filters.cql_for_layer(&context.layer_id),
        sort_by,
        sort_order: dataset.sort_direction,
        attributes: dataset.visible_column_ids(),
        application_id: context.application_id,
        layer_id: context.layer_id,
        output_format,
    };
    tracing::info!("Exporting {} as {}", tab.label, format);

    UpdateResult::action(UpdateAction::ExportLayer {
        tab_id: tab_id.to_string(),
        source_id: context.source_id,
        format,
        layer_name: tab.label.clone(),
        params,
    })
}

pub fn handle_export_completed(
    state: &mut AppState,
    tab_id: &str,
    format: ExportFormat,
    layer_name: &str,
    export: Option<LayerExport>,
) -> UpdateResult {
    let Some(export) = export else {
        tracing::warn!("Export of {} for tab {} returned no file", format, tab_id);
        state.notify(Notification::error(EXPORT_EMPTY));
        return UpdateResult::none();
    };

    let file_name = export
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| fallback_file_name(layer_name, format, &Local::now()));

    UpdateResult::action(UpdateAction::SaveFile {
        file_name,
        content: export.file,
    })
}

pub fn handle_export_failed(state: &mut AppState, tab_id: &str, error: &str) -> UpdateResult {
    tracing::error!("Export for tab {} failed: {}", tab_id, error);
    state.notify(Notification::error(format!("{}: {}", EXPORT_FAILED, error)));
    UpdateResult::none()
}

pub fn handle_file_saved(state: &mut AppState, path: &Path) -> UpdateResult {
    tracing::info!("Saved export to {}", path.display());
    state.notify(Notification::info(format!(
        "{}: {}",
        EXPORT_SAVED,
        path.display()
    )));
    UpdateResult::none()
}

pub fn handle_file_save_failed(state: &mut AppState, error: &str) -> UpdateResult {
    tracing::error!("Saving export failed: {}", error);
    state.notify(Notification::error(format!("{}: {}", FILE_SAVE_FAILED, error)));
    UpdateResult::none()
}
