//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Every loader call runs in its own tokio task and reports back with a
//! message. Loader errors become failure messages here, so nothing from the
//! transport reaches the reducers as an error value.

use std::sync::Arc;

use tokio::sync::mpsc;

use attrlist_sources::SourceRegistry;

use crate::file_saver::FileSaver;
use crate::handler::UpdateAction;
use crate::message::Message;

pub(crate) mod details;
pub(crate) mod export;
pub(crate) mod load;

/// Collaborators actions need, cloned into each spawned task
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub msg_tx: mpsc::Sender<Message>,
    pub registry: SourceRegistry,
    pub file_saver: Arc<dyn FileSaver>,
}

/// Execute an action by spawning a background task
pub fn handle_action(action: UpdateAction, ctx: &ActionContext) {
    match action {
        UpdateAction::LoadFeatures {
            tab_id,
            dataset_id,
            source_id,
            sequence,
            params,
        } => load::spawn_load_features(ctx, tab_id, dataset_id, source_id, sequence, params),

        UpdateAction::FetchHighlightFeature {
            tab_id,
            dataset_id,
            row_id,
            source_id,
            params,
        } => load::spawn_fetch_highlight(ctx, tab_id, dataset_id, row_id, source_id, params),

        UpdateAction::FetchExportCapabilities {
            tab_id,
            source_id,
            cache_key,
            params,
        } => export::spawn_fetch_capabilities(ctx, tab_id, source_id, cache_key, params),

        UpdateAction::ExportLayer {
            tab_id,
            source_id,
            format,
            layer_name,
            params,
        } => export::spawn_export(ctx, tab_id, source_id, format, layer_name, params),

        UpdateAction::SaveFile { file_name, content } => {
            export::spawn_save_file(ctx, file_name, content)
        }

        UpdateAction::CheckRowExpansion {
            source_id,
            cache_key,
            params,
        } => details::spawn_check_row_expansion(ctx, source_id, cache_key, params),

        UpdateAction::FetchFeatureDetails {
            source_id,
            cache_key,
            params,
        } => details::spawn_fetch_details(ctx, source_id, cache_key, params),

        UpdateAction::FetchUniqueValues {
            source_id,
            key,
            params,
        } => details::spawn_fetch_unique_values(ctx, source_id, key, params),
    }
}

/// Send a result message, logging if the engine has stopped listening
pub(crate) async fn report(msg_tx: &mpsc::Sender<Message>, message: Message) {
    if msg_tx.send(message).await.is_err() {
        tracing::debug!("Engine stopped before a loader result arrived");
    }
}
