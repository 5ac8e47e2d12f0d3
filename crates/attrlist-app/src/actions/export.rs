//! Export capability fetches, layer exports and file saving

use attrlist_core::{ExportFormat, GetLayerExportCapabilitiesParams, GetLayerExportParams};

use crate::message::Message;

use super::{report, ActionContext};

pub(super) fn spawn_fetch_capabilities(
    ctx: &ActionContext,
    tab_id: String,
    source_id: String,
    cache_key: String,
    params: GetLayerExportCapabilitiesParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let message = match registry
            .get_layer_export_capabilities(&source_id, params)
            .await
        {
            Ok(capabilities) => Message::ExportCapabilitiesLoaded {
                tab_id,
                cache_key,
                capabilities,
            },
            Err(e) => Message::ExportCapabilitiesFailed {
                tab_id,
                cache_key,
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}

pub(super) fn spawn_export(
    ctx: &ActionContext,
    tab_id: String,
    source_id: String,
    format: ExportFormat,
    layer_name: String,
    params: GetLayerExportParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let message = match registry.get_layer_export(&source_id, params).await {
            Ok(export) => Message::ExportCompleted {
                tab_id,
                format,
                layer_name,
                export,
            },
            Err(e) => Message::ExportFailed {
                tab_id,
                error: e.user_message(),
            },
        };
        report(&msg_tx, message).await;
    });
}

pub(super) fn spawn_save_file(ctx: &ActionContext, file_name: String, content: Vec<u8>) {
    let saver = ctx.file_saver.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let saved =
            tokio::task::spawn_blocking(move || saver.save(&file_name, &content)).await;
        let message = match saved {
            Ok(Ok(path)) => Message::FileSaved { path },
            Ok(Err(e)) => Message::FileSaveFailed {
                error: e.to_string(),
            },
            Err(e) => Message::FileSaveFailed {
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}
