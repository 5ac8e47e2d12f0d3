//! Feature loads: dataset pages and highlight re-fetches

use attrlist_core::GetFeaturesParams;

use crate::message::Message;

use super::{report, ActionContext};

pub(super) fn spawn_load_features(
    ctx: &ActionContext,
    tab_id: String,
    dataset_id: String,
    source_id: String,
    sequence: u64,
    params: GetFeaturesParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        tracing::debug!(
            "Loading page {:?} of {} from source '{}'",
            params.page,
            params.layer_id,
            source_id
        );
        let message = match registry.get_features(&source_id, params).await {
            Ok(response) => Message::LoadDataSuccess {
                tab_id,
                dataset_id,
                sequence,
                response,
            },
            Err(e) => {
                tracing::warn!("get_features on '{}' failed: {}", source_id, e);
                Message::LoadDataFailed {
                    tab_id,
                    dataset_id: Some(dataset_id),
                    sequence: Some(sequence),
                    error: Some(e.user_message()),
                }
            }
        };
        report(&msg_tx, message).await;
    });
}

pub(super) fn spawn_fetch_highlight(
    ctx: &ActionContext,
    tab_id: String,
    dataset_id: String,
    row_id: String,
    source_id: String,
    params: GetFeaturesParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let fid = params.fid.clone();
        let message = match registry.get_features(&source_id, params).await {
            Ok(response) => {
                let feature = response
                    .features
                    .into_iter()
                    .find(|f| f.fid.is_some() && f.fid == fid);
                Message::HighlightFeatureLoaded {
                    tab_id,
                    dataset_id,
                    row_id,
                    feature,
                }
            }
            Err(e) => Message::HighlightFeatureFailed {
                tab_id,
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}
