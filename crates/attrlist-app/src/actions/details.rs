//! Row expansion, feature detail and unique value fetches

use attrlist_core::{CanExpandRowParams, GetFeatureDetailsParams, GetUniqueValuesParams};

use crate::message::Message;
use crate::state::UniqueValuesKey;

use super::{report, ActionContext};

pub(super) fn spawn_check_row_expansion(
    ctx: &ActionContext,
    source_id: String,
    cache_key: String,
    params: CanExpandRowParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let message = match registry.can_expand_row(&source_id, params).await {
            Ok(can_expand) => Message::RowExpansionResolved {
                cache_key,
                can_expand,
            },
            Err(e) => Message::RowExpansionFailed {
                cache_key,
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}

pub(super) fn spawn_fetch_details(
    ctx: &ActionContext,
    source_id: String,
    cache_key: String,
    params: GetFeatureDetailsParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let feature_id = params.feature_id.clone();
        let message = match registry.get_feature_details(&source_id, params).await {
            Ok(details) => Message::FeatureDetailsLoaded {
                cache_key,
                feature_id,
                details,
            },
            Err(e) => Message::FeatureDetailsFailed {
                cache_key,
                feature_id,
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}

pub(super) fn spawn_fetch_unique_values(
    ctx: &ActionContext,
    source_id: String,
    key: UniqueValuesKey,
    params: GetUniqueValuesParams,
) {
    let registry = ctx.registry.clone();
    let msg_tx = ctx.msg_tx.clone();

    tokio::spawn(async move {
        let message = match registry.get_unique_values(&source_id, params).await {
            Ok(values) => Message::UniqueValuesLoaded { key, values },
            Err(e) => Message::UniqueValuesFailed {
                key,
                error: e.to_string(),
            },
        };
        report(&msg_tx, message).await;
    });
}
