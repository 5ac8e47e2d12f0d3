//! Row expansion, feature details and unique value handlers

use attrlist_core::{
    CanExpandRowParams, FeatureDetailsModel, GetFeatureDetailsParams, GetUniqueValuesParams,
};

use crate::state::{details_cache_key, AppState, UniqueValuesKey};

use super::{UpdateAction, UpdateResult};

/// Resolve `can_expand_row` once per `(application, layer)`
pub fn handle_check_row_expansion(state: &mut AppState, tab_id: &str) -> UpdateResult {
    let Some(context) = state.load_context(tab_id) else {
        return UpdateResult::none();
    };
    let cache_key = details_cache_key(&context.application_id, &context.layer_id);
    if state.details.can_expand.contains_key(&cache_key)
        || !state.details.can_expand_pending.insert(cache_key.clone())
    {
        return UpdateResult::none();
    }

    UpdateResult::action(UpdateAction::CheckRowExpansion {
        source_id: context.source_id,
        cache_key,
        params: CanExpandRowParams {
            application_id: context.application_id,
            layer_id: context.layer_id,
        },
    })
}

pub fn handle_row_expansion_resolved(
    state: &mut AppState,
    cache_key: String,
    can_expand: bool,
) -> UpdateResult {
    state.details.can_expand_pending.remove(&cache_key);
    state.details.can_expand.insert(cache_key, can_expand);
    UpdateResult::none()
}

/// A failed check is not cached, so the next load asks again.
pub fn handle_row_expansion_failed(state: &mut AppState, cache_key: &str, error: &str) -> UpdateResult {
    tracing::warn!("Row expansion check for {} failed: {}", cache_key, error);
    state.details.can_expand_pending.remove(cache_key);
    UpdateResult::none()
}

/// Load details for a feature of the selected tab. A feature already
/// cached or in flight is not fetched again.
pub fn handle_load_feature_details(state: &mut AppState, feature_id: &str) -> UpdateResult {
    let Some(context) = state
        .selected_tab_id
        .as_deref()
        .and_then(|tab_id| state.load_context(tab_id))
    else {
        return UpdateResult::none();
    };
    let cache_key = details_cache_key(&context.application_id, &context.layer_id);

    if state.details.get(&cache_key, feature_id).is_some()
        || state.details.is_loading(&cache_key, feature_id)
    {
        return UpdateResult::none();
    }
    state.details.set_loading(&cache_key, feature_id, true);

    UpdateResult::action(UpdateAction::FetchFeatureDetails {
        source_id: context.source_id,
        cache_key,
        params: GetFeatureDetailsParams {
            application_id: context.application_id,
            layer_id: context.layer_id,
            feature_id: feature_id.to_string(),
        },
    })
}

/// A `None` result leaves the feature uncached so a later expand retries.
pub fn handle_feature_details_loaded(
    state: &mut AppState,
    cache_key: &str,
    feature_id: &str,
    details: Option<FeatureDetailsModel>,
) -> UpdateResult {
    state.details.set_loading(cache_key, feature_id, false);
    if let Some(mut details) = details {
        details.feature_id = feature_id.to_string();
        state.details.insert(cache_key, details);
    }
    UpdateResult::none()
}

pub fn handle_feature_details_failed(
    state: &mut AppState,
    cache_key: &str,
    feature_id: &str,
    error: &str,
) -> UpdateResult {
    tracing::warn!("Details for {} in {} failed: {}", feature_id, cache_key, error);
    state.details.set_loading(cache_key, feature_id, false);
    UpdateResult::none()
}

pub fn handle_load_unique_values(
    state: &mut AppState,
    tab_id: &str,
    attribute: String,
) -> UpdateResult {
    let Some(context) = state.load_context(tab_id) else {
        return UpdateResult::none();
    };
    let key = UniqueValuesKey {
        application_id: context.application_id.clone(),
        layer_id: context.layer_id.clone(),
        attribute: attribute.clone(),
    };
    if state.unique_values.contains_key(&key) || !state.unique_values_pending.insert(key.clone()) {
        return UpdateResult::none();
    }

    UpdateResult::action(UpdateAction::FetchUniqueValues {
        source_id: context.source_id,
        key,
        params: GetUniqueValuesParams {
            application_id: context.application_id,
            layer_id: context.layer_id,
            attribute,
            filter: None,
        },
    })
}
