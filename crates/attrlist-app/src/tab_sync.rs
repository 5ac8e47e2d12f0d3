//! Tab synchronization: reconciles open tabs with source descriptors
//!
//! The default source contributes one descriptor per visible layer that
//! does not hide the attribute list. Every other source publishes its own
//! descriptors. [`reconcile`] diffs those against the open tabs and emits a
//! single [`Message::ChangeTabs`] when anything differs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use attrlist_core::{Dataset, Tab, TabDescriptor};
use attrlist_sources::DEFAULT_SOURCE_ID;

use crate::message::Message;
use crate::state::AppState;

static TAB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
static DATASET_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique tab ID
pub fn next_tab_id() -> String {
    format!("tab-{}", TAB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Generate a new unique dataset ID
pub fn next_dataset_id() -> String {
    format!("dataset-{}", DATASET_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Descriptors each source currently wants open, default source first
pub fn source_descriptors(state: &AppState) -> Vec<(String, Vec<TabDescriptor>)> {
    let mut sources = vec![(
        DEFAULT_SOURCE_ID.to_string(),
        TabDescriptor::from_layers(&state.visible_layers),
    )];
    sources.extend(
        state
            .source_tabs
            .iter()
            .filter(|(id, _)| id.as_str() != DEFAULT_SOURCE_ID)
            .map(|(id, tabs)| (id.clone(), tabs.clone())),
    );
    sources
}

/// Compute the tab changes needed to match the source descriptors.
///
/// Returns `None` while the panel is hidden or when nothing changed.
pub fn reconcile(state: &AppState) -> Option<Message> {
    if !state.panel_visible {
        return None;
    }

    let sources = source_descriptors(state);
    let wanted: HashSet<(&str, &str)> = sources
        .iter()
        .flat_map(|(source_id, tabs)| {
            tabs.iter()
                .map(move |t| (source_id.as_str(), t.layer_id.as_str()))
        })
        .collect();

    let closed_tabs: Vec<String> = state
        .tabs
        .iter()
        .filter(|tab| match tab.layer_id.as_deref() {
            Some(layer_id) => !wanted.contains(&(tab.tab_source_id.as_str(), layer_id)),
            None => true,
        })
        .map(|tab| tab.id.clone())
        .collect();

    let open: HashSet<(&str, &str)> = state
        .tabs
        .iter()
        .filter_map(|tab| {
            tab.layer_id
                .as_deref()
                .map(|layer_id| (tab.tab_source_id.as_str(), layer_id))
        })
        .collect();

    let page_size = state.settings.data.effective_page_size();
    let mut new_tabs = Vec::new();
    let mut new_data = Vec::new();
    let mut seen = HashSet::new();

    for (source_id, descriptors) in &sources {
        for descriptor in descriptors {
            let key = (source_id.as_str(), descriptor.layer_id.as_str());
            if open.contains(&key) || !seen.insert(key) {
                continue;
            }

            let tab_id = next_tab_id();
            let dataset_id = next_dataset_id();
            new_data.push(Dataset::new(dataset_id.clone(), tab_id.clone(), page_size));
            new_tabs.push(Tab::new(
                tab_id,
                descriptor.label.clone(),
                source_id.clone(),
                Some(descriptor.layer_id.clone()),
                dataset_id,
            ));
        }
    }

    if new_tabs.is_empty() && closed_tabs.is_empty() {
        return None;
    }

    tracing::debug!(
        "Tab sync: {} new, {} closed",
        new_tabs.len(),
        closed_tabs.len()
    );

    Some(Message::ChangeTabs {
        new_tabs,
        new_data,
        closed_tabs,
    })
}
