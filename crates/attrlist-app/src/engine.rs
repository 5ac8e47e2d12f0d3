//! Engine - orchestration for one attribute list panel session
//!
//! The Engine owns the state, the message channel, the source registry and
//! the side-effect collaborators. Host inputs arrive on `watch` channels and
//! are forwarded as messages; filter and layer changes go through per-key
//! debouncers first.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use attrlist_core::prelude::*;
use attrlist_core::{AppLayer, Column, ExportFormat, FilterState, HighlightedFeature, TabDescriptor};
use attrlist_sources::{Source, SourceRegistry, DEFAULT_SOURCE_ID};

use crate::actions::ActionContext;
use crate::config::Settings;
use crate::debounce::{DebounceKey, Debouncer};
use crate::engine_event::EngineEvent;
use crate::file_saver::{DirectoryFileSaver, FileSaver};
use crate::message::Message;
use crate::process;
use crate::state::AppState;

/// Host-provided input streams
#[derive(Debug, Clone)]
pub struct EngineInputs {
    pub visible_layers: watch::Receiver<Vec<AppLayer>>,
    pub panel_visible: watch::Receiver<bool>,
    pub application_id: watch::Receiver<Option<String>>,
    pub filters: watch::Receiver<FilterState>,
}

/// Per-tab view used for change detection
#[derive(Debug, Clone, PartialEq)]
struct TabSnapshot {
    id: String,
    label: String,
    loading_data: bool,
    loading_error: Option<String>,
    dataset_id: String,
    page_index: u32,
    row_count: usize,
    total_count: Option<u64>,
    columns: Vec<Column>,
}

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    tabs: Vec<TabSnapshot>,
    selected_tab_id: Option<String>,
    highlighted_feature: Option<HighlightedFeature>,
    export_formats: HashMap<String, BTreeSet<ExportFormat>>,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        let tabs = state
            .tabs
            .iter()
            .map(|tab| {
                let dataset = state.dataset(&tab.selected_dataset_id);
                TabSnapshot {
                    id: tab.id.clone(),
                    label: tab.label.clone(),
                    loading_data: tab.loading_data,
                    loading_error: tab.loading_error.clone(),
                    dataset_id: tab.selected_dataset_id.clone(),
                    page_index: dataset.map(|d| d.page_index).unwrap_or(0),
                    row_count: dataset.map(|d| d.rows.len()).unwrap_or(0),
                    total_count: dataset.and_then(|d| d.total_count),
                    columns: dataset.map(|d| d.columns.clone()).unwrap_or_default(),
                }
            })
            .collect();

        Self {
            tabs,
            selected_tab_id: state.selected_tab_id.clone(),
            highlighted_feature: state.highlighted_feature.clone(),
            export_formats: state.export.formats_by_tab.clone(),
        }
    }

    fn tab(&self, tab_id: &str) -> Option<&TabSnapshot> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    fn tab_list(&self) -> Vec<(&str, &str)> {
        self.tabs
            .iter()
            .map(|t| (t.id.as_str(), t.label.as_str()))
            .collect()
    }
}

/// Orchestration engine for the attribute list panel.
pub struct Engine {
    /// TEA application state (the Model)
    pub state: AppState,

    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,

    registry: SourceRegistry,
    ctx: ActionContext,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    /// Input forwarding tasks
    input_tasks: Vec<JoinHandle<()>>,

    /// Tab descriptor forwarding tasks, per source
    source_tasks: HashMap<String, JoinHandle<()>>,

    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Create an engine over a registry. Exports are saved with a
    /// [`DirectoryFileSaver`] under the configured export directory.
    pub fn new(settings: Settings, registry: SourceRegistry) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        let file_saver: Arc<dyn FileSaver> = Arc::new(DirectoryFileSaver::new(
            settings.export.resolved_directory(),
        ));
        let ctx = ActionContext {
            msg_tx: msg_tx.clone(),
            registry: registry.clone(),
            file_saver,
        };

        Self {
            state: AppState::with_settings(settings),
            msg_tx,
            msg_rx,
            registry,
            ctx,
            shutdown_tx,
            shutdown_rx,
            input_tasks: Vec::new(),
            source_tasks: HashMap::new(),
            event_tx,
        }
    }

    /// Replace the file saver used for exports
    pub fn with_file_saver(mut self, file_saver: Arc<dyn FileSaver>) -> Self {
        self.ctx.file_saver = file_saver;
        self
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    // ─────────────────────────────────────────────────────────
    // Inputs
    // ─────────────────────────────────────────────────────────

    /// Apply the current input values, then forward later changes.
    ///
    /// Initial values are applied in order (application, filters, layers,
    /// panel visibility) so the first reconciliation sees all of them.
    pub fn connect_inputs(&mut self, inputs: EngineInputs) {
        let EngineInputs {
            mut visible_layers,
            mut panel_visible,
            mut application_id,
            mut filters,
        } = inputs;

        let initial = [
            Message::ApplicationChanged {
                application_id: application_id.borrow_and_update().clone(),
            },
            Message::FiltersChanged {
                filters: filters.borrow_and_update().clone(),
            },
            Message::VisibleLayersChanged {
                layers: visible_layers.borrow_and_update().clone(),
            },
        ];
        for message in initial {
            self.process_message(message);
        }
        for (source_id, tabs) in self.registry.tab_streams() {
            self.watch_source(source_id, tabs);
        }
        let visible = *panel_visible.borrow_and_update();
        self.process_message(Message::PanelVisibilityChanged { visible });

        let debounce = &self.state.settings.debounce;
        let filter_delay = Duration::from_millis(debounce.filter_ms);
        let layers_delay = Duration::from_millis(debounce.layers_ms);

        let tasks = [
            self.spawn_forwarder(application_id, None, |application_id| {
                Message::ApplicationChanged { application_id }
            }),
            self.spawn_forwarder(
                filters,
                Some((DebounceKey::Filters, filter_delay)),
                |filters| Message::FiltersChanged { filters },
            ),
            self.spawn_forwarder(
                visible_layers,
                Some((DebounceKey::VisibleLayers, layers_delay)),
                |layers| Message::VisibleLayersChanged { layers },
            ),
            self.spawn_forwarder(panel_visible, None, |visible| {
                Message::PanelVisibilityChanged { visible }
            }),
        ];
        self.input_tasks.extend(tasks);
    }

    /// Register a source and start following its tab descriptors
    pub fn register_source(&mut self, source: Source) -> Result<()> {
        let source_id = source.id.clone();
        let tabs = source.tabs.clone();
        self.registry.register(source)?;
        if source_id != DEFAULT_SOURCE_ID {
            self.watch_source(source_id, tabs);
        }
        Ok(())
    }

    /// Unregister a source. Its tabs close with the next reconciliation.
    pub fn unregister_source(&mut self, source_id: &str) -> bool {
        if let Some(task) = self.source_tasks.remove(source_id) {
            task.abort();
        }
        let removed = self.registry.unregister(source_id).is_some();
        self.process_message(Message::SourceTabsChanged {
            source_id: source_id.to_string(),
            tabs: Vec::new(),
        });
        removed
    }

    fn watch_source(
        &mut self,
        source_id: String,
        mut tabs: watch::Receiver<Vec<TabDescriptor>>,
    ) {
        let current = tabs.borrow_and_update().clone();
        self.process_message(Message::SourceTabsChanged {
            source_id: source_id.clone(),
            tabs: current,
        });

        let id = source_id.clone();
        let task = self.spawn_forwarder(tabs, None, move |tabs| Message::SourceTabsChanged {
            source_id: id.clone(),
            tabs,
        });
        if let Some(previous) = self.source_tasks.insert(source_id, task) {
            previous.abort();
        }
    }

    /// Forward every change of `rx` as a message, optionally debounced
    fn spawn_forwarder<T, F>(
        &self,
        mut rx: watch::Receiver<T>,
        debounce: Option<(DebounceKey, Duration)>,
        to_message: F,
    ) -> JoinHandle<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> Message + Send + 'static,
    {
        let msg_tx = self.msg_tx.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut debouncer = Debouncer::new(msg_tx.clone());
            loop {
                let changed = tokio::select! {
                    changed = rx.changed() => changed.is_ok(),
                    _ = shutdown_rx.changed() => false,
                };
                if !changed {
                    break;
                }

                let message = to_message(rx.borrow_and_update().clone());
                match debounce {
                    Some((key, delay)) => debouncer.schedule(key, delay, message),
                    None => {
                        if msg_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                }
            }
            // Pending debounced input must not land after shutdown
            debouncer.cancel_all();
        })
    }

    // ─────────────────────────────────────────────────────────
    // Processing
    // ─────────────────────────────────────────────────────────

    /// Process a single message through the TEA update cycle and emit
    /// events for what changed.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);
        let details_key = match &msg {
            Message::FeatureDetailsLoaded {
                cache_key,
                feature_id,
                details: Some(_),
            } => Some((cache_key.clone(), feature_id.clone())),
            _ => None,
        };

        process::process_message(&mut self.state, msg, &self.ctx);

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);

        if let Some((cache_key, feature_id)) = details_key {
            if let Some(details) = self.state.details.get(&cache_key, &feature_id) {
                self.emit(EngineEvent::FeatureDetailsLoaded {
                    details: details.clone(),
                });
            }
        }

        let notifications = std::mem::take(&mut self.state.notifications);
        for notification in notifications {
            self.emit(EngineEvent::Notification(notification));
        }
    }

    /// Wait for the next message and process it. Returns `false` when the
    /// channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.msg_rx.recv().await {
            Some(msg) => {
                self.process_message(msg);
                true
            }
            None => false,
        }
    }

    /// Drain and process all pending messages from the channel
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Run until a `Quit` message arrives
    pub async fn run(&mut self) {
        info!("Attribute list engine running");
        while !self.should_quit() {
            if !self.process_next().await {
                break;
            }
        }
    }

    /// Stop input forwarding and signal shutdown to subscribers
    pub fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);
        let _ = self.shutdown_tx.send(true);

        for task in self.input_tasks.drain(..) {
            task.abort();
        }
        for (_, task) in self.source_tasks.drain() {
            task.abort();
        }
        info!("Attribute list engine stopped");
    }

    // ─────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────

    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if pre.tab_list() != post.tab_list() || pre.selected_tab_id != post.selected_tab_id {
            self.emit(EngineEvent::TabsChanged {
                tabs: self.state.tabs.clone(),
                selected_tab_id: post.selected_tab_id.clone(),
            });
        }

        for tab in &post.tabs {
            let before = pre.tab(&tab.id);
            let was_loading = before.is_some_and(|t| t.loading_data);

            if tab.loading_data && !was_loading {
                self.emit(EngineEvent::LoadingStarted {
                    tab_id: tab.id.clone(),
                });
            }

            let finished = was_loading && !tab.loading_data;
            let error_changed = before.map(|t| &t.loading_error) != Some(&tab.loading_error);
            match &tab.loading_error {
                Some(error) if !tab.loading_data && (finished || error_changed) => {
                    self.emit(EngineEvent::DataLoadFailed {
                        tab_id: tab.id.clone(),
                        error: error.clone(),
                    });
                }
                None if finished => {
                    self.emit(EngineEvent::DataLoaded {
                        tab_id: tab.id.clone(),
                        dataset_id: tab.dataset_id.clone(),
                        page_index: tab.page_index,
                        row_count: tab.row_count,
                        total_count: tab.total_count,
                    });
                }
                _ => {}
            }

            if let Some(before) = before {
                if before.columns != tab.columns && !before.columns.is_empty() {
                    self.emit(EngineEvent::ColumnsChanged {
                        tab_id: tab.id.clone(),
                        columns: tab.columns.clone(),
                    });
                }
            }
        }

        if pre.highlighted_feature != post.highlighted_feature {
            self.emit(EngineEvent::HighlightedFeatureChanged {
                feature: post.highlighted_feature.clone(),
            });
        }

        for (tab_id, formats) in &post.export_formats {
            if pre.export_formats.get(tab_id) != Some(formats) {
                self.emit(EngineEvent::ExportFormatsChanged {
                    tab_id: tab_id.clone(),
                    formats: formats.iter().copied().collect(),
                });
            }
        }
    }

    /// send() returns Err only if there are no receivers, which is fine.
    fn emit(&self, event: EngineEvent) {
        trace!("Engine event: {}", event.event_type());
        let _ = self.event_tx.send(event);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for task in &self.input_tasks {
            task.abort();
        }
        for task in self.source_tasks.values() {
            task.abort();
        }
    }
}
