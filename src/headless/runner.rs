//! Headless mode runner - engine event loop without a host UI
//!
//! Serves a JSON fixture through the default source, feeds stdin commands
//! into the engine and prints every engine event as NDJSON.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

use attrlist_app::config::{load_settings, load_settings_file};
use attrlist_app::{Engine, EngineEvent, EngineInputs, Message};
use attrlist_core::prelude::*;
use attrlist_core::{
    AppLayer, AttributeFilter, FilterCondition, FilterGroup, FilterOperator, FilterState,
};
use attrlist_sources::{ApiDataLoader, FixtureApi, Source, SourceRegistry, DEFAULT_SOURCE_ID};

use super::command::Command;
use super::HeadlessEvent;

/// What to serve and where to read settings from
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub fixture: PathBuf,
    /// Overrides the fixture's application id
    pub application_id: Option<String>,
    /// Settings file; `.attrlist/config.toml` under the working directory
    /// when absent
    pub config: Option<PathBuf>,
}

/// Host-side senders for the engine inputs
struct HostInputs {
    all_layers: Vec<AppLayer>,
    visible_layers: watch::Sender<Vec<AppLayer>>,
    panel_visible: watch::Sender<bool>,
    _application_id: watch::Sender<Option<String>>,
    filters: watch::Sender<FilterState>,
}

impl HostInputs {
    fn new(layers: Vec<AppLayer>, application_id: Option<String>) -> (Self, EngineInputs) {
        let (layers_tx, layers_rx) = watch::channel(layers.clone());
        let (panel_tx, panel_rx) = watch::channel(true);
        let (app_tx, app_rx) = watch::channel(application_id);
        let (filters_tx, filters_rx) = watch::channel(FilterState::default());
        (
            Self {
                all_layers: layers,
                visible_layers: layers_tx,
                panel_visible: panel_tx,
                _application_id: app_tx,
                filters: filters_tx,
            },
            EngineInputs {
                visible_layers: layers_rx,
                panel_visible: panel_rx,
                application_id: app_rx,
                filters: filters_rx,
            },
        )
    }

    fn hide_layer(&self, layer_id: &str) {
        self.visible_layers.send_modify(|layers| {
            layers.retain(|l| l.id != layer_id);
        });
    }

    /// Show a fixture layer again, keeping fixture order
    fn show_layer(&self, layer_id: &str) {
        let all = &self.all_layers;
        self.visible_layers.send_modify(|layers| {
            if layers.iter().any(|l| l.id == layer_id) {
                return;
            }
            let mut ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
            ids.push(layer_id);
            *layers = all
                .iter()
                .filter(|l| ids.contains(&l.id.as_str()))
                .cloned()
                .collect();
        });
    }

    fn add_filter(&self, layer_id: String, attribute: String, value: String) {
        self.filters.send_modify(|filters| {
            let id = format!("headless-{}", filters.groups.len() + 1);
            filters.groups.push(FilterGroup {
                id,
                layer_ids: vec![layer_id],
                operator: FilterOperator::And,
                filters: vec![AttributeFilter::new(
                    attribute,
                    FilterCondition::Equals,
                    vec![json!(value)],
                )],
                disabled: false,
            });
        });
    }
}

enum LoopEvent {
    Processed(bool),
    Command(Option<Command>),
}

/// Run in headless mode - output JSON events instead of a UI
pub async fn run_headless(options: &HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("Attribute list starting in HEADLESS mode");
    info!("Fixture: {}", options.fixture.display());
    info!("═══════════════════════════════════════════════════════");

    let api = FixtureApi::from_path(&options.fixture)
        .with_context(|| format!("Failed to load fixture {}", options.fixture.display()))?;
    let application_id = options
        .application_id
        .clone()
        .or_else(|| api.application_id().map(str::to_string));
    let layers = api.layers();

    let mut loader = ApiDataLoader::new(api.clone());
    if api.has_details() {
        loader = loader.with_row_expansion();
    }
    let registry = SourceRegistry::new();
    registry.register(Source::new(DEFAULT_SOURCE_ID, Arc::new(loader)))?;

    let settings = match &options.config {
        Some(path) => load_settings_file(path),
        None => load_settings(&std::env::current_dir()?),
    };
    let mut engine = Engine::new(settings, registry);
    let mut events = engine.subscribe();

    let (host, inputs) = HostInputs::new(layers, application_id);
    engine.connect_inputs(inputs);
    emit_events(&engine, &mut events);

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(32);
    std::thread::spawn(move || {
        read_commands_blocking(cmd_tx);
    });

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        let next = tokio::select! {
            processed = engine.process_next() => LoopEvent::Processed(processed),
            command = cmd_rx.recv() => LoopEvent::Command(command),
        };
        match next {
            LoopEvent::Processed(true) => {}
            LoopEvent::Processed(false) => {
                info!("Message channel closed");
                break;
            }
            LoopEvent::Command(Some(command)) => apply_command(&mut engine, &host, command),
            LoopEvent::Command(None) => {
                info!("Stdin closed");
                break;
            }
        }
        emit_events(&engine, &mut events);
    }

    engine.shutdown();
    emit_events(&engine, &mut events);

    info!("Attribute list headless mode exiting");
    Ok(())
}

/// Print every event broadcast since the last call
fn emit_events(engine: &Engine, events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => HeadlessEvent::from_engine_event(&event, &engine.state).emit(),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Headless output skipped {} engine events", skipped);
            }
            Err(_) => break,
        }
    }
}

/// Translate a command into engine messages or input changes
fn apply_command(engine: &mut Engine, host: &HostInputs, command: Command) {
    let selected_tab = engine.state.selected_tab().cloned();
    let tab_id = selected_tab.as_ref().map(|t| t.id.clone());
    let dataset_id = selected_tab.as_ref().map(|t| t.selected_dataset_id.clone());

    let message = match (command, tab_id, dataset_id) {
        (Command::SelectTab(tab), _, _) => {
            let tab_id = tab
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| engine.state.tabs.get(i))
                .map(|t| t.id.clone())
                .unwrap_or(tab);
            Some(Message::SelectTab { tab_id })
        }
        (Command::Page(page), _, Some(dataset_id)) => Some(Message::UpdatePage {
            dataset_id,
            page_index: page.saturating_sub(1),
        }),
        (Command::PageSize(page_size), _, Some(dataset_id)) => Some(Message::ChangePageSize {
            dataset_id,
            page_size,
        }),
        (Command::Sort { column, direction }, _, Some(dataset_id)) => Some(Message::UpdateSort {
            dataset_id,
            column: Some(column),
            direction,
        }),
        (Command::SelectRow(row_id), _, Some(dataset_id)) => Some(Message::UpdateRowSelected {
            dataset_id,
            row_id,
            selected: true,
        }),
        (Command::Deselect, _, Some(dataset_id)) => {
            let row_id = engine
                .state
                .dataset(&dataset_id)
                .and_then(|d| d.selected_row_id.clone());
            row_id.map(|row_id| Message::UpdateRowSelected {
                dataset_id,
                row_id,
                selected: false,
            })
        }
        (Command::ToggleColumn(column_id), _, Some(dataset_id)) => {
            Some(Message::ToggleColumnVisible {
                dataset_id,
                column_id,
            })
        }
        (Command::SetColumnsVisible(visible), _, Some(dataset_id)) => {
            Some(Message::SetColumnsVisibility {
                dataset_id,
                visible,
            })
        }
        (Command::MoveColumn { column, target }, _, Some(dataset_id)) => {
            Some(Message::ChangeColumnPosition {
                dataset_id,
                column_id: column,
                target_column_id: target,
            })
        }
        (Command::Formats, Some(tab_id), _) => Some(Message::RequestExportFormats { tab_id }),
        (Command::Export(format), Some(tab_id), _) => Some(Message::Export { tab_id, format }),
        (Command::Details(feature_id), _, _) => Some(Message::LoadFeatureDetails { feature_id }),
        (Command::UniqueValues(attribute), Some(tab_id), _) => {
            Some(Message::LoadUniqueValues { tab_id, attribute })
        }
        (Command::Filter {
            layer_id,
            attribute,
            value,
        }, _, _) => {
            host.add_filter(layer_id, attribute, value);
            None
        }
        (Command::ClearFilters, _, _) => {
            host.filters.send_replace(FilterState::default());
            None
        }
        (Command::HideLayer(layer_id), _, _) => {
            host.hide_layer(&layer_id);
            None
        }
        (Command::ShowLayer(layer_id), _, _) => {
            host.show_layer(&layer_id);
            None
        }
        (Command::SetPanelVisible(visible), _, _) => {
            host.panel_visible.send_replace(visible);
            None
        }
        (Command::Quit, _, _) => Some(Message::Quit),
        (command, _, _) => {
            warn!("Ignoring {:?}: no tab selected", command);
            None
        }
    };

    if let Some(message) = message {
        engine.process_message(message);
    }
}

/// Read stdin commands on a dedicated thread (blocking version)
fn read_commands_blocking(cmd_tx: mpsc::Sender<Command>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        match Command::parse(&line) {
            Ok(Some(command)) => {
                let quit = command == Command::Quit;
                if cmd_tx.blocking_send(command).is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => {
                warn!("{}", message);
                HeadlessEvent::error(message, false).emit();
            }
        }
    }

    info!("Stdin reader exiting");
}
