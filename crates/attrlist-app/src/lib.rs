//! attrlist-app - State and orchestration for the attribute list panel
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! panel: `AppState` is the model, `handler::update` the only mutator,
//! `actions` run loader calls as background tasks, and `Engine` ties the
//! message queue, host inputs and event broadcast together.

pub mod actions;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod engine_event;
pub mod file_saver;
pub mod handler;
pub mod message;
pub mod notification;
pub mod process;
pub mod state;
pub mod tab_sync;

// Re-export primary types
pub use config::Settings;
pub use engine::{Engine, EngineInputs};
pub use engine_event::EngineEvent;
pub use file_saver::{DirectoryFileSaver, FileSaver};
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use notification::{Notification, NotificationLevel};
pub use state::{AppState, UniqueValuesKey};
