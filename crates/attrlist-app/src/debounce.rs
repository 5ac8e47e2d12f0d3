//! Per-key debouncing of messages into the engine queue
//!
//! Each key holds at most one pending timer. Scheduling again for the same
//! key aborts the previous timer, so only the last message of a burst is
//! delivered, `delay` after the burst ends.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::message::Message;

/// Logical input streams that are debounced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    Filters,
    VisibleLayers,
}

#[derive(Debug)]
pub struct Debouncer<K> {
    msg_tx: mpsc::Sender<Message>,
    timers: HashMap<K, JoinHandle<()>>,
}

impl<K: Eq + Hash> Debouncer<K> {
    pub fn new(msg_tx: mpsc::Sender<Message>) -> Self {
        Self {
            msg_tx,
            timers: HashMap::new(),
        }
    }

    /// Deliver `message` after `delay` unless rescheduled for the same key.
    /// A zero delay still goes through the queue, without a timer.
    pub fn schedule(&mut self, key: K, delay: Duration, message: Message) {
        if let Some(previous) = self.timers.remove(&key) {
            previous.abort();
        }

        let msg_tx = self.msg_tx.clone();
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = msg_tx.send(message).await;
        });
        self.timers.insert(key, handle);
    }
}

impl<K> Debouncer<K> {
    /// Abort every pending timer
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

// Forwarders are aborted on shutdown, which drops the debouncer mid-loop
impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
