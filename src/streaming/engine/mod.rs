//! Mirror reconciliation engine.
//!
//! This module is the **Functional Core** of the post mirror:
//! - **Input**: `EngineEvent` (bulk reads, program notifications, fetched records).
//! - **Output**: `Vec<EngineCommand>` (reads the runtime must perform).
//!
//! It never touches the network and never awaits, so every rule about how a
//! notification changes the mirror can be tested synchronously.

pub mod state;
mod logic;
pub mod types;

#[cfg(test)]
mod tests;

pub use crate::streaming::engine::types::{EngineCommand, EngineEvent, FetchIntent};

use crate::domain::PostRecord;
use crate::ledger::ProgramEvent;

use state::EngineState;

/// Owns the mirror and decides how each event changes it.
#[derive(Debug, Default, Clone)]
pub struct SyncEngine {
    state: EngineState,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one event in and returns the reads it requires.
    pub fn handle_event(&mut self, event: EngineEvent) -> Vec<EngineCommand> {
        match event {
            EngineEvent::Bootstrapped(posts) => logic::on_bootstrapped(&mut self.state, posts),
            EngineEvent::Notification(notification) => {
                let key = notification.key();
                match notification {
                    ProgramEvent::Created { .. } => {
                        logic::on_needs_record(&mut self.state, key, FetchIntent::Prepend)
                    }
                    ProgramEvent::Updated { .. } => {
                        logic::on_needs_record(&mut self.state, key, FetchIntent::Replace)
                    }
                    ProgramEvent::Deleted { .. } => logic::on_deleted(&mut self.state, key),
                    ProgramEvent::LikeChanged { likes, .. } => {
                        logic::on_like_changed(&mut self.state, key, likes)
                    }
                }
            }
            EngineEvent::PostFetched { intent, post } => {
                logic::on_post_fetched(&mut self.state, intent, post)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.posts.is_some()
    }

    pub fn posts(&self) -> Option<&[PostRecord]> {
        self.state.posts.as_deref()
    }

    pub fn dropped_before_bootstrap(&self) -> u64 {
        self.state.dropped_before_bootstrap
    }
}
