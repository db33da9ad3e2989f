//! State shared between the synchronizer, its subscription tasks and in-flight
//! operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::UserAccount;
use crate::streaming::engine::SyncEngine;

#[derive(Debug, Default)]
pub struct SessionState {
    /// Bumped on every handle rebuild or teardown. Writers carry the value they
    /// started under and are ignored once it is stale.
    pub generation: u64,

    pub user_account: Option<UserAccount>,

    pub engine: SyncEngine,
}

#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SessionState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn advance_generation(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.generation
    }

    /// Runs `f` only while `generation` is still the current one.
    pub fn if_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        Some(f(&mut state))
    }
}
