//! Client-side mirror of a post/like ledger program.
//!
//! The [`session::Synchronizer`] keeps a local copy of every post on the ledger:
//! one bulk read when a session starts, then incremental patches from the
//! program's event stream. Mutations are submitted as transactions and only
//! become visible locally once the corresponding event arrives.

use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod polling;
pub mod session;
pub mod state;
pub mod streaming;

#[cfg(test)]
mod testing;

use config::SyncConfig;
use ledger::InMemoryLedger;
use session::{Notifier, Synchronizer};

/// Builds a synchronizer wired to a fresh in-process ledger.
///
/// The session is not connected yet; call `set_connection` and `set_identity`.
pub fn setup_memory_session(
    config: SyncConfig,
    notifier: Arc<dyn Notifier>,
) -> (InMemoryLedger, Synchronizer) {
    let ledger = InMemoryLedger::new(config.program_id);
    let sync = Synchronizer::new(
        config,
        Arc::new(ledger.clone()),
        Arc::new(ledger.deriver()),
        notifier,
    );
    (ledger, sync)
}
