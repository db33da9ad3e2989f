use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::{AddressDeriver, PostKey, PostRecord};
use crate::error::LedgerResult;
use crate::ledger::{EventKind, ProgramClient, ProgramEvent, Subscription, SubscriptionId};
use crate::state::SharedState;
use crate::streaming::engine::{EngineCommand, EngineEvent};

/// The four live subscriptions of one session handle.
///
/// Each subscription is drained by its own task. Closing aborts the tasks and
/// unsubscribes synchronously; writes that were already past the abort point are
/// rejected by the generation check in [`SharedState::if_current`].
pub struct SubscriptionSet {
    client: Arc<dyn ProgramClient>,
    live: Vec<(SubscriptionId, EventKind, JoinHandle<()>)>,
}

impl SubscriptionSet {
    /// Subscribes to every event kind. Must be called from within a tokio runtime.
    pub fn open(
        client: Arc<dyn ProgramClient>,
        deriver: Arc<dyn AddressDeriver>,
        shared: SharedState,
        generation: u64,
    ) -> LedgerResult<Self> {
        let mut set = Self { client: client.clone(), live: Vec::new() };

        for kind in EventKind::ALL {
            // On error `set` is dropped, which closes whatever was opened so far.
            let subscription = client.subscribe(kind)?;
            let id = subscription.id;
            let listener = MirrorListener {
                client: client.clone(),
                deriver: deriver.clone(),
                shared: shared.clone(),
                generation,
            };
            let task = tokio::spawn(listener.run(subscription));
            set.live.push((id, kind, task));
        }

        log::info!(
            "[SYNC] listening on {} event streams (generation {})",
            set.live.len(),
            generation
        );
        Ok(set)
    }

    pub fn ids(&self) -> Vec<SubscriptionId> {
        self.live.iter().map(|(id, _, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn close(&mut self) {
        for (id, kind, task) in self.live.drain(..) {
            task.abort();
            self.client.unsubscribe(id);
            log::debug!("[SYNC] closed {} listener {:?}", kind, id);
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.close();
    }
}

/// Applies one subscription's notifications to the mirror, in receipt order.
struct MirrorListener {
    client: Arc<dyn ProgramClient>,
    deriver: Arc<dyn AddressDeriver>,
    shared: SharedState,
    generation: u64,
}

impl MirrorListener {
    async fn run(self, mut subscription: Subscription) {
        while let Some(event) = subscription.events.recv().await {
            self.apply(event).await;
        }
        log::debug!("[SYNC] {} stream ended", subscription.kind);
    }

    async fn apply(&self, event: ProgramEvent) {
        log::trace!("[SYNC] event {:?}", event);

        let cmds = self.shared.if_current(self.generation, |s| {
            s.engine.handle_event(EngineEvent::Notification(event))
        });
        let Some(cmds) = cmds else {
            log::debug!("[SYNC] stale listener (generation {}), event dropped", self.generation);
            return;
        };

        for cmd in cmds {
            self.execute(cmd).await;
        }
    }

    async fn execute(&self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::FetchPost { key, intent } => {
                let post = match self.read_post(&key).await {
                    Ok(post) => post,
                    Err(err) => {
                        log::warn!("[SYNC] could not read post {}: {}", key, err);
                        return;
                    }
                };

                let applied = self.shared.if_current(self.generation, |s| {
                    s.engine.handle_event(EngineEvent::PostFetched { intent, post });
                });
                if applied.is_none() {
                    log::debug!("[SYNC] session rebuilt while reading {}, result dropped", key);
                }
            }
        }
    }

    async fn read_post(&self, key: &PostKey) -> LedgerResult<PostRecord> {
        let address = self.deriver.post_address(&key.owner, key.id).await?;
        self.client.fetch_post(&address).await
    }
}
