//! The session object the presentation layer talks to.
//!
//! [`Synchronizer`] owns the program handle, the subscription tasks and the
//! caches. Its lifecycle is driven by explicit `set_connection`, `set_identity`
//! and `shutdown` calls from the wallet side.

pub mod handle;
pub mod notify;
mod operations;


use std::sync::Arc;

use serde::Serialize;

pub use handle::SessionHandle;
pub use notify::{LogNotifier, Notification, Notifier, RecordingNotifier};
pub use operations::{Mutation, MutationOutcome};

use crate::config::SyncConfig;
use crate::domain::{AddressDeriver, IdentityTracker, PostRecord, Pubkey, UserAccount};
use crate::ledger::{Connection, ProgramConnector, SubscriptionId};
use crate::polling::baseline;
use crate::state::SharedState;
use crate::streaming::engine::EngineEvent;
use crate::streaming::runtime::SubscriptionSet;

/// Read-only view of the synchronized state, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub connected: bool,
    pub has_user_account: bool,
    pub user_account: Option<UserAccount>,
    /// `None` while the collection has not been loaded yet.
    pub posts: Option<Vec<PostRecord>>,
}

pub struct Synchronizer {
    config: SyncConfig,
    connector: Arc<dyn ProgramConnector>,
    deriver: Arc<dyn AddressDeriver>,
    notifier: Arc<dyn Notifier>,

    shared: SharedState,
    tracker: IdentityTracker,

    connection: Option<Connection>,
    identity: Option<Pubkey>,
    handle: Option<SessionHandle>,
    subscriptions: Option<SubscriptionSet>,

    post_creation: tokio::sync::Mutex<()>,
}

impl Synchronizer {
    pub fn new(
        config: SyncConfig,
        connector: Arc<dyn ProgramConnector>,
        deriver: Arc<dyn AddressDeriver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            connector,
            deriver,
            notifier,
            shared: SharedState::new(),
            tracker: IdentityTracker::new(),
            connection: None,
            identity: None,
            handle: None,
            subscriptions: None,
            post_creation: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ================================
    // Lifecycle
    // ================================

    pub async fn set_connection(&mut self, connection: Option<Connection>) {
        if self.connection == connection {
            return;
        }
        log::info!(
            "[SESSION] connection -> {}",
            connection.as_ref().map_or("none", |c| c.endpoint.as_str())
        );
        self.connection = connection;
        self.rebuild().await;
    }

    pub async fn set_identity(&mut self, identity: Option<Pubkey>) {
        if self.identity == identity {
            return;
        }
        log::info!("[SESSION] identity -> {:?}", identity);
        self.identity = identity;
        if let Some(connected) = self.tracker.observe(self.identity.as_ref()) {
            log::info!("[SESSION] connected: {}", connected);
        }
        self.rebuild().await;
    }

    /// Drops the handle and every subscription and forgets the connection and
    /// identity, so supplying them again starts a fresh session. The mirror is kept.
    pub fn shutdown(&mut self) {
        self.teardown();
        self.shared.advance_generation();
        self.handle = None;
        self.connection = None;
        self.identity = None;
        if let Some(connected) = self.tracker.observe(None) {
            log::info!("[SESSION] connected: {}", connected);
        }
        log::info!("[SESSION] shut down");
    }

    async fn rebuild(&mut self) {
        self.teardown();
        let generation = self.shared.advance_generation();

        self.handle = SessionHandle::build(
            self.connector.as_ref(),
            self.connection.as_ref(),
            self.identity,
            generation,
        );
        let Some(handle) = self.handle.clone() else {
            log::info!("[SESSION] no connection, session idle");
            return;
        };

        match SubscriptionSet::open(
            handle.client().clone(),
            self.deriver.clone(),
            self.shared.clone(),
            generation,
        ) {
            Ok(set) => self.subscriptions = Some(set),
            Err(err) => log::warn!("[SESSION] could not subscribe to program events: {}", err),
        }

        let initialized = self.shared.lock().engine.is_initialized();
        if !initialized {
            self.fetch_posts().await;
        }
        self.fetch_user_account().await;
    }

    fn teardown(&mut self) {
        if let Some(mut subscriptions) = self.subscriptions.take() {
            subscriptions.close();
        }
    }

    // ================================
    // Reads
    // ================================

    /// Reloads the current identity's account. Failures leave it absent.
    pub async fn fetch_user_account(&self) {
        let Some(handle) = self.handle.clone() else {
            return;
        };

        let account = baseline::load_user_account(
            handle.client().as_ref(),
            self.deriver.as_ref(),
            handle.identity(),
        )
        .await;

        let applied = self
            .shared
            .if_current(handle.generation(), |s| s.user_account = account);
        if applied.is_none() {
            log::debug!("[SESSION] user account read outlived its handle, dropped");
        }
    }

    /// Bulk-loads every post and replaces the mirror. Failures leave it as it was.
    pub async fn fetch_posts(&self) {
        let Some(handle) = self.handle.clone() else {
            return;
        };

        let posts = match baseline::bootstrap_posts(handle.client().as_ref()).await {
            Ok((posts, _stats)) => posts,
            Err(err) => {
                log::warn!("[SESSION] bulk read failed: {}", err);
                return;
            }
        };

        let applied = self.shared.if_current(handle.generation(), |s| {
            s.engine.handle_event(EngineEvent::Bootstrapped(posts));
        });
        if applied.is_none() {
            log::debug!("[SESSION] bulk read outlived its handle, dropped");
        }
    }

    // ================================
    // State surface
    // ================================

    pub fn connected(&self) -> bool {
        self.tracker.connected()
    }

    pub fn identity(&self) -> Option<Pubkey> {
        self.identity
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    pub fn has_user_account(&self) -> bool {
        self.shared.lock().user_account.is_some()
    }

    pub fn user_account(&self) -> Option<UserAccount> {
        self.shared.lock().user_account.clone()
    }

    pub fn posts(&self) -> Option<Vec<PostRecord>> {
        self.shared.lock().engine.posts().map(<[PostRecord]>::to_vec)
    }

    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions
            .as_ref()
            .map(SubscriptionSet::ids)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.shared.lock();
        SyncSnapshot {
            connected: self.tracker.connected(),
            has_user_account: state.user_account.is_some(),
            user_account: state.user_account.clone(),
            posts: state.engine.posts().map(<[PostRecord]>::to_vec),
        }
    }
}
