//! In-process ledger that runs the post program's rules.
//!
//! Serves as the program client for the demo binary and as the test double for
//! every synchronizer scenario. Reads, submissions and confirmations yield to the
//! scheduler once so that concurrent operations interleave the way they would
//! against a remote node.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::records::{MAX_IMAGE_LEN, MAX_TITLE_LEN};
use crate::domain::{LikeRecord, PostKey, PostRecord, Pubkey, SeedAddressDeriver, UserAccount};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::api::{
    Connection, EventKind, Instruction, ProgramClient, ProgramConnector, ProgramEvent,
    Signature, Subscription, SubscriptionId,
};

/// Call sites where a one-shot failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Submit,
    Confirm,
    ReadUser,
    ReadPost,
    ReadAll,
}

#[derive(Debug)]
struct StoredPost {
    slot: u64,
    record: PostRecord,
}

#[derive(Debug, Default)]
struct LedgerState {
    users: HashMap<Pubkey, UserAccount>,
    posts: HashMap<Pubkey, StoredPost>,
    likes: HashMap<Pubkey, LikeRecord>,
    confirmed: HashSet<String>,

    subscribers: BTreeMap<SubscriptionId, (EventKind, mpsc::UnboundedSender<ProgramEvent>)>,
    muted: HashSet<EventKind>,
    failures: HashMap<FailurePoint, String>,

    next_slot: u64,
    next_signature: u64,
    next_subscription: u64,

    user_reads: usize,
    post_reads: usize,
    bulk_reads: usize,
    handles_built: usize,
}

/// Shared ledger. Cloning yields another view of the same state.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    deriver: SeedAddressDeriver,
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            deriver: SeedAddressDeriver::new(program_id),
            state: Arc::new(Mutex::new(LedgerState::default())),
        }
    }

    pub fn deriver(&self) -> SeedAddressDeriver {
        self.deriver
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call at `point` fail with a transport error carrying `message`.
    pub fn fail_next(&self, point: FailurePoint, message: impl Into<String>) {
        self.lock().failures.insert(point, message.into());
    }

    /// Stop delivering notifications of `kind`. The program state still changes.
    pub fn mute(&self, kind: EventKind) {
        self.lock().muted.insert(kind);
    }

    pub fn unmute(&self, kind: EventKind) {
        self.lock().muted.remove(&kind);
    }

    /// Deliver a notification to subscribers without touching program state.
    pub fn emit(&self, event: ProgramEvent) {
        let mut state = self.lock();
        broadcast(&mut state, &event);
    }

    /// Place a post directly, as if created before the session started. No event.
    pub fn seed_post(&self, record: PostRecord) {
        let address = self.deriver.post(&record.owner, record.id);
        let mut state = self.lock();
        state.next_slot += 1;
        let slot = state.next_slot;
        state.posts.insert(address, StoredPost { slot, record });
    }

    /// Place a user account directly, with whatever counter it should carry.
    pub fn seed_user(&self, account: UserAccount) {
        let address = self.deriver.user(&account.owner);
        self.lock().users.insert(address, account);
    }

    pub fn post(&self, key: &PostKey) -> Option<PostRecord> {
        let address = self.deriver.post(&key.owner, key.id);
        self.lock().posts.get(&address).map(|p| p.record.clone())
    }

    pub fn user(&self, owner: &Pubkey) -> Option<UserAccount> {
        let address = self.deriver.user(owner);
        self.lock().users.get(&address).cloned()
    }

    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn user_reads(&self) -> usize {
        self.lock().user_reads
    }

    pub fn post_reads(&self) -> usize {
        self.lock().post_reads
    }

    pub fn bulk_reads(&self) -> usize {
        self.lock().bulk_reads
    }

    pub fn handles_built(&self) -> usize {
        self.lock().handles_built
    }

    pub fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        self.lock().subscribers.keys().copied().collect()
    }

    fn take_failure(&self, point: FailurePoint) -> LedgerResult<()> {
        match self.lock().failures.remove(&point) {
            Some(message) => Err(LedgerError::Transport(message)),
            None => Ok(()),
        }
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        instruction: &Instruction,
    ) -> LedgerResult<Option<ProgramEvent>> {
        match instruction {
            Instruction::CreateUser { user, owner } => {
                expect_address(user, &self.deriver.user(owner))?;
                if state.users.contains_key(user) {
                    return Err(already_in_use(user));
                }
                state.users.insert(*user, UserAccount { owner: *owner, last_post_id: 0 });
                log::debug!("[LEDGER] {} created user account {}", owner.short(), user.short());
                Ok(None)
            }

            Instruction::CreatePost { post, user, owner, title, image, post_id } => {
                let account = state
                    .users
                    .get(user)
                    .ok_or(LedgerError::AccountNotFound(*user))?;
                if account.owner != *owner {
                    return Err(rejected("Incorrect owner"));
                }
                if Some(*post_id) != account.next_post_id() {
                    return Err(rejected("Incorrect post id"));
                }
                expect_address(post, &self.deriver.post(owner, *post_id))?;
                if state.posts.contains_key(post) {
                    return Err(already_in_use(post));
                }
                check_len("title", title, MAX_TITLE_LEN)?;
                check_len("image", image, MAX_IMAGE_LEN)?;

                if let Some(account) = state.users.get_mut(user) {
                    account.last_post_id += 1;
                }
                state.next_slot += 1;
                let record = PostRecord {
                    owner: *owner,
                    id: *post_id,
                    title: title.clone(),
                    image: image.clone(),
                    likes: 0,
                };
                log::debug!("[LEDGER] post {} created: {:?}", record.key(), record.title);
                state.posts.insert(*post, StoredPost { slot: state.next_slot, record });
                Ok(Some(ProgramEvent::Created { owner: *owner, id: *post_id }))
            }

            Instruction::UpdatePost { post, owner, title } => {
                let stored = state
                    .posts
                    .get_mut(post)
                    .ok_or(LedgerError::AccountNotFound(*post))?;
                if stored.record.owner != *owner {
                    return Err(rejected("Incorrect owner"));
                }
                check_len("title", title, MAX_TITLE_LEN)?;
                log::debug!(
                    "[LEDGER] post {} title {:?} -> {:?}",
                    stored.record.key(),
                    stored.record.title,
                    title
                );
                stored.record.title = title.clone();
                Ok(Some(ProgramEvent::Updated { owner: *owner, id: stored.record.id }))
            }

            Instruction::DeletePost { post, owner } => {
                let stored = state
                    .posts
                    .get(post)
                    .ok_or(LedgerError::AccountNotFound(*post))?;
                if stored.record.owner != *owner {
                    return Err(rejected("Incorrect owner"));
                }
                let id = stored.record.id;
                state.posts.remove(post);
                Ok(Some(ProgramEvent::Deleted { owner: *owner, id }))
            }

            Instruction::LikePost { like, post, user, liker } => {
                let account = state
                    .users
                    .get(user)
                    .ok_or(LedgerError::AccountNotFound(*user))?;
                if account.owner != *liker {
                    return Err(rejected("Incorrect Liker"));
                }
                let stored = state
                    .posts
                    .get_mut(post)
                    .ok_or(LedgerError::AccountNotFound(*post))?;
                let (owner, id) = (stored.record.owner, stored.record.id);
                expect_address(like, &self.deriver.like(&owner, id, liker))?;
                if state.likes.contains_key(like) {
                    return Err(already_in_use(like));
                }
                stored.record.likes += 1;
                let likes = stored.record.likes;
                state.likes.insert(
                    *like,
                    LikeRecord { post_owner: owner, post_id: id, liker: *liker },
                );
                Ok(Some(ProgramEvent::LikeChanged { owner, id, likes }))
            }

            Instruction::DislikePost { like, post, disliker } => {
                let record = state
                    .likes
                    .get(like)
                    .ok_or(LedgerError::AccountNotFound(*like))?;
                if record.liker != *disliker {
                    return Err(rejected("Incorrect disliker"));
                }
                let stored = state
                    .posts
                    .get_mut(post)
                    .ok_or(LedgerError::AccountNotFound(*post))?;
                if record.post_owner != stored.record.owner {
                    return Err(rejected("Incorrect post owner"));
                }
                if record.post_id != stored.record.id {
                    return Err(rejected("Incorrect post id"));
                }
                stored.record.likes = stored.record.likes.saturating_sub(1);
                let event = ProgramEvent::LikeChanged {
                    owner: stored.record.owner,
                    id: stored.record.id,
                    likes: stored.record.likes,
                };
                state.likes.remove(like);
                Ok(Some(event))
            }
        }
    }
}

fn broadcast(state: &mut LedgerState, event: &ProgramEvent) {
    let kind = event.kind();
    if state.muted.contains(&kind) {
        log::trace!("[LEDGER] {} muted, dropping {:?}", kind, event);
        return;
    }
    for (id, (sub_kind, tx)) in &state.subscribers {
        if *sub_kind == kind && tx.send(event.clone()).is_err() {
            log::trace!("[LEDGER] subscriber {:?} already gone", id);
        }
    }
}

/// Reading an address that holds another account type fails to decode.
fn missing_or_mistyped(state: &LedgerState, address: &Pubkey, expected: &str) -> LedgerError {
    let holds_other = state.users.contains_key(address)
        || state.posts.contains_key(address)
        || state.likes.contains_key(address);
    if holds_other {
        LedgerError::Decode {
            address: *address,
            reason: format!("not a {expected} account"),
        }
    } else {
        LedgerError::AccountNotFound(*address)
    }
}

fn expect_address(given: &Pubkey, derived: &Pubkey) -> LedgerResult<()> {
    if given == derived {
        Ok(())
    } else {
        Err(rejected(format!("seeds constraint violated for {}", given.short())))
    }
}

fn check_len(field: &str, value: &str, max: usize) -> LedgerResult<()> {
    if value.len() > max {
        return Err(rejected(format!("{field} longer than {max} bytes")));
    }
    Ok(())
}

fn already_in_use(address: &Pubkey) -> LedgerError {
    rejected(format!("account {} already in use", address.short()))
}

fn rejected(message: impl Into<String>) -> LedgerError {
    LedgerError::Rejected(message.into())
}

impl ProgramConnector for InMemoryLedger {
    fn connect(
        &self,
        connection: &Connection,
        identity: Option<Pubkey>,
    ) -> Arc<dyn ProgramClient> {
        self.lock().handles_built += 1;
        log::debug!(
            "[LEDGER] handle for {} (signer: {:?})",
            connection.endpoint,
            identity
        );
        Arc::new(InMemoryProgramClient { ledger: self.clone(), signer: identity })
    }
}

/// Program handle over an [`InMemoryLedger`].
#[derive(Debug, Clone)]
pub struct InMemoryProgramClient {
    ledger: InMemoryLedger,
    signer: Option<Pubkey>,
}

#[async_trait]
impl ProgramClient for InMemoryProgramClient {
    fn signer(&self) -> Option<Pubkey> {
        self.signer
    }

    async fn fetch_user(&self, address: &Pubkey) -> LedgerResult<UserAccount> {
        tokio::task::yield_now().await;
        self.ledger.take_failure(FailurePoint::ReadUser)?;
        let mut state = self.ledger.lock();
        state.user_reads += 1;
        if let Some(account) = state.users.get(address) {
            return Ok(account.clone());
        }
        Err(missing_or_mistyped(&state, address, "user"))
    }

    async fn fetch_post(&self, address: &Pubkey) -> LedgerResult<PostRecord> {
        tokio::task::yield_now().await;
        self.ledger.take_failure(FailurePoint::ReadPost)?;
        let mut state = self.ledger.lock();
        state.post_reads += 1;
        if let Some(stored) = state.posts.get(address) {
            return Ok(stored.record.clone());
        }
        Err(missing_or_mistyped(&state, address, "post"))
    }

    async fn fetch_all_posts(&self) -> LedgerResult<Vec<PostRecord>> {
        tokio::task::yield_now().await;
        self.ledger.take_failure(FailurePoint::ReadAll)?;
        let mut state = self.ledger.lock();
        state.bulk_reads += 1;
        let mut stored: Vec<&StoredPost> = state.posts.values().collect();
        stored.sort_by(|a, b| b.slot.cmp(&a.slot));
        Ok(stored.into_iter().map(|p| p.record.clone()).collect())
    }

    async fn submit(&self, instruction: Instruction) -> LedgerResult<Signature> {
        tokio::task::yield_now().await;
        self.ledger.take_failure(FailurePoint::Submit)?;

        let signer = self.signer.ok_or(LedgerError::ReadOnly)?;
        if instruction.signer() != signer {
            return Err(LedgerError::MissingSigner(instruction.signer()));
        }

        let mut state = self.ledger.lock();
        let event = self.ledger.execute(&mut state, &instruction)?;

        state.next_signature += 1;
        let signature = Signature(format!("sig-{:08}", state.next_signature));
        state.confirmed.insert(signature.0.clone());
        log::trace!("[LEDGER] {} landed as {}", instruction.name(), signature);

        if let Some(event) = event {
            broadcast(&mut state, &event);
        }
        Ok(signature)
    }

    async fn confirm(&self, signature: &Signature) -> LedgerResult<()> {
        tokio::task::yield_now().await;
        self.ledger.take_failure(FailurePoint::Confirm)?;
        if self.ledger.lock().confirmed.contains(&signature.0) {
            Ok(())
        } else {
            Err(LedgerError::Unconfirmed(signature.0.clone()))
        }
    }

    fn subscribe(&self, kind: EventKind) -> LedgerResult<Subscription> {
        let mut state = self.ledger.lock();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.insert(id, (kind, tx));
        log::trace!("[LEDGER] subscribe {} -> {:?}", kind, id);
        Ok(Subscription { id, kind, events: rx })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if self.ledger.lock().subscribers.remove(&id).is_some() {
            log::trace!("[LEDGER] unsubscribe {:?}", id);
        }
    }
}
