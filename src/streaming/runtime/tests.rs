use std::sync::Arc;

use crate::domain::{AddressDeriver, PostKey, PostRecord, Pubkey};
use crate::ledger::{
    Connection, FailurePoint, InMemoryLedger, ProgramClient, ProgramConnector, ProgramEvent,
};
use crate::state::SharedState;
use crate::streaming::engine::EngineEvent;
use crate::streaming::runtime::SubscriptionSet;
use crate::testing::settle;

// --- Fixtures ---

struct Fixture {
    ledger: InMemoryLedger,
    client: Arc<dyn ProgramClient>,
    deriver: Arc<dyn AddressDeriver>,
    shared: SharedState,
}

fn fixture() -> Fixture {
    let ledger = InMemoryLedger::new(Pubkey::new([5u8; 32]));
    let client = ledger.connect(&Connection::new("memory://runtime"), None);
    let deriver: Arc<dyn AddressDeriver> = Arc::new(ledger.deriver());
    let shared = SharedState::new();
    shared.advance_generation();
    Fixture { ledger, client, deriver, shared }
}

fn post(owner: Pubkey, id: u64) -> PostRecord {
    PostRecord {
        owner,
        id,
        title: format!("t{id}"),
        image: String::new(),
        likes: 0,
    }
}

fn bootstrap(shared: &SharedState, posts: Vec<PostRecord>) {
    shared.lock().engine.handle_event(EngineEvent::Bootstrapped(posts));
}

fn mirror(shared: &SharedState) -> Vec<PostRecord> {
    shared.lock().engine.posts().map(<[_]>::to_vec).unwrap_or_default()
}

fn open(f: &Fixture) -> SubscriptionSet {
    SubscriptionSet::open(
        f.client.clone(),
        f.deriver.clone(),
        f.shared.clone(),
        f.shared.generation(),
    )
    .unwrap()
}

// --- Tests ---

#[tokio::test]
async fn opens_one_subscription_per_event_kind() {
    let f = fixture();
    let set = open(&f);

    assert_eq!(set.len(), 4);
    assert_eq!(f.ledger.active_subscriptions(), set.ids());
}

#[tokio::test]
async fn created_notification_reads_and_prepends() {
    let f = fixture();
    let owner = Pubkey::new_unique();
    bootstrap(&f.shared, vec![post(owner, 1)]);
    let _set = open(&f);

    f.ledger.seed_post(post(owner, 2));
    f.ledger.emit(ProgramEvent::Created { owner, id: 2 });
    settle().await;

    let ids: Vec<u64> = mirror(&f.shared).iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn failed_read_leaves_mirror_unchanged() {
    let f = fixture();
    let owner = Pubkey::new_unique();
    bootstrap(&f.shared, vec![post(owner, 1)]);
    let _set = open(&f);

    f.ledger.seed_post(post(owner, 2));
    f.ledger.fail_next(FailurePoint::ReadPost, "timeout");
    f.ledger.emit(ProgramEvent::Created { owner, id: 2 });
    settle().await;

    assert_eq!(mirror(&f.shared), vec![post(owner, 1)]);
}

#[tokio::test]
async fn closing_unsubscribes_and_stops_mirror_writes() {
    let f = fixture();
    let owner = Pubkey::new_unique();
    bootstrap(&f.shared, vec![post(owner, 1)]);
    let mut set = open(&f);

    set.close();
    assert!(set.is_empty());
    assert!(f.ledger.active_subscriptions().is_empty());

    f.ledger.emit(ProgramEvent::Deleted { owner, id: 1 });
    settle().await;
    assert_eq!(mirror(&f.shared), vec![post(owner, 1)]);
}

#[tokio::test]
async fn stale_generation_listener_cannot_write() {
    let f = fixture();
    let owner = Pubkey::new_unique();
    bootstrap(&f.shared, vec![post(owner, 1)]);
    let _set = open(&f);

    // Rebuild without closing: the old tasks are still subscribed but stale.
    f.shared.advance_generation();
    f.ledger.emit(ProgramEvent::LikeChanged { owner, id: 1, likes: 5 });
    settle().await;

    assert_eq!(mirror(&f.shared)[0].likes, 0);
}

#[tokio::test]
async fn updated_for_unknown_post_is_not_inserted() {
    let f = fixture();
    let owner = Pubkey::new_unique();
    bootstrap(&f.shared, vec![post(owner, 1)]);
    let _set = open(&f);

    f.ledger.seed_post(post(owner, 7));
    f.ledger.emit(ProgramEvent::Updated { owner, id: 7 });
    settle().await;

    let keys: Vec<PostKey> = mirror(&f.shared).iter().map(PostRecord::key).collect();
    assert_eq!(keys, vec![PostKey::new(owner, 1)]);
}

#[tokio::test]
async fn dropping_the_set_closes_it() {
    let f = fixture();
    {
        let _set = open(&f);
        assert_eq!(f.ledger.active_subscriptions().len(), 4);
    }
    assert!(f.ledger.active_subscriptions().is_empty());
}
