use std::collections::BTreeSet;

use crate::domain::{PostKey, PostRecord, Pubkey};
use crate::ledger::ProgramEvent;
use crate::streaming::engine::{EngineCommand, EngineEvent, FetchIntent, SyncEngine};

// =========================================================================
// Helpers
// =========================================================================

fn post(owner: Pubkey, id: u64) -> PostRecord {
    PostRecord {
        owner,
        id,
        title: format!("title {id}"),
        image: format!("https://img.example/{id}.png"),
        likes: id * 10,
    }
}

fn loaded(posts: Vec<PostRecord>) -> SyncEngine {
    let mut engine = SyncEngine::new();
    engine.handle_event(EngineEvent::Bootstrapped(posts));
    engine
}

fn keys(engine: &SyncEngine) -> BTreeSet<PostKey> {
    engine.posts().unwrap().iter().map(PostRecord::key).collect()
}

/// Plays a notification the way the runtime does: run any requested fetch
/// against `ledger_view`, skipping keys listed in `failing_reads`.
fn play(
    engine: &mut SyncEngine,
    event: ProgramEvent,
    ledger_view: &[PostRecord],
    failing_reads: &[PostKey],
) {
    for cmd in engine.handle_event(EngineEvent::Notification(event)) {
        let EngineCommand::FetchPost { key, intent } = cmd;
        if failing_reads.contains(&key) {
            continue;
        }
        if let Some(found) = ledger_view.iter().find(|p| p.matches(&key)) {
            engine.handle_event(EngineEvent::PostFetched { intent, post: found.clone() });
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn notifications_before_bootstrap_are_ignored() {
    let mut engine = SyncEngine::new();
    let owner = Pubkey::new_unique();

    let cmds = engine.handle_event(EngineEvent::Notification(ProgramEvent::Created {
        owner,
        id: 1,
    }));

    assert!(cmds.is_empty());
    assert!(!engine.is_initialized());
    assert_eq!(engine.dropped_before_bootstrap(), 1);
}

#[test]
fn empty_bootstrap_is_not_uninitialized() {
    let engine = loaded(vec![]);
    assert!(engine.is_initialized());
    assert_eq!(engine.posts(), Some(&[][..]));
}

#[test]
fn created_requests_fetch_then_prepends() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 1)]);

    let cmds = engine.handle_event(EngineEvent::Notification(ProgramEvent::Created {
        owner,
        id: 2,
    }));
    assert_eq!(
        cmds,
        vec![EngineCommand::FetchPost {
            key: PostKey::new(owner, 2),
            intent: FetchIntent::Prepend
        }]
    );

    engine.handle_event(EngineEvent::PostFetched {
        intent: FetchIntent::Prepend,
        post: post(owner, 2),
    });
    let ids: Vec<u64> = engine.posts().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn prepend_of_known_key_does_not_duplicate() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 2), post(owner, 1)]);

    engine.handle_event(EngineEvent::PostFetched {
        intent: FetchIntent::Prepend,
        post: post(owner, 1),
    });

    let ids: Vec<u64> = engine.posts().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn update_replaces_only_matching_entry() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 2), post(owner, 1)]);

    let mut renamed = post(owner, 1);
    renamed.title = "renamed".into();
    engine.handle_event(EngineEvent::PostFetched { intent: FetchIntent::Replace, post: renamed });

    let posts = engine.posts().unwrap();
    assert_eq!(posts[0], post(owner, 2));
    assert_eq!(posts[1].title, "renamed");
}

#[test]
fn update_for_unknown_key_is_dropped() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 1)]);

    engine.handle_event(EngineEvent::PostFetched {
        intent: FetchIntent::Replace,
        post: post(owner, 9),
    });

    assert_eq!(engine.posts().unwrap(), &[post(owner, 1)][..]);
}

#[test]
fn delete_is_idempotent() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 1), post(owner, 2)]);
    let delete = ProgramEvent::Deleted { owner, id: 1 };

    engine.handle_event(EngineEvent::Notification(delete.clone()));
    let after_first = engine.posts().unwrap().to_vec();
    engine.handle_event(EngineEvent::Notification(delete));

    assert_eq!(engine.posts().unwrap(), &after_first[..]);
    assert_eq!(after_first, vec![post(owner, 2)]);
}

#[test]
fn like_change_touches_only_likes_of_matching_entry() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let before = vec![post(alice, 1), post(bob, 1), post(alice, 2)];
    let mut engine = loaded(before.clone());

    engine.handle_event(EngineEvent::Notification(ProgramEvent::LikeChanged {
        owner: bob,
        id: 1,
        likes: 77,
    }));

    let after = engine.posts().unwrap();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    let mut expected = before[1].clone();
    expected.likes = 77;
    assert_eq!(after[1], expected);
}

#[test]
fn key_set_follows_notification_history_despite_unrelated_read_failures() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let ledger_view = vec![post(alice, 1), post(alice, 2), post(bob, 1), post(bob, 2)];
    let mut engine = loaded(vec![post(alice, 1)]);

    let history = [
        ProgramEvent::Created { owner: alice, id: 2 },
        ProgramEvent::Created { owner: bob, id: 1 },
        ProgramEvent::Updated { owner: alice, id: 1 },
        ProgramEvent::Created { owner: bob, id: 2 },
        ProgramEvent::Deleted { owner: alice, id: 1 },
        ProgramEvent::Updated { owner: bob, id: 1 },
    ];
    // Reads of bob#1 keep failing, but only during its update, not its creation.
    let mut failing = Vec::new();
    for event in history {
        if matches!(event, ProgramEvent::Updated { .. }) {
            failing = vec![PostKey::new(bob, 1)];
        }
        play(&mut engine, event, &ledger_view, &failing);
    }

    let expected: BTreeSet<PostKey> = [
        PostKey::new(alice, 2),
        PostKey::new(bob, 1),
        PostKey::new(bob, 2),
    ]
    .into_iter()
    .collect();
    assert_eq!(keys(&engine), expected);
}

#[test]
fn bootstrap_replaces_wholesale() {
    let owner = Pubkey::new_unique();
    let mut engine = loaded(vec![post(owner, 1), post(owner, 2)]);

    engine.handle_event(EngineEvent::Bootstrapped(vec![post(owner, 3)]));

    assert_eq!(engine.posts().unwrap(), &[post(owner, 3)][..]);
}
