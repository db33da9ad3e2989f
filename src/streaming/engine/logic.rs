use crate::domain::{PostKey, PostRecord};
use crate::streaming::engine::state::EngineState;
use crate::streaming::engine::types::{EngineCommand, FetchIntent};

pub fn on_bootstrapped(state: &mut EngineState, posts: Vec<PostRecord>) -> Vec<EngineCommand> {
    log::info!("[ENGINE] mirror replaced with {} posts", posts.len());
    state.posts = Some(posts);
    Vec::new()
}

/// Created and Updated carry only a key; the record itself has to be read.
pub fn on_needs_record(
    state: &mut EngineState,
    key: PostKey,
    intent: FetchIntent,
) -> Vec<EngineCommand> {
    if state.posts.is_none() {
        drop_uninitialized(state, key);
        return Vec::new();
    }
    vec![EngineCommand::FetchPost { key, intent }]
}

pub fn on_deleted(state: &mut EngineState, key: PostKey) -> Vec<EngineCommand> {
    let Some(posts) = state.posts.as_mut() else {
        drop_uninitialized(state, key);
        return Vec::new();
    };

    let before = posts.len();
    posts.retain(|p| !p.matches(&key));
    if posts.len() == before {
        log::debug!("[ENGINE] delete for unknown post {}", key);
    } else {
        log::trace!("[ENGINE] removed post {}", key);
    }
    Vec::new()
}

pub fn on_like_changed(state: &mut EngineState, key: PostKey, likes: u64) -> Vec<EngineCommand> {
    let Some(posts) = state.posts.as_mut() else {
        drop_uninitialized(state, key);
        return Vec::new();
    };

    match posts.iter_mut().find(|p| p.matches(&key)) {
        Some(post) => {
            log::trace!("[ENGINE] post {} likes {} -> {}", key, post.likes, likes);
            post.likes = likes;
        }
        None => log::debug!("[ENGINE] like count for unknown post {}", key),
    }
    Vec::new()
}

pub fn on_post_fetched(
    state: &mut EngineState,
    intent: FetchIntent,
    post: PostRecord,
) -> Vec<EngineCommand> {
    let key = post.key();
    let Some(posts) = state.posts.as_mut() else {
        drop_uninitialized(state, key);
        return Vec::new();
    };

    match intent {
        FetchIntent::Prepend => {
            // The bulk read may already contain it.
            posts.retain(|p| !p.matches(&key));
            posts.insert(0, post);
            log::trace!("[ENGINE] prepended post {}", key);
        }
        FetchIntent::Replace => match posts.iter_mut().find(|p| p.matches(&key)) {
            Some(slot) => {
                *slot = post;
                log::trace!("[ENGINE] replaced post {}", key);
            }
            // Strict update: keys the mirror does not hold are not inserted.
            None => log::debug!("[ENGINE] update for unknown post {} dropped", key),
        },
    }
    Vec::new()
}

fn drop_uninitialized(state: &mut EngineState, key: PostKey) {
    state.dropped_before_bootstrap += 1;
    log::debug!("[ENGINE] mirror not loaded yet, ignoring event for {}", key);
}
