use crate::domain::{PostKey, PostRecord};
use crate::ledger::ProgramEvent;

/// What the caller should do with a freshly read post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchIntent {
    /// Insert at the front (a creation).
    Prepend,
    /// Overwrite the entry with the same key, if there is one.
    Replace,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Result of a bulk read. Replaces the mirror wholesale.
    Bootstrapped(Vec<PostRecord>),
    Notification(ProgramEvent),
    PostFetched { intent: FetchIntent, post: PostRecord },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    FetchPost { key: PostKey, intent: FetchIntent },
}
