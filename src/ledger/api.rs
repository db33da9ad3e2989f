use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::{PostKey, PostRecord, Pubkey, UserAccount};
use crate::error::LedgerResult;

/// Where the program lives. Opaque to the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub endpoint: String,
}

impl Connection {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

/// Transaction signature returned by `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub String);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Program instructions together with the accounts each one touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    CreateUser {
        user: Pubkey,
        owner: Pubkey,
    },
    CreatePost {
        post: Pubkey,
        user: Pubkey,
        owner: Pubkey,
        title: String,
        image: String,
        post_id: u64,
    },
    UpdatePost {
        post: Pubkey,
        owner: Pubkey,
        title: String,
    },
    DeletePost {
        post: Pubkey,
        owner: Pubkey,
    },
    LikePost {
        like: Pubkey,
        post: Pubkey,
        user: Pubkey,
        liker: Pubkey,
    },
    DislikePost {
        like: Pubkey,
        post: Pubkey,
        disliker: Pubkey,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::CreateUser { .. } => "create_user",
            Instruction::CreatePost { .. } => "create_post",
            Instruction::UpdatePost { .. } => "update_post",
            Instruction::DeletePost { .. } => "delete_post",
            Instruction::LikePost { .. } => "like_post",
            Instruction::DislikePost { .. } => "dislike_post",
        }
    }

    /// The account that has to sign the transaction.
    pub fn signer(&self) -> Pubkey {
        match self {
            Instruction::CreateUser { owner, .. }
            | Instruction::CreatePost { owner, .. }
            | Instruction::UpdatePost { owner, .. }
            | Instruction::DeletePost { owner, .. } => *owner,
            Instruction::LikePost { liker, .. } => *liker,
            Instruction::DislikePost { disliker, .. } => *disliker,
        }
    }
}

/// Notifications emitted by the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramEvent {
    Created { owner: Pubkey, id: u64 },
    Updated { owner: Pubkey, id: u64 },
    Deleted { owner: Pubkey, id: u64 },
    LikeChanged { owner: Pubkey, id: u64, likes: u64 },
}

impl ProgramEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProgramEvent::Created { .. } => EventKind::Created,
            ProgramEvent::Updated { .. } => EventKind::Updated,
            ProgramEvent::Deleted { .. } => EventKind::Deleted,
            ProgramEvent::LikeChanged { .. } => EventKind::LikeChanged,
        }
    }

    pub fn key(&self) -> PostKey {
        match *self {
            ProgramEvent::Created { owner, id }
            | ProgramEvent::Updated { owner, id }
            | ProgramEvent::Deleted { owner, id }
            | ProgramEvent::LikeChanged { owner, id, .. } => PostKey::new(owner, id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    LikeChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Created,
        EventKind::Updated,
        EventKind::Deleted,
        EventKind::LikeChanged,
    ];

    /// Event name as the program declares it.
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::Created => "NewPostEvent",
            EventKind::Updated => "UpdatePostEvent",
            EventKind::Deleted => "DeletePostEvent",
            EventKind::LikeChanged => "LikeDislikePostEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A live event listener. The stream ends once the client unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub kind: EventKind,
    pub events: mpsc::UnboundedReceiver<ProgramEvent>,
}

/// Handle to the ledger program, bound to one connection and optionally one signer.
#[async_trait]
pub trait ProgramClient: Send + Sync {
    /// Identity transactions are signed with. `None` for read-only handles.
    fn signer(&self) -> Option<Pubkey>;

    async fn fetch_user(&self, address: &Pubkey) -> LedgerResult<UserAccount>;

    async fn fetch_post(&self, address: &Pubkey) -> LedgerResult<PostRecord>;

    /// Bulk read of every post account, any owner.
    async fn fetch_all_posts(&self) -> LedgerResult<Vec<PostRecord>>;

    async fn submit(&self, instruction: Instruction) -> LedgerResult<Signature>;

    async fn confirm(&self, signature: &Signature) -> LedgerResult<()>;

    fn subscribe(&self, kind: EventKind) -> LedgerResult<Subscription>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Builds program handles for a `(connection, identity)` pair.
pub trait ProgramConnector: Send + Sync {
    fn connect(&self, connection: &Connection, identity: Option<Pubkey>)
        -> Arc<dyn ProgramClient>;
}
