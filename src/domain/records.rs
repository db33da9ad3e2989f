//! Account layouts owned by the ledger program.
//!
//! All of these are plain values: the mirror copies them out of the ledger and
//! never shares them with it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::pubkey::Pubkey;

/// Longest title the program accepts, in bytes.
pub const MAX_TITLE_LEN: usize = 128;

/// Longest image reference the program accepts, in bytes.
pub const MAX_IMAGE_LEN: usize = 256;

/// Per-identity profile. Holds the counter used to number that identity's posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub owner: Pubkey,
    pub last_post_id: u64,
}

impl UserAccount {
    /// Id the next post from this owner must carry. `None` once the counter is exhausted.
    pub fn next_post_id(&self) -> Option<u64> {
        self.last_post_id.checked_add(1)
    }
}

/// Identity of a post: `(owner, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostKey {
    pub owner: Pubkey,
    pub id: u64,
}

impl PostKey {
    pub fn new(owner: Pubkey, id: u64) -> Self {
        Self { owner, id }
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner.short(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub owner: Pubkey,
    pub id: u64,
    pub title: String,
    pub image: String,
    pub likes: u64,
}

impl PostRecord {
    pub fn key(&self) -> PostKey {
        PostKey::new(self.owner, self.id)
    }

    pub fn matches(&self, key: &PostKey) -> bool {
        self.owner == key.owner && self.id == key.id
    }
}

/// One identity's like on one post. Only its effect on `PostRecord::likes` is mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRecord {
    pub post_owner: Pubkey,
    pub post_id: u64,
    pub liker: Pubkey,
}
