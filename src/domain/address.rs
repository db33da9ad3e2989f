//! Deterministic program account addresses.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::pubkey::Pubkey;
use crate::error::LedgerResult;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Computes the account addresses the program expects for users, posts and likes.
///
/// Implementations must be side-effect free; the async signature only leaves
/// room for lookups that suspend.
#[async_trait]
pub trait AddressDeriver: Send + Sync {
    async fn user_address(&self, owner: &Pubkey) -> LedgerResult<Pubkey>;

    async fn post_address(&self, owner: &Pubkey, id: u64) -> LedgerResult<Pubkey>;

    async fn like_address(&self, owner: &Pubkey, id: u64, liker: &Pubkey)
        -> LedgerResult<Pubkey>;
}

/// Seed-hash derivation bound to one program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedAddressDeriver {
    program_id: Pubkey,
}

impl SeedAddressDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn derive(&self, seeds: &[&[u8]]) -> Pubkey {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update(self.program_id.as_bytes());
        hasher.update(PDA_MARKER);
        Pubkey::new(hasher.finalize().into())
    }

    pub fn user(&self, owner: &Pubkey) -> Pubkey {
        self.derive(&[b"user", owner.as_bytes()])
    }

    pub fn post(&self, owner: &Pubkey, id: u64) -> Pubkey {
        self.derive(&[b"post", owner.as_bytes(), &id.to_le_bytes()])
    }

    pub fn like(&self, owner: &Pubkey, id: u64, liker: &Pubkey) -> Pubkey {
        self.derive(&[b"like", owner.as_bytes(), &id.to_le_bytes(), liker.as_bytes()])
    }
}

#[async_trait]
impl AddressDeriver for SeedAddressDeriver {
    async fn user_address(&self, owner: &Pubkey) -> LedgerResult<Pubkey> {
        Ok(self.user(owner))
    }

    async fn post_address(&self, owner: &Pubkey, id: u64) -> LedgerResult<Pubkey> {
        Ok(self.post(owner, id))
    }

    async fn like_address(
        &self,
        owner: &Pubkey,
        id: u64,
        liker: &Pubkey,
    ) -> LedgerResult<Pubkey> {
        Ok(self.like(owner, id, liker))
    }
}
