use thiserror::Error;

use crate::domain::Pubkey;

/// Failures reported by the ledger collaborators.
///
/// The synchronizer never hands these to the presentation layer; they end up in
/// logs, in the notification sink, or as an absent cache entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("transport error: {0}")]
    Transport(String),

    /// The account exists but holds a different layout.
    #[error("failed to decode account {address}: {reason}")]
    Decode { address: Pubkey, reason: String },

    /// The program refused the instruction (a failed assertion on-chain).
    #[error("{0}")]
    Rejected(String),

    #[error("missing signature for {0}")]
    MissingSigner(Pubkey),

    #[error("handle has no signing identity")]
    ReadOnly,

    #[error("transaction {0} was not confirmed")]
    Unconfirmed(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
