use std::fmt;
use std::future::Future;

use crate::domain::{Pubkey, UserAccount};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Instruction, Signature};
use crate::session::{SessionHandle, Synchronizer};

/// The six write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateUser,
    CreatePost,
    UpdatePost,
    DeletePost,
    LikePost,
    DislikePost,
}

impl Mutation {
    fn success_message(self) -> &'static str {
        match self {
            Mutation::CreateUser => "created user",
            Mutation::CreatePost => "post created",
            Mutation::UpdatePost => "updated",
            Mutation::DeletePost => "deleted post",
            Mutation::LikePost => "liked",
            Mutation::DislikePost => "disliked",
        }
    }

    /// Creations wait for confirmation so the counter refresh reads settled state.
    fn always_confirms(self) -> bool {
        matches!(self, Mutation::CreateUser | Mutation::CreatePost)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutation::CreateUser => "create_user",
            Mutation::CreatePost => "create_post",
            Mutation::UpdatePost => "update_post",
            Mutation::DeletePost => "delete_post",
            Mutation::LikePost => "like_post",
            Mutation::DislikePost => "dislike_post",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Preconditions unmet (no handle, no identity or no user account). Nothing was sent.
    Skipped,
    Succeeded(Signature),
    /// Carries the message handed to the notification sink.
    Failed(String),
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Succeeded(_))
    }
}

impl Synchronizer {
    /// Creates the account of the connected identity.
    pub async fn create_user(&self) -> MutationOutcome {
        let Some((handle, owner)) = self.signing_handle() else {
            return not_ready(Mutation::CreateUser);
        };

        let outcome = self
            .commit(&handle, Mutation::CreateUser, async {
                let user = self.deriver.user_address(&owner).await?;
                Ok(Instruction::CreateUser { user, owner })
            })
            .await;

        if outcome.is_success() {
            self.fetch_user_account().await;
        }
        outcome
    }

    /// Publishes a post numbered `last_post_id + 1` from the cached user account.
    /// A counter at `u64::MAX` fails without sending anything.
    ///
    /// Two calls that read the same counter compute the same id; the ledger then
    /// refuses the second. Set `serialize_post_creation` to queue them instead.
    pub async fn create_post(&self, title: &str, image: &str) -> MutationOutcome {
        let _serial = if self.config.serialize_post_creation {
            Some(self.post_creation.lock().await)
        } else {
            None
        };

        let Some((handle, account)) = self.loaded() else {
            return not_ready(Mutation::CreatePost);
        };
        let Some(owner) = handle.identity() else {
            return not_ready(Mutation::CreatePost);
        };

        let outcome = self
            .commit(&handle, Mutation::CreatePost, async {
                let post_id = account.next_post_id().ok_or_else(|| {
                    LedgerError::Rejected(format!("post counter of {} exhausted", owner.short()))
                })?;
                log::debug!("[MUTATION] create_post as {}#{}", owner.short(), post_id);
                let post = self.deriver.post_address(&owner, post_id).await?;
                let user = self.deriver.user_address(&owner).await?;
                Ok(Instruction::CreatePost {
                    post,
                    user,
                    owner,
                    title: title.to_string(),
                    image: image.to_string(),
                    post_id,
                })
            })
            .await;

        if outcome.is_success() {
            self.fetch_user_account().await;
        }
        outcome
    }

    pub async fn update_post(&self, owner: Pubkey, id: u64, title: &str) -> MutationOutcome {
        let Some((handle, _)) = self.loaded() else {
            return not_ready(Mutation::UpdatePost);
        };

        self.commit(&handle, Mutation::UpdatePost, async {
            let post = self.deriver.post_address(&owner, id).await?;
            Ok(Instruction::UpdatePost { post, owner, title: title.to_string() })
        })
        .await
    }

    pub async fn delete_post(&self, owner: Pubkey, id: u64) -> MutationOutcome {
        let Some((handle, _)) = self.loaded() else {
            return not_ready(Mutation::DeletePost);
        };

        self.commit(&handle, Mutation::DeletePost, async {
            let post = self.deriver.post_address(&owner, id).await?;
            Ok(Instruction::DeletePost { post, owner })
        })
        .await
    }

    /// Likes `(owner, id)`. The like account is derived from `liker`; the
    /// transaction is signed by the session identity.
    pub async fn like_post(&self, owner: Pubkey, id: u64, liker: Pubkey) -> MutationOutcome {
        let Some((handle, _)) = self.loaded() else {
            return not_ready(Mutation::LikePost);
        };
        let Some(signer) = handle.identity() else {
            return not_ready(Mutation::LikePost);
        };

        self.commit(&handle, Mutation::LikePost, async {
            let like = self.deriver.like_address(&owner, id, &liker).await?;
            let post = self.deriver.post_address(&owner, id).await?;
            let user = self.deriver.user_address(&signer).await?;
            Ok(Instruction::LikePost { like, post, user, liker: signer })
        })
        .await
    }

    pub async fn dislike_post(
        &self,
        owner: Pubkey,
        id: u64,
        disliker: Pubkey,
    ) -> MutationOutcome {
        let Some((handle, _)) = self.loaded() else {
            return not_ready(Mutation::DislikePost);
        };
        let Some(signer) = handle.identity() else {
            return not_ready(Mutation::DislikePost);
        };

        self.commit(&handle, Mutation::DislikePost, async {
            let like = self.deriver.like_address(&owner, id, &disliker).await?;
            let post = self.deriver.post_address(&owner, id).await?;
            Ok(Instruction::DislikePost { like, post, disliker: signer })
        })
        .await
    }

    fn signing_handle(&self) -> Option<(SessionHandle, Pubkey)> {
        let handle = self.handle.clone()?;
        let identity = handle.identity()?;
        Some((handle, identity))
    }

    /// Handle plus the user account as cached right now.
    fn loaded(&self) -> Option<(SessionHandle, UserAccount)> {
        let handle = self.handle.clone()?;
        let account = self.shared.lock().user_account.clone()?;
        Some((handle, account))
    }

    async fn commit(
        &self,
        handle: &SessionHandle,
        mutation: Mutation,
        instruction: impl Future<Output = LedgerResult<Instruction>>,
    ) -> MutationOutcome {
        match self.send(handle, mutation, instruction).await {
            Ok(signature) => {
                log::info!("[MUTATION] {} landed as {}", mutation, signature);
                self.notifier.notify_success(mutation.success_message());
                MutationOutcome::Succeeded(signature)
            }
            Err(err) => {
                let message = err.to_string();
                log::warn!("[MUTATION] {} failed: {}", mutation, message);
                self.notifier.notify_failure(&message);
                MutationOutcome::Failed(message)
            }
        }
    }

    async fn send(
        &self,
        handle: &SessionHandle,
        mutation: Mutation,
        instruction: impl Future<Output = LedgerResult<Instruction>>,
    ) -> LedgerResult<Signature> {
        let instruction = instruction.await?;
        let signature = handle.client().submit(instruction).await?;
        if mutation.always_confirms() || self.config.confirm_all_mutations {
            handle.client().confirm(&signature).await?;
        }
        Ok(signature)
    }
}

fn not_ready(mutation: Mutation) -> MutationOutcome {
    log::debug!("[MUTATION] {} skipped: session not ready", mutation);
    MutationOutcome::Skipped
}
