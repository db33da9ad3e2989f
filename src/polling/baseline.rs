// Full reads: the collection bootstrap and the user account fetch.

use std::time::{Duration, Instant};

use crate::domain::{AddressDeriver, PostRecord, Pubkey, UserAccount};
use crate::error::LedgerResult;
use crate::ledger::ProgramClient;

#[derive(Debug, Clone, Copy)]
pub struct BootstrapStats {
    pub total_time: Duration,
    pub posts: usize,
}

/// Reads every post account in one go.
pub async fn bootstrap_posts(
    client: &dyn ProgramClient,
) -> LedgerResult<(Vec<PostRecord>, BootstrapStats)> {
    log::info!("[BOOTSTRAP] Loading post collection...");
    let start = Instant::now();

    let posts = client.fetch_all_posts().await?;

    let stats = BootstrapStats { total_time: start.elapsed(), posts: posts.len() };
    log::info!(
        "[BOOTSTRAP] {} posts loaded in {:?}",
        stats.posts,
        stats.total_time
    );
    Ok((posts, stats))
}

/// Reads the account of `identity`.
///
/// Every failure, including "no identity", collapses into `None`.
pub async fn load_user_account(
    client: &dyn ProgramClient,
    deriver: &dyn AddressDeriver,
    identity: Option<Pubkey>,
) -> Option<UserAccount> {
    let Some(owner) = identity else {
        log::debug!("[BOOTSTRAP] no identity, no user account");
        return None;
    };

    match read_user(client, deriver, &owner).await {
        Ok(account) => {
            log::debug!(
                "[BOOTSTRAP] user account for {} (last post #{})",
                owner.short(),
                account.last_post_id
            );
            Some(account)
        }
        Err(err) => {
            log::warn!("[BOOTSTRAP] no user account for {}: {}", owner.short(), err);
            None
        }
    }
}

async fn read_user(
    client: &dyn ProgramClient,
    deriver: &dyn AddressDeriver,
    owner: &Pubkey,
) -> LedgerResult<UserAccount> {
    let address = deriver.user_address(owner).await?;
    client.fetch_user(&address).await
}
