use std::fmt;
use std::sync::Arc;

use crate::domain::Pubkey;
use crate::ledger::{Connection, ProgramClient, ProgramConnector};

/// A program client bound to one `(connection, identity)` pair and one generation.
#[derive(Clone)]
pub struct SessionHandle {
    client: Arc<dyn ProgramClient>,
    generation: u64,
}

impl SessionHandle {
    /// No connection, no handle. A missing identity still yields a read-only handle.
    pub fn build(
        connector: &dyn ProgramConnector,
        connection: Option<&Connection>,
        identity: Option<Pubkey>,
        generation: u64,
    ) -> Option<Self> {
        let connection = connection?;
        let client = connector.connect(connection, identity);
        if client.signer() != identity {
            log::warn!("[SESSION] connector bound {:?}, wanted {:?}", client.signer(), identity);
        }
        log::info!(
            "[SESSION] handle built for {} ({}, generation {})",
            connection.endpoint,
            client.signer().map_or_else(|| "read-only".to_string(), |id| id.short()),
            generation
        );
        Some(Self { client, generation })
    }

    pub fn client(&self) -> &Arc<dyn ProgramClient> {
        &self.client
    }

    /// The signer the client was bound to.
    pub fn identity(&self) -> Option<Pubkey> {
        self.client.signer()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("identity", &self.client.signer())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
