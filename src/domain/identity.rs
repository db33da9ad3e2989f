use crate::domain::pubkey::Pubkey;

/// Derives the `connected` flag from the presence of a signing identity.
#[derive(Debug, Default, Clone)]
pub struct IdentityTracker {
    connected: bool,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Feeds the current identity in.
    ///
    /// Returns the new flag when it changed, `None` otherwise.
    pub fn observe(&mut self, identity: Option<&Pubkey>) -> Option<bool> {
        let now = identity.is_some();
        if now == self.connected {
            return None;
        }
        self.connected = now;
        log::debug!("[IDENTITY] connected -> {}", now);
        Some(now)
    }
}
