use crate::domain::PostRecord;

#[derive(Debug, Default, Clone)]
pub struct EngineState {
    /// `None` until the first bulk read lands.
    pub posts: Option<Vec<PostRecord>>,

    /// Notifications that arrived before the mirror was initialized.
    pub dropped_before_bootstrap: u64,
}
