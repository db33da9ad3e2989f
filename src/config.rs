use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Pubkey;
use crate::ledger::Connection;

pub const DEFAULT_PROGRAM_ID: Pubkey = Pubkey::new(*b"post-ledger-mirror-program-00001");
pub const DEFAULT_ENDPOINT: &str = "memory://local";

/// Runtime settings for a [`Synchronizer`](crate::session::Synchronizer).
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub program_id: Pubkey,

    pub endpoint: String,

    /// Also wait for confirmation after update, delete, like and dislike.
    /// Creations always wait.
    pub confirm_all_mutations: bool,

    /// Run `create_post` calls one at a time so each reads the counter the
    /// previous one left behind.
    pub serialize_post_creation: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            confirm_all_mutations: false,
            serialize_post_creation: false,
        }
    }
}

impl SyncConfig {
    /// Loads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("[CONFIG] loaded {}", path.display());
        Ok(config)
    }

    pub fn connection(&self) -> Connection {
        Connection::new(self.endpoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{ "serialize_post_creation": true }"#).unwrap();

        assert!(config.serialize_post_creation);
        assert!(!config.confirm_all_mutations);
        assert_eq!(config.program_id, DEFAULT_PROGRAM_ID);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SyncConfig::load(Path::new("/nonexistent/sync.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn load_reads_json_from_disk() {
        let mut path = std::env::temp_dir();
        path.push(format!("post_ledger_mirror_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "endpoint": "memory://disk", "confirm_all_mutations": true }"#)
            .unwrap();

        let config = SyncConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.endpoint, "memory://disk");
        assert!(config.confirm_all_mutations);
    }
}
