use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Token file name in the data directory
const TOKENS_FILE: &str = "tokens.json";

/// Token pair as persisted on disk. Both keys are written and cleared
/// together; a file holding only one of them never exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Durable storage for the credential pair, backed by a JSON file.
///
/// A stored value is never trusted on its own: it may have been written
/// and never confirmed against the backend, so callers must treat a
/// loaded token as a candidate to validate, not proof of a session.
pub struct TokenStore {
    data_dir: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Read the stored token pair. A missing, unreadable, or corrupt
    /// file reads as "no stored credential".
    pub fn load(&self) -> Option<StoredTokens> {
        let path = self.tokens_path();
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "Failed to read token file");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(tokens) => Some(tokens),
            Err(err) => {
                warn!(error = %err, "Token file is corrupt, ignoring it");
                None
            }
        }
    }

    /// Persist the token pair, creating the data directory if needed
    pub fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let path = self.tokens_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write token file: {}", path.display()))?;
        Ok(())
    }

    /// Remove the stored tokens. Idempotent: clearing an empty store succeeds.
    pub fn clear(&self) -> Result<()> {
        let path = self.tokens_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove token file: {}", path.display()))?;
        }
        Ok(())
    }

    fn tokens_path(&self) -> PathBuf {
        self.data_dir.join(TOKENS_FILE)
    }
}
