//! Vault configuration, loaded from JSON.
//!
//! ```json
//! { "performer": "ring", "key_prefix": "main", "log_filter": "seedkeep_vault=debug" }
//! ```
//!
//! Every field is optional.

use std::path::Path;

use seedkeep_crypto_core::PerformerKind;
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "seedkeep_vault=info";

/// Composition-time settings for a [`crate::SeedPhraseVault`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// PBKDF2 implementation backing the crypto provider.
    pub performer: PerformerKind,
    /// Namespace for storage keys, so several vaults can share a backend.
    pub key_prefix: Option<String>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            performer: PerformerKind::default(),
            key_prefix: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl VaultConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` for malformed JSON, unknown fields or an
    /// invalid key prefix.
    pub fn from_json_str(json: &str) -> Result<Self, VaultError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` if the file cannot be read, otherwise see
    /// [`Self::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` if `key_prefix` is empty or contains
    /// whitespace.
    pub fn validate(&self) -> Result<(), VaultError> {
        if let Some(prefix) = &self.key_prefix {
            if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
                return Err(VaultError::Config(format!(
                    "invalid key_prefix {prefix:?}: must be non-empty without whitespace"
                )));
            }
        }
        Ok(())
    }
}
