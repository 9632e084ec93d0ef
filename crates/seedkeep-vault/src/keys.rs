//! Logical storage keys.
//!
//! ```text
//! salt                                    plain base64, 32 bytes
//! encrypted_seed_phrase_encryption_key    SEK wrapped under the user key
//! keychain_seed_phrase_encryption_key     raw SEK behind the biometric gate
//! encrypted_seed_phrase.<KeySourceId>     mnemonic under the SEK
//! ```
//!
//! With a configured prefix every key becomes `<prefix>.<key>`.

use seedkeep_crypto_core::KeySourceId;

pub const SALT: &str = "salt";
pub const ENCRYPTED_SEK: &str = "encrypted_seed_phrase_encryption_key";
pub const BIOMETRIC_SEK: &str = "keychain_seed_phrase_encryption_key";
pub const SEED_PHRASE_PREFIX: &str = "encrypted_seed_phrase";

/// Resolves logical keys to backend keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: Option<String>,
}

impl StorageKeys {
    #[must_use]
    pub fn new(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_owned),
        }
    }

    fn resolve(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_owned(),
        }
    }

    #[must_use]
    pub fn salt(&self) -> String {
        self.resolve(SALT)
    }

    #[must_use]
    pub fn encrypted_sek(&self) -> String {
        self.resolve(ENCRYPTED_SEK)
    }

    #[must_use]
    pub fn biometric_sek(&self) -> String {
        self.resolve(BIOMETRIC_SEK)
    }

    #[must_use]
    pub fn seed_phrase(&self, id: &KeySourceId) -> String {
        self.resolve(&format!("{SEED_PHRASE_PREFIX}.{id}"))
    }
}
