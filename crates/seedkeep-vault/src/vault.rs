//! The seed phrase vault: envelope encryption over an [`EncryptedStorage`].
//!
//! ```text
//! passphrase ─┐
//!       salt ─┴─► PBKDF2 ─► UserKey ─► wraps ─► SEK ─► encrypts ─► mnemonic
//!                                               │
//!                         biometric slot ◄──────┘ (raw copy, optional)
//! ```
//!
//! One salt and one SEK per vault, shared by every seed source it holds.
//! Enabling biometrics stores a second copy of the SEK and never touches the
//! seed phrase blobs.

use std::collections::BTreeMap;

use seedkeep_crypto_core::encoding;
use seedkeep_crypto_core::{CryptoProvider, KeySourceId, SecretBytes, SeedPhrase};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::keys::StorageKeys;
use crate::storage::EncryptedStorage;

/// Vault salt length in bytes.
pub const SALT_LEN: usize = 32;

/// Seed encryption key length in bytes.
pub const SEK_LEN: usize = 32;

/// Lifecycle state of one seed source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    /// Nothing stored for this source.
    Uninitialized,
    /// Recoverable with the passphrase only.
    PassphraseOnly,
    /// Recoverable with the passphrase or the biometric gate.
    BiometricEnabled,
}

/// Mnemonic custody for one wallet.
///
/// Mutating operations take `&mut self`; callers serialize access, and one
/// instance per backend is assumed.
pub struct SeedPhraseVault<S> {
    storage: S,
    provider: CryptoProvider,
    keys: StorageKeys,
    salt: Option<[u8; SALT_LEN]>,
}

impl<S: EncryptedStorage> SeedPhraseVault<S> {
    /// Bind to `storage` and load the salt, if the vault was set up before.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` for an invalid config, `VaultError::Storage`
    /// if the backend fails, or `VaultError::Crypto` for a corrupt salt.
    pub async fn open(storage: S, config: &VaultConfig) -> Result<Self, VaultError> {
        config.validate()?;
        let keys = StorageKeys::new(config.key_prefix.as_deref());
        let provider = CryptoProvider::with_performer(config.performer);

        let salt = match storage.get_item(&keys.salt(), None).await? {
            Some(encoded) => Some(decode_salt(&encoded)?),
            None => None,
        };
        debug!(
            performer = provider.performer_name(),
            initialized = salt.is_some(),
            "vault opened"
        );

        Ok(Self {
            storage,
            provider,
            keys,
            salt,
        })
    }

    /// The backing store.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Storage key resolver in use.
    pub const fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Whether a salt has been created and not reset.
    pub const fn is_initialized(&self) -> bool {
        self.salt.is_some()
    }

    /// Whether the biometric SEK copy exists. Does not prompt.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the backend fails.
    pub async fn is_biometrics_enabled(&self) -> Result<bool, VaultError> {
        Ok(self.storage.has_item(&self.keys.biometric_sek()).await?)
    }

    /// State of the seed source `id`. Does not prompt.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the backend fails.
    pub async fn status(&self, id: &KeySourceId) -> Result<VaultState, VaultError> {
        if self.salt.is_none() || !self.storage.has_item(&self.keys.seed_phrase(id)).await? {
            return Ok(VaultState::Uninitialized);
        }
        if self.is_biometrics_enabled().await? {
            Ok(VaultState::BiometricEnabled)
        } else {
            Ok(VaultState::PassphraseOnly)
        }
    }

    // ── Setup ───────────────────────────────────────────────────────

    /// Store `seed_phrase` under `passphrase` and return its id.
    ///
    /// The first call creates the salt and the SEK. Later calls must use the
    /// same passphrase: they unwrap the existing SEK and add one blob.
    ///
    /// # Errors
    ///
    /// - `VaultError::Validation` for an empty passphrase
    /// - `VaultError::AuthenticationFailure` if a later call uses a different
    ///   passphrase
    /// - `VaultError::PartialWriteFailure` naming the artifact that could not
    ///   be written; earlier writes of the same call are rolled back
    pub async fn setup(
        &mut self,
        passphrase: &str,
        seed_phrase: &SeedPhrase,
    ) -> Result<KeySourceId, VaultError> {
        if passphrase.is_empty() {
            return Err(VaultError::Validation("passphrase must not be empty".into()));
        }
        let id = seed_phrase.key_source_id()?;
        let blob_key = self.keys.seed_phrase(&id);

        if let Some(salt) = self.salt {
            let sek_key = self.keys.encrypted_sek();
            let wrapped = self.require(&sek_key).await?;
            let provider = self.provider.clone();
            let passphrase = secret_copy(passphrase);
            let phrase = seed_phrase.clone();
            let blob = run_blocking(move || {
                let sek = unwrap_sek(&provider, &passphrase, &salt, &wrapped, &sek_key)?;
                Ok(provider.encrypt_to_base64(phrase.expose().as_bytes(), sek.expose())?)
            })
            .await?;

            self.write_all(&[(blob_key, blob)]).await?;
            info!(key_source_id = %id, "seed source added");
            return Ok(id);
        }

        let salt: [u8; SALT_LEN] = encoding::random_array()?;
        let sek = SecretBytes::<SEK_LEN>::random()?;
        let provider = self.provider.clone();
        let passphrase = secret_copy(passphrase);
        let phrase = seed_phrase.clone();
        let (wrapped, blob) = run_blocking(move || {
            let user_key = provider.derive_key(&passphrase, &salt)?;
            let wrapped = provider.encrypt_to_base64(sek.expose(), user_key.expose())?;
            let blob = provider.encrypt_to_base64(phrase.expose().as_bytes(), sek.expose())?;
            Ok((wrapped, blob))
        })
        .await?;

        // A biometric copy left over from an incomplete reset would hold a
        // different SEK.
        let biometric_key = self.keys.biometric_sek();
        if let Err(e) = self.storage.remove_item(&biometric_key).await {
            warn!(artifact = %biometric_key, error = %e, "could not clear stale biometric slot");
        }

        self.write_all(&[
            (self.keys.salt(), encoding::bytes_to_base64(&salt)),
            (self.keys.encrypted_sek(), wrapped),
            (blob_key, blob),
        ])
        .await?;
        self.salt = Some(salt);
        info!(key_source_id = %id, "vault initialized");
        Ok(id)
    }

    /// Write `items` in order; on the first failure remove what this call
    /// already wrote and report the failing key.
    async fn write_all(&self, items: &[(String, String)]) -> Result<(), VaultError> {
        for (index, (key, value)) in items.iter().enumerate() {
            let reason = match self.storage.set_item(key, value, None).await {
                Ok(true) => continue,
                Ok(false) => "store declined the write".to_owned(),
                Err(e) => e.to_string(),
            };
            warn!(artifact = %key, %reason, "write failed, rolling back");
            for (written, _) in items.iter().take(index) {
                if let Err(e) = self.storage.remove_item(written).await {
                    warn!(artifact = %written, error = %e, "rollback failed");
                }
            }
            return Err(VaultError::PartialWriteFailure {
                artifact: key.clone(),
            });
        }
        Ok(())
    }

    // ── Biometrics ──────────────────────────────────────────────────

    /// Store a copy of the SEK behind the platform biometric gate.
    ///
    /// `prompt` is forwarded to the gate. Seed phrase blobs are untouched.
    ///
    /// # Errors
    ///
    /// - `VaultError::StorageMissing` if the vault was never set up
    /// - `VaultError::AuthenticationFailure` for a wrong passphrase
    /// - `VaultError::BiometricCancelled` / `BiometricUnavailable` from the gate
    /// - `VaultError::PartialWriteFailure` if the store declines the write
    pub async fn enable_biometrics(
        &mut self,
        passphrase: &str,
        prompt: &str,
    ) -> Result<(), VaultError> {
        let salt = self.loaded_salt()?;
        let sek_key = self.keys.encrypted_sek();
        let wrapped = self.require(&sek_key).await?;
        let provider = self.provider.clone();
        let passphrase = secret_copy(passphrase);
        let sek = run_blocking(move || unwrap_sek(&provider, &passphrase, &salt, &wrapped, &sek_key))
            .await?;

        let biometric_key = self.keys.biometric_sek();
        let encoded = Zeroizing::new(encoding::bytes_to_base64(sek.expose()));
        if !self
            .storage
            .set_item(&biometric_key, &encoded, Some(prompt))
            .await?
        {
            return Err(VaultError::PartialWriteFailure {
                artifact: biometric_key,
            });
        }
        info!("biometric unlock enabled");
        Ok(())
    }

    /// Remove the biometric SEK copy. Passphrase recovery is unaffected.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the backend fails.
    pub async fn disable_biometrics(&mut self) -> Result<(), VaultError> {
        self.storage
            .remove_item(&self.keys.biometric_sek())
            .await?;
        info!("biometric unlock disabled");
        Ok(())
    }

    // ── Recovery ────────────────────────────────────────────────────

    /// Decrypt the seed phrases `ids` with the passphrase.
    ///
    /// The user key is derived and the SEK unwrapped once for the batch. Any
    /// failure aborts the whole batch.
    ///
    /// # Errors
    ///
    /// - `VaultError::StorageMissing` naming the first absent item
    /// - `VaultError::AuthenticationFailure` naming the item that failed to
    ///   open (a wrong passphrase names the wrapped SEK)
    pub async fn get_seed_phrases_with_passphrase(
        &self,
        passphrase: &str,
        ids: &[KeySourceId],
    ) -> Result<BTreeMap<KeySourceId, SeedPhrase>, VaultError> {
        let salt = self.loaded_salt()?;
        let sek_key = self.keys.encrypted_sek();
        let wrapped = self.require(&sek_key).await?;
        let blobs = self.load_blobs(ids).await?;

        let provider = self.provider.clone();
        let passphrase = secret_copy(passphrase);
        let phrases = run_blocking(move || {
            let sek = unwrap_sek(&provider, &passphrase, &salt, &wrapped, &sek_key)?;
            open_blobs(&provider, &sek, blobs)
        })
        .await?;

        debug!(count = phrases.len(), "seed phrases recovered with passphrase");
        Ok(phrases)
    }

    /// Decrypt the seed phrases `ids` with the SEK from the biometric slot.
    ///
    /// `prompt` is forwarded to the platform gate.
    ///
    /// # Errors
    ///
    /// - `VaultError::StorageMissing` if the vault was never set up (or was
    ///   reset), or naming an absent blob
    /// - `VaultError::BiometricUnavailable` if biometrics are not enabled or
    ///   the gate cannot run
    /// - `VaultError::BiometricCancelled` if the user dismissed the prompt
    /// - `VaultError::AuthenticationFailure` naming a blob that failed to open
    pub async fn get_seed_phrases_with_biometrics(
        &self,
        prompt: &str,
        ids: &[KeySourceId],
    ) -> Result<BTreeMap<KeySourceId, SeedPhrase>, VaultError> {
        self.loaded_salt()?;
        let biometric_key = self.keys.biometric_sek();
        let encoded = match self.storage.get_item(&biometric_key, Some(prompt)).await {
            Ok(Some(encoded)) => Zeroizing::new(encoded),
            Ok(None) => {
                return Err(VaultError::BiometricUnavailable(
                    "biometric unlock is not enabled".into(),
                ))
            }
            Err(e) => {
                debug!(error = %e, "biometric read refused");
                return Err(e.into());
            }
        };
        let raw = Zeroizing::new(encoding::base64_to_bytes(&encoded)?);
        let sek = SecretBytes::<SEK_LEN>::from_slice(&raw)?;
        let blobs = self.load_blobs(ids).await?;

        let provider = self.provider.clone();
        let phrases = run_blocking(move || open_blobs(&provider, &sek, blobs)).await?;

        debug!(count = phrases.len(), "seed phrases recovered with biometrics");
        Ok(phrases)
    }

    // ── Reset ───────────────────────────────────────────────────────

    /// Delete the salt, both SEK copies and the blobs of `ids`.
    ///
    /// Every deletion is attempted even after a failure.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::PartialResetFailure` listing the keys that could
    /// not be deleted.
    pub async fn reset(&mut self, ids: &[KeySourceId]) -> Result<(), VaultError> {
        let salt_key = self.keys.salt();
        let mut targets = vec![
            salt_key.clone(),
            self.keys.encrypted_sek(),
            self.keys.biometric_sek(),
        ];
        targets.extend(ids.iter().map(|id| self.keys.seed_phrase(id)));

        let mut remaining = Vec::new();
        for key in targets {
            if let Err(e) = self.storage.remove_item(&key).await {
                warn!(artifact = %key, error = %e, "reset could not delete item");
                remaining.push(key);
            }
        }

        if !remaining.contains(&salt_key) {
            self.salt = None;
        }
        if remaining.is_empty() {
            info!(sources = ids.len(), "vault reset");
            Ok(())
        } else {
            Err(VaultError::PartialResetFailure { remaining })
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn loaded_salt(&self) -> Result<[u8; SALT_LEN], VaultError> {
        self.salt.ok_or_else(|| VaultError::StorageMissing {
            key: self.keys.salt(),
        })
    }

    async fn require(&self, key: &str) -> Result<String, VaultError> {
        self.storage
            .get_item(key, None)
            .await?
            .ok_or_else(|| VaultError::StorageMissing {
                key: key.to_owned(),
            })
    }

    async fn load_blobs(&self, ids: &[KeySourceId]) -> Result<Vec<StoredBlob>, VaultError> {
        let mut blobs = Vec::with_capacity(ids.len());
        for id in ids {
            let key = self.keys.seed_phrase(id);
            let encoded = self.require(&key).await?;
            blobs.push(StoredBlob {
                id: id.clone(),
                key,
                encoded,
            });
        }
        Ok(blobs)
    }
}

struct StoredBlob {
    id: KeySourceId,
    key: String,
    encoded: String,
}

fn secret_copy(passphrase: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(passphrase.as_bytes().to_vec())
}

fn decode_salt(encoded: &str) -> Result<[u8; SALT_LEN], VaultError> {
    let bytes = encoding::base64_to_bytes(encoded)?;
    bytes.as_slice().try_into().map_err(|_| {
        VaultError::Storage(format!(
            "stored salt has {} bytes, expected {SALT_LEN}",
            bytes.len()
        ))
    })
}

fn unwrap_sek(
    provider: &CryptoProvider,
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    wrapped: &str,
    sek_key: &str,
) -> Result<SecretBytes<SEK_LEN>, VaultError> {
    let user_key = provider.derive_key(passphrase, salt)?;
    provider
        .unwrap_key(wrapped, user_key.expose())
        .map_err(VaultError::opening(sek_key))
}

fn open_blobs(
    provider: &CryptoProvider,
    sek: &SecretBytes<SEK_LEN>,
    blobs: Vec<StoredBlob>,
) -> Result<BTreeMap<KeySourceId, SeedPhrase>, VaultError> {
    let mut phrases = BTreeMap::new();
    for blob in blobs {
        let plaintext = provider
            .decrypt_string(&blob.encoded, sek.expose())
            .map_err(VaultError::opening(&blob.key))?;
        let phrase = SeedPhrase::parse(&plaintext)?;
        // Blobs carry no AAD; a blob moved under another id still opens.
        if phrase.key_source_id()? != blob.id {
            return Err(VaultError::AuthenticationFailure { key: blob.key });
        }
        phrases.insert(blob.id, phrase);
    }
    Ok(phrases)
}

async fn run_blocking<T, F>(f: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, WriteFailure};

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
abandon abandon abandon art";

    async fn vault() -> SeedPhraseVault<MemoryStorage> {
        SeedPhraseVault::open(MemoryStorage::new(), &VaultConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_vault_is_uninitialized() {
        let vault = vault().await;
        assert!(!vault.is_initialized());
        let id = SeedPhrase::parse(PHRASE).unwrap().key_source_id().unwrap();
        assert_eq!(vault.status(&id).await.unwrap(), VaultState::Uninitialized);
        assert!(matches!(
            vault.get_seed_phrases_with_passphrase("pw", &[id]).await,
            Err(VaultError::StorageMissing { ref key }) if key == "salt"
        ));
    }

    #[tokio::test]
    async fn setup_writes_exactly_three_artifacts() {
        let mut vault = vault().await;
        let phrase = SeedPhrase::parse(PHRASE).unwrap();
        let id = vault.setup("pw", &phrase).await.unwrap();
        let mut expected = vec![
            "encrypted_seed_phrase_encryption_key".to_owned(),
            format!("encrypted_seed_phrase.{id}"),
            "salt".to_owned(),
        ];
        expected.sort();
        assert_eq!(vault.storage().keys(), expected);
        assert_eq!(vault.status(&id).await.unwrap(), VaultState::PassphraseOnly);

        let stored_salt = vault.storage().raw_value("salt").unwrap();
        assert_eq!(encoding::base64_to_bytes(&stored_salt).unwrap().len(), SALT_LEN);
    }

    #[tokio::test]
    async fn empty_passphrase_is_rejected() {
        let mut vault = vault().await;
        let phrase = SeedPhrase::parse(PHRASE).unwrap();
        assert!(matches!(
            vault.setup("", &phrase).await,
            Err(VaultError::Validation(_))
        ));
        assert!(vault.storage().keys().is_empty());
    }

    #[tokio::test]
    async fn rejected_write_rolls_back() {
        let storage = MemoryStorage::new();
        storage.fail_writes_to("encrypted_seed_phrase_encryption_key", WriteFailure::Rejected);
        let mut vault = SeedPhraseVault::open(storage, &VaultConfig::default())
            .await
            .unwrap();
        let phrase = SeedPhrase::parse(PHRASE).unwrap();
        let err = vault.setup("pw", &phrase).await.unwrap_err();
        assert!(matches!(
            err,
            VaultError::PartialWriteFailure { ref artifact }
                if artifact == "encrypted_seed_phrase_encryption_key"
        ));
        assert!(vault.storage().keys().is_empty());
        assert!(!vault.is_initialized());
    }

    #[tokio::test]
    async fn open_loads_existing_salt() {
        let storage = MemoryStorage::new();
        let mut first = SeedPhraseVault::open(storage.clone(), &VaultConfig::default())
            .await
            .unwrap();
        let phrase = SeedPhrase::parse(PHRASE).unwrap();
        let id = first.setup("pw", &phrase).await.unwrap();

        let second = SeedPhraseVault::open(storage, &VaultConfig::default())
            .await
            .unwrap();
        assert!(second.is_initialized());
        let recovered = second
            .get_seed_phrases_with_passphrase("pw", &[id.clone()])
            .await
            .unwrap();
        assert_eq!(recovered[&id].expose(), PHRASE);
    }

    #[tokio::test]
    async fn corrupt_salt_fails_open() {
        let storage = MemoryStorage::new();
        storage.set_item("salt", "AAAA", None).await.unwrap();
        assert!(matches!(
            SeedPhraseVault::open(storage, &VaultConfig::default()).await,
            Err(VaultError::Storage(_))
        ));
    }
}
