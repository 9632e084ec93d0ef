//! The crypto provider: stretching plus authenticated encryption.
//!
//! ```text
//! key (passphrase or raw SEK) ──┐
//!                blob salt ─────┴─► PBKDF2-SHA512 ─► AEAD key ─► ChaCha20-Poly1305
//! ```
//!
//! The same primitive serves passphrase encryption and pure key wrapping: a
//! raw 32-byte SEK goes through the stretch exactly like a passphrase does.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::encoding;
use crate::error::CryptoError;
use crate::kdf::{self, PerformerKind, Pbkdf2Performer, DERIVED_KEY_LEN};
use crate::memory::{SecretBuffer, SecretBytes};
use crate::symmetric::{self, SealedBlob, BLOB_SALT_LEN, NONCE_LEN};

/// Stretching + AEAD with an injected PBKDF2 performer.
///
/// Cheap to clone; clones share the performer.
#[derive(Clone)]
pub struct CryptoProvider {
    performer: Arc<dyn Pbkdf2Performer>,
}

impl CryptoProvider {
    /// Provider backed by an explicit performer.
    #[must_use]
    pub fn new(performer: Arc<dyn Pbkdf2Performer>) -> Self {
        Self { performer }
    }

    /// Provider backed by the performer `kind` selects.
    #[must_use]
    pub fn with_performer(kind: PerformerKind) -> Self {
        Self::new(kind.build())
    }

    /// Name of the active performer.
    #[must_use]
    pub fn performer_name(&self) -> &'static str {
        self.performer.name()
    }

    /// `deriveKey`: PBKDF2-HMAC-SHA512, 200 000 iterations, 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDerivation` if `salt` is empty.
    pub fn derive_key(
        &self,
        passphrase: &[u8],
        salt: &[u8],
    ) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
        kdf::stretch(self.performer.as_ref(), passphrase, salt)
    }

    /// Encrypt under a key derived from `key` and a fresh blob salt.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails and
    /// `CryptoError::Encryption` if sealing fails.
    pub fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<SealedBlob, CryptoError> {
        let salt: [u8; BLOB_SALT_LEN] = encoding::random_array()?;
        let nonce: [u8; NONCE_LEN] = encoding::random_array()?;
        let derived = self.derive_key(key, &salt)?;
        let ciphertext_and_tag = symmetric::seal(plaintext, derived.expose(), nonce)?;
        Ok(SealedBlob {
            salt,
            nonce,
            ciphertext_and_tag,
        })
    }

    /// Re-derive the blob key and authenticate-decrypt.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decryption` on a wrong key or corrupted blob.
    pub fn decrypt(&self, blob: &SealedBlob, key: &[u8]) -> Result<SecretBuffer, CryptoError> {
        let derived = self.derive_key(key, &blob.salt)?;
        symmetric::open(&blob.ciphertext_and_tag, derived.expose(), blob.nonce)
    }

    /// [`Self::encrypt`] returning the base64 wire form.
    ///
    /// # Errors
    ///
    /// See [`Self::encrypt`].
    pub fn encrypt_to_base64(&self, plaintext: &[u8], key: &[u8]) -> Result<String, CryptoError> {
        Ok(self.encrypt(plaintext, key)?.to_base64())
    }

    /// [`Self::decrypt`] from the base64 wire form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` / `CryptoError::MalformedBlob` for
    /// undecodable input, otherwise see [`Self::decrypt`].
    pub fn decrypt_from_base64(
        &self,
        encoded: &str,
        key: &[u8],
    ) -> Result<SecretBuffer, CryptoError> {
        let blob = SealedBlob::from_base64(encoded)?;
        self.decrypt(&blob, key)
    }

    /// Decrypt a blob that must hold exactly a 32-byte key (a wrapped SEK).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if the plaintext has the
    /// wrong length, otherwise see [`Self::decrypt_from_base64`].
    pub fn unwrap_key(&self, encoded: &str, key: &[u8]) -> Result<SecretBytes<32>, CryptoError> {
        let plaintext = self.decrypt_from_base64(encoded, key)?;
        SecretBytes::from_slice(plaintext.expose())
    }

    /// Decrypt into a UTF-8 string held by the caller.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` for non-UTF-8 plaintext, otherwise see
    /// [`Self::decrypt_from_base64`].
    pub fn decrypt_string(&self, encoded: &str, key: &[u8]) -> Result<Zeroizing<String>, CryptoError> {
        let plaintext = self.decrypt_from_base64(encoded, key)?;
        encoding::bytes_to_string(plaintext.expose()).map(Zeroizing::new)
    }
}

impl Default for CryptoProvider {
    fn default() -> Self {
        Self::with_performer(PerformerKind::default())
    }
}

impl fmt::Debug for CryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoProvider")
            .field("performer", &self.performer.name())
            .finish()
    }
}
