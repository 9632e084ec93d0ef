//! Vault error types for `seedkeep-vault`.

use seedkeep_crypto_core::CryptoError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors produced by vault operations.
///
/// Messages carry logical storage key names and ids only, never secret
/// material.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Malformed input: mnemonic word count or checksum, empty passphrase.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required persisted item is absent (never set up, or reset).
    #[error("missing stored item: {key}")]
    StorageMissing {
        /// Logical storage key that was looked up.
        key: String,
    },

    /// AEAD verification failed. Wrong passphrase and corrupted ciphertext
    /// are deliberately indistinguishable.
    #[error("authentication failed for {key}")]
    AuthenticationFailure {
        /// Logical storage key of the blob that failed to open.
        key: String,
    },

    /// The user dismissed the biometric prompt. No credential was tested.
    #[error("biometric authentication cancelled")]
    BiometricCancelled,

    /// Biometrics cannot be used: never enabled, no hardware, or lockout.
    #[error("biometric authentication unavailable: {0}")]
    BiometricUnavailable(String),

    /// Setup could not persist an artifact; anything it wrote was rolled back.
    #[error("failed to persist {artifact}")]
    PartialWriteFailure {
        /// Logical storage key that could not be written.
        artifact: String,
    },

    /// Reset could not delete every item.
    #[error("reset incomplete, remaining: {}", remaining.join(", "))]
    PartialResetFailure {
        /// Logical storage keys that may still exist.
        remaining: Vec<String>,
    },

    /// Storage backend failure outside the cases above.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration or logging setup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(CryptoError),

    /// A blocking crypto task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Mnemonic(reason) => Self::Validation(reason),
            other => Self::Crypto(other),
        }
    }
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BiometricCancelled => Self::BiometricCancelled,
            StorageError::BiometricUnavailable(reason) => Self::BiometricUnavailable(reason),
            StorageError::Backend(reason) => Self::Storage(reason),
        }
    }
}

impl VaultError {
    /// Map a decryption failure on `key` to [`VaultError::AuthenticationFailure`].
    pub(crate) fn opening(key: &str) -> impl FnOnce(CryptoError) -> Self + '_ {
        move |err| match err {
            CryptoError::Decryption => Self::AuthenticationFailure {
                key: key.to_owned(),
            },
            other => Self::from(other),
        }
    }
}
