//! The encrypted key-value store the vault persists into.
//!
//! The vault talks to one capability trait and never branches on platform.
//! Platform keychains implement [`EncryptedStorage`] outside this crate;
//! [`MemoryStorage`] and [`FileStorage`] ship here for tests, tooling and
//! headless use.

mod file;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::{BiometricBehavior, MemoryStorage, WriteFailure};

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The user dismissed the platform authentication prompt.
    #[error("authentication cancelled by user")]
    BiometricCancelled,

    /// The platform gate cannot run (no hardware, not enrolled, locked out).
    #[error("biometric authentication unavailable: {0}")]
    BiometricUnavailable(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Async key-value store with optional per-item user-authentication gating.
///
/// Values are opaque strings (base64 in practice). Each key is read and
/// written atomically; there are no cross-key transactions.
#[async_trait]
pub trait EncryptedStorage: Send + Sync {
    /// Read `key`. With `auth_prompt`, the backend gates the read behind
    /// biometric/device authentication and shows the prompt text.
    async fn get_item(
        &self,
        key: &str,
        auth_prompt: Option<&str>,
    ) -> Result<Option<String>, StorageError>;

    /// Write `key`. With `auth_prompt`, the item is stored behind the
    /// authentication gate. Returns `false` if the backend declined the write.
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        auth_prompt: Option<&str>,
    ) -> Result<bool, StorageError>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Whether `key` exists, without triggering an authentication prompt.
    ///
    /// The default reads the item unauthenticated; backends that gate
    /// reads should override it.
    async fn has_item(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_item(key, None).await?.is_some())
    }
}
