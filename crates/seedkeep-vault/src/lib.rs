//! `seedkeep-vault`: seed phrase custody for seedkeep.
//!
//! Envelope-encrypts recovery mnemonics into a pluggable
//! [`EncryptedStorage`] and recovers them with a passphrase or a platform
//! biometric gate. Key derivation from the recovered phrase lives in
//! `seedkeep-crypto-core`; this crate never derives signing keys.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod error;
pub mod keys;
pub mod storage;
pub mod telemetry;
pub mod vault;

pub use config::VaultConfig;
pub use error::VaultError;
pub use keys::StorageKeys;
pub use storage::{
    BiometricBehavior, EncryptedStorage, FileStorage, MemoryStorage, StorageError, WriteFailure,
};
pub use telemetry::{init_from_config, init_tracing};
pub use vault::{SeedPhraseVault, VaultState};
