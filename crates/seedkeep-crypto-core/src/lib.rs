//! `seedkeep-crypto-core`: pure cryptographic primitives for seedkeep.
//!
//! This crate is the audit target: no storage, no async, no logging. The
//! vault crate composes these pieces; nothing here knows about persistence.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod encoding;

pub mod kdf;
pub mod provider;
pub mod symmetric;

pub mod kms;

pub use bip39::Language;
pub use error::CryptoError;
pub use kdf::{PerformerKind, Pbkdf2Performer, RingPerformer, SoftwarePerformer, PBKDF2_ITERATIONS};
pub use kms::{
    check_mnemonic, derive_account_address, derive_key_pair, derive_key_pair_from_seed,
    generate_mnemonic, grind_key, validate_mnemonic, KeyPairArgs, KeySourceId, SeedPhrase,
    StarkKeyPair, TokenDescriptor,
};
pub use memory::{SecretBuffer, SecretBytes};
pub use provider::CryptoProvider;
pub use starknet_crypto::Felt;
pub use symmetric::{SealedBlob, MIN_BLOB_LEN};
