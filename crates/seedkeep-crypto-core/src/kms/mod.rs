//! Key-derivation provider: mnemonic in, Stark key pairs out.
//!
//! ```text
//! SeedPhrase ─► BIP-39 seed ─► BIP-32 (purpose path) ─► 32 bytes ─► grind ─► k
//!                                                                         └─► k·G
//! ```
//!
//! Nothing here touches storage. Callers obtain the phrase from the vault,
//! derive what one operation needs, and drop it.

pub mod mnemonic;
pub mod paths;
pub mod stark;

use serde::{Deserialize, Serialize};
use starknet_crypto::Felt;

use crate::error::CryptoError;
use crate::memory::SecretBytes;

pub use mnemonic::{
    check_mnemonic, generate_mnemonic, validate_mnemonic, KeySourceId, SeedPhrase,
    SEED_PHRASE_WORD_COUNT,
};
pub use stark::{
    derive_account_address, felt_to_child_indices, grind_key, token_address_index, StarkKeyPair,
    TOKEN_INDEX_LIMBS,
};

/// A token as seen by the shielded-balance protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// ERC-20 style token contract.
    pub contract_address: Felt,
    /// Shielded pool contract holding the token's private balances.
    pub shielded_pool_address: Felt,
}

/// Which key pair to derive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum KeyPairArgs {
    /// Signing key of account `account_index`.
    AccountKeyPair { account_index: u32 },
    /// Key for one token's shielded balance under one account.
    TokenKeyPair {
        account_index: u32,
        account_address: Felt,
        token: TokenDescriptor,
    },
    /// The wallet's stable identity key.
    GetId,
}

impl KeyPairArgs {
    /// BIP-32 path these arguments select.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Derivation` if `account_index` is not below 2^31.
    pub fn path(&self) -> Result<String, CryptoError> {
        match self {
            Self::AccountKeyPair { account_index } => paths::account(*account_index),
            Self::TokenKeyPair {
                account_index,
                account_address,
                token,
            } => paths::token(
                *account_index,
                &token_address_index(*account_address, token),
            ),
            Self::GetId => Ok(paths::identity()),
        }
    }
}

/// Derive the key pair `args` selects from `seed_phrase`.
///
/// # Errors
///
/// Returns `CryptoError::Derivation` for out-of-range indices or a failed
/// BIP-32 step.
pub fn derive_key_pair(
    args: &KeyPairArgs,
    seed_phrase: &SeedPhrase,
) -> Result<StarkKeyPair, CryptoError> {
    let seed = seed_phrase.to_seed()?;
    derive_key_pair_from_seed(args, &seed)
}

/// [`derive_key_pair`] from an already computed BIP-39 seed, for callers
/// deriving several keys from one phrase.
///
/// # Errors
///
/// See [`derive_key_pair`].
pub fn derive_key_pair_from_seed(
    args: &KeyPairArgs,
    seed: &SecretBytes<64>,
) -> Result<StarkKeyPair, CryptoError> {
    let path = args.path()?;
    let child = paths::derive_child_secret(seed.expose(), &path)?;
    let private_key = grind_key(child.expose())?;
    StarkKeyPair::from_private_key(private_key)
}
