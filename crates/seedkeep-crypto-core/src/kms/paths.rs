//! BIP-32 derivation paths for the three key purposes.
//!
//! ```text
//! m / 44' / 9004' / 0' / 0      / {account}            account keys
//! m / 44' / 9004' / 1' / {acc}' / l0 / ... / l8         per-token keys
//! m / 44' / 9004' / 2' / 0      / 0                    wallet identity
//! ```
//!
//! The purpose level is hardened and distinct per purpose, so no two
//! purposes share a subtree. Token keys carry the whole token hash as nine
//! non-hardened limbs below the account level.

use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBytes;

/// SLIP-44 coin type of the Stark-curve chain.
pub const COIN_TYPE: u32 = 9004;

/// Hardened purpose branch for account keys.
pub const ACCOUNT_BRANCH: u32 = 0;
/// Hardened purpose branch for token keys.
pub const TOKEN_BRANCH: u32 = 1;
/// Hardened purpose branch for the identity key.
pub const IDENTITY_BRANCH: u32 = 2;

/// Largest non-hardened child index.
pub const MAX_CHILD_INDEX: u32 = 0x7FFF_FFFF;

fn check_index(what: &str, index: u32) -> Result<u32, CryptoError> {
    if index > MAX_CHILD_INDEX {
        return Err(CryptoError::Derivation(format!(
            "{what} {index} out of range (max {MAX_CHILD_INDEX})"
        )));
    }
    Ok(index)
}

/// `m/44'/9004'/0'/0/{index}`.
///
/// # Errors
///
/// Returns `CryptoError::Derivation` if `index` is not below 2^31.
pub fn account(index: u32) -> Result<String, CryptoError> {
    let index = check_index("account index", index)?;
    Ok(format!("m/44'/{COIN_TYPE}'/{ACCOUNT_BRANCH}'/0/{index}"))
}

/// `m/44'/9004'/1'/{account}'/{l0}/.../{ln}`.
///
/// # Errors
///
/// Returns `CryptoError::Derivation` if any index is not below 2^31 or
/// `limbs` is empty.
pub fn token(account_index: u32, limbs: &[u32]) -> Result<String, CryptoError> {
    let account_index = check_index("account index", account_index)?;
    if limbs.is_empty() {
        return Err(CryptoError::Derivation("token path needs at least one index".into()));
    }
    let mut path = format!("m/44'/{COIN_TYPE}'/{TOKEN_BRANCH}'/{account_index}'");
    for &limb in limbs {
        let limb = check_index("token index", limb)?;
        path.push('/');
        path.push_str(&limb.to_string());
    }
    Ok(path)
}

/// `m/44'/9004'/2'/0/0`.
#[must_use]
pub fn identity() -> String {
    format!("m/44'/{COIN_TYPE}'/{IDENTITY_BRANCH}'/0/0")
}

/// Walk `path` from the BIP-32 master key of `seed` and return the child's
/// raw 32-byte secp256k1 private key.
///
/// # Errors
///
/// Returns `CryptoError::Derivation` for an unparsable path or an invalid
/// child (probability ~2^-127 per level).
pub fn derive_child_secret(seed: &[u8], path: &str) -> Result<SecretBytes<32>, CryptoError> {
    let root = XPrv::new(seed).map_err(|e| CryptoError::Derivation(e.to_string()))?;
    let path = DerivationPath::from_str(path)
        .map_err(|e| CryptoError::Derivation(format!("invalid path '{path}': {e}")))?;

    let mut child = root;
    for number in path {
        child = child
            .derive_child(number)
            .map_err(|e| CryptoError::Derivation(e.to_string()))?;
    }

    let mut bytes: [u8; 32] = child.private_key().to_bytes().into();
    let secret = SecretBytes::new(bytes);
    bytes.zeroize();
    Ok(secret)
}
