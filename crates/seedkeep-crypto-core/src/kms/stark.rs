//! Stark-curve scalars, public keys and account addresses.

use std::fmt;
use std::ops::{BitAnd, Rem, Shr};

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use starknet_core::utils::get_contract_address;
use starknet_crypto::{get_public_key, poseidon_hash_many, Felt};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBytes;

use super::TokenDescriptor;

/// Order `n` of the Stark curve's generator.
const CURVE_ORDER: [u8; 32] = [
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xb7, 0x81, 0x12, 0x6d, 0xca, 0xe7, 0xb2, 0x32, 0x1e, 0x66, 0xa2, 0x41, 0xad, 0xc6, 0x4d, 0x2f,
];

/// `2^256 - (2^256 mod n)`: largest multiple of `n` below `2^256`. Hashes at
/// or above it would bias `k mod n`.
const GRIND_LIMIT: [u8; 32] = [
    0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x0e, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xf7,
    0x38, 0xa1, 0x3b, 0x4b, 0x92, 0x0e, 0x94, 0x11, 0xae, 0x6d, 0xa5, 0xf4, 0x0b, 0x03, 0x58, 0xb1,
];

/// Upper bound on grinding rounds. Each round is rejected with probability
/// below 2^-4, so exhausting the bound does not happen in practice.
const MAX_GRIND_ATTEMPTS: u8 = u8::MAX;

/// Reduce 32 bytes of BIP-32 output to a uniform non-zero Stark scalar.
///
/// Round `i` hashes `seed || i` with SHA-256 and accepts the first digest
/// below [`GRIND_LIMIT`] whose reduction mod `n` is non-zero.
///
/// # Errors
///
/// Returns `CryptoError::Derivation` if every round is rejected.
pub fn grind_key(seed: &[u8; 32]) -> Result<SecretBytes<32>, CryptoError> {
    let order = BigUint::from_bytes_be(&CURVE_ORDER);
    let limit = BigUint::from_bytes_be(&GRIND_LIMIT);

    for attempt in 0..=MAX_GRIND_ATTEMPTS {
        let mut digest: [u8; 32] = Sha256::new()
            .chain_update(seed)
            .chain_update([attempt])
            .finalize()
            .into();
        let candidate = BigUint::from_bytes_be(&digest);
        digest.zeroize();
        if candidate >= limit {
            continue;
        }
        let scalar = candidate.rem(&order);
        if scalar.bits() == 0 {
            continue;
        }
        return left_pad(&scalar.to_bytes_be());
    }
    Err(CryptoError::Derivation(format!(
        "no valid scalar after {} grinding rounds",
        u16::from(MAX_GRIND_ATTEMPTS).saturating_add(1)
    )))
}

fn left_pad(bytes: &[u8]) -> Result<SecretBytes<32>, CryptoError> {
    let offset = 32usize.checked_sub(bytes.len()).ok_or_else(|| {
        CryptoError::InvalidKeyMaterial(format!("scalar wider than 32 bytes: {}", bytes.len()))
    })?;
    let mut out = [0u8; 32];
    out[offset..].copy_from_slice(bytes);
    let secret = SecretBytes::new(out);
    out.zeroize();
    Ok(secret)
}

/// A derived Stark key pair. Never persisted; recompute on demand.
#[derive(Clone)]
pub struct StarkKeyPair {
    private_key: SecretBytes<32>,
    /// x-coordinate of `private_key · G`.
    pub public_key: Felt,
}

impl StarkKeyPair {
    /// Build from a scalar already reduced mod `n`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` for the zero scalar or one
    /// not below the curve order.
    pub fn from_private_key(private_key: SecretBytes<32>) -> Result<Self, CryptoError> {
        let scalar = BigUint::from_bytes_be(private_key.expose());
        if scalar.bits() == 0 || scalar >= BigUint::from_bytes_be(&CURVE_ORDER) {
            return Err(CryptoError::InvalidKeyMaterial(
                "Stark private key must be in [1, n)".into(),
            ));
        }
        let public_key = get_public_key(&Felt::from_bytes_be(private_key.expose()));
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Big-endian private scalar.
    #[must_use]
    pub const fn private_key(&self) -> &SecretBytes<32> {
        &self.private_key
    }

    /// The private scalar as a field element for signing libraries.
    ///
    /// `Felt` is `Copy` and not zeroized; keep the returned value short-lived.
    #[must_use]
    pub fn private_key_felt(&self) -> Felt {
        Felt::from_bytes_be(self.private_key.expose())
    }
}

impl fmt::Debug for StarkKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarkKeyPair")
            .field("private_key", &"***")
            .field("public_key", &format_args!("{:#x}", self.public_key))
            .finish()
    }
}

/// Number of child indices a token hash is spread over.
pub const TOKEN_INDEX_LIMBS: usize = 9;

/// Bits per token index limb. `9 * 28 = 252` covers every field element.
const TOKEN_LIMB_BITS: usize = 28;

const TOKEN_LIMB_MASK: u32 = 0x0FFF_FFFF;

/// Child indices of a token key: `poseidon(account, contract, pool)` split
/// into 28-bit limbs, most significant first.
///
/// The split is lossless, so two tokens share a key only if their Poseidon
/// hashes are equal.
#[must_use]
pub fn token_address_index(
    account_address: Felt,
    token: &TokenDescriptor,
) -> [u32; TOKEN_INDEX_LIMBS] {
    let hash = poseidon_hash_many(&[
        account_address,
        token.contract_address,
        token.shielded_pool_address,
    ]);
    felt_to_child_indices(hash)
}

/// Lossless split of a field element into non-hardened child indices.
#[must_use]
pub fn felt_to_child_indices(value: Felt) -> [u32; TOKEN_INDEX_LIMBS] {
    let value = BigUint::from_bytes_be(&value.to_bytes_be());
    let mask = BigUint::from(TOKEN_LIMB_MASK);
    let mut limbs = [0u32; TOKEN_INDEX_LIMBS];
    for (position, limb) in limbs.iter_mut().rev().enumerate() {
        let shift = position.saturating_mul(TOKEN_LIMB_BITS);
        let digit = (&value).shr(shift).bitand(&mask);
        *limb = digit.to_u32_digits().first().copied().unwrap_or(0);
    }
    limbs
}

/// Counterfactual address of an account contract owned by `public_key`,
/// deployed with `salt` from the zero deployer.
#[must_use]
pub fn derive_account_address(public_key: Felt, class_hash: Felt, salt: Felt) -> Felt {
    get_contract_address(salt, class_hash, &[public_key], Felt::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding;
    use crate::kms::paths::MAX_CHILD_INDEX;

    fn felt(hex: &str) -> Felt {
        Felt::from_hex(hex).unwrap()
    }

    fn seed(hex: &str) -> [u8; 32] {
        encoding::hex_to_bytes(hex).unwrap().try_into().unwrap()
    }

    #[test]
    fn grind_limit_is_largest_multiple_of_order() {
        let order = BigUint::from_bytes_be(&CURVE_ORDER);
        let limit = BigUint::from_bytes_be(&GRIND_LIMIT);
        let two_256 = BigUint::from(1u8) << 256u32;
        assert_eq!((&limit % &order).bits(), 0);
        assert!(&two_256 - &limit < order);
    }

    #[test]
    fn grind_accepts_first_round_when_in_range() {
        let key = grind_key(&[0u8; 32]).unwrap();
        assert_eq!(
            encoding::bytes_to_hex(key.expose()),
            "079c9e31ac8255cb2f258583df262dc0bcdf5483bc9cd2e60196c90c789ae728"
        );
    }

    #[test]
    fn grind_skips_a_biased_round() {
        // SHA-256(seed || 0x00) lands above the limit for this seed.
        let key = grind_key(&seed(
            "0000000000000000000000000000000000000000000000000000000000000031",
        ))
        .unwrap();
        assert_eq!(
            encoding::bytes_to_hex(key.expose()),
            "048215f412b1c8df8cb23eb9fc07172633055f481cd2e9b951e825f6121afef8"
        );
    }

    #[test]
    fn grind_is_deterministic() {
        let a = grind_key(&[1u8; 32]).unwrap();
        let b = grind_key(&[1u8; 32]).unwrap();
        assert_eq!(a.expose(), b.expose());
        assert_eq!(
            encoding::bytes_to_hex(a.expose()),
            "045939f5f81789134639d211a06cc86b395977ea4840718127417e8fd57990c6"
        );
    }

    #[test]
    fn public_key_of_one_is_generator_x() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let pair = StarkKeyPair::from_private_key(SecretBytes::new(one)).unwrap();
        assert_eq!(
            pair.public_key,
            felt("0x1ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca")
        );
        assert_eq!(pair.private_key_felt(), Felt::ONE);
    }

    #[test]
    fn out_of_range_private_keys_are_rejected() {
        assert!(StarkKeyPair::from_private_key(SecretBytes::new([0u8; 32])).is_err());
        assert!(StarkKeyPair::from_private_key(SecretBytes::new(CURVE_ORDER)).is_err());
    }

    #[test]
    fn debug_masks_private_key() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let pair = StarkKeyPair::from_private_key(SecretBytes::new(one)).unwrap();
        let debug = format!("{pair:?}");
        assert!(debug.contains("private_key: \"***\""));
        assert!(!debug.contains("SecretBytes"));
    }

    fn eth_token(pool: &str) -> TokenDescriptor {
        TokenDescriptor {
            contract_address: felt("0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7"),
            shielded_pool_address: felt(pool),
        }
    }

    #[test]
    fn token_index_is_deterministic_and_separates_tokens() {
        let account = felt("0x1234");
        let a = token_address_index(account, &eth_token("0x111"));
        let b = token_address_index(account, &eth_token("0x222"));
        assert_ne!(a, b);
        assert_eq!(a, token_address_index(account, &eth_token("0x111")));
        assert!(a.iter().chain(b.iter()).all(|&limb| limb <= MAX_CHILD_INDEX));
    }

    #[test]
    fn child_indices_keep_every_bit() {
        // Equal in the low 31 bits, different above them.
        let low = felt("0x7");
        let high = felt("0x80000007");
        let top = felt("0x800000000000000000000000000000000000000000000000000000000000007");
        let encoded = [low, high, top].map(felt_to_child_indices);
        assert_ne!(encoded[0], encoded[1]);
        assert_ne!(encoded[0], encoded[2]);
        assert_ne!(encoded[1], encoded[2]);

        assert_eq!(encoded[0], [0, 0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(encoded[1], [0, 0, 0, 0, 0, 0, 0, 0x8, 7]);
        assert_eq!(encoded[2][0], 0x800_0000);
    }

    #[test]
    fn child_indices_reassemble_to_the_field_element() {
        for hex in ["0x0", "0x1", "0xfffffff", "0x10000000", "0x1234567890abcdef1234567890abcdef"] {
            let value = felt(hex);
            let mut rebuilt = Felt::ZERO;
            for limb in felt_to_child_indices(value) {
                assert!(limb <= MAX_CHILD_INDEX);
                rebuilt = rebuilt * Felt::from(1u64 << 28) + Felt::from(limb);
            }
            assert_eq!(rebuilt, value, "{hex}");
        }
        let max = Felt::ZERO - Felt::ONE;
        let mut rebuilt = Felt::ZERO;
        for limb in felt_to_child_indices(max) {
            rebuilt = rebuilt * Felt::from(1u64 << 28) + Felt::from(limb);
        }
        assert_eq!(rebuilt, max);
    }

    #[test]
    fn no_index_collision_across_many_pools() {
        // A 31-bit fold of the hash collides well within this many pools.
        let account = felt("0x1234");
        let contract = felt("0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7");
        let mut seen = std::collections::HashSet::new();
        for pool in 1u64..=(1 << 17) {
            let token = TokenDescriptor {
                contract_address: contract,
                shielded_pool_address: Felt::from(pool),
            };
            assert!(
                seen.insert(token_address_index(account, &token)),
                "pool {pool:#x} repeats an earlier token index"
            );
        }
    }

    #[test]
    fn account_address_depends_on_every_input() {
        let class_hash = felt("0x3131fa018d520a037686ce3efddeab8f28895662f019ca3ca18a626650f7d1e");
        let base = derive_account_address(felt("0x1"), class_hash, felt("0x1"));
        assert_eq!(base, derive_account_address(felt("0x1"), class_hash, felt("0x1")));
        assert_ne!(base, derive_account_address(felt("0x2"), class_hash, felt("0x1")));
        assert_ne!(base, derive_account_address(felt("0x1"), class_hash, felt("0x2")));
        assert_ne!(base, derive_account_address(felt("0x1"), felt("0x5"), felt("0x1")));
    }
}
