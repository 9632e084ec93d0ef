//! ChaCha20-Poly1305 blobs with a per-encryption stretching salt.
//!
//! This module provides:
//! - [`SealedBlob`]: `salt || nonce || ciphertext || tag` container
//! - [`seal`] / [`open`]: raw AEAD under an already-derived 32-byte key
//!
//! Key stretching lives in [`crate::provider::CryptoProvider`], which derives
//! the AEAD key from the caller's key and the blob salt before calling into
//! this module.

use ring::aead;
use zeroize::Zeroize;

use crate::encoding;
use crate::error::CryptoError;
use crate::memory::SecretBuffer;

/// Per-blob stretching salt length in bytes.
pub const BLOB_SALT_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// ChaCha20 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Shortest input a decoder accepts: salt + nonce. Anything between this and
/// `salt + nonce + tag` fails later as an authentication failure.
pub const MIN_BLOB_LEN: usize = BLOB_SALT_LEN + NONCE_LEN;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An encrypted blob as persisted by the vault.
///
/// Wire format: `salt (32) || nonce (12) || ciphertext || tag (16)`, carried
/// as base64 by the storage layer.
#[must_use = "encrypted data must be stored or transmitted"]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBlob {
    /// Salt used to stretch the caller's key for this blob only.
    pub salt: [u8; BLOB_SALT_LEN],
    /// Random nonce, unique per encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext_and_tag: Vec<u8>,
}

impl SealedBlob {
    /// Serialize to `salt || nonce || ciphertext || tag`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let capacity = MIN_BLOB_LEN.saturating_add(self.ciphertext_and_tag.len());
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext_and_tag);
        out
    }

    /// Split a serialized blob at its fixed offsets.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedBlob` if the input is shorter than 44 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_BLOB_LEN {
            return Err(CryptoError::MalformedBlob(format!(
                "blob too short: {} bytes (minimum {MIN_BLOB_LEN})",
                bytes.len()
            )));
        }
        let (salt_bytes, rest) = bytes.split_at(BLOB_SALT_LEN);
        let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);

        let mut salt = [0u8; BLOB_SALT_LEN];
        salt.copy_from_slice(salt_bytes);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            salt,
            nonce,
            ciphertext_and_tag: sealed.to_vec(),
        })
    }

    /// Base64 of [`Self::to_bytes`].
    #[must_use]
    pub fn to_base64(&self) -> String {
        encoding::bytes_to_base64(&self.to_bytes())
    }

    /// Parse the base64 form produced by [`Self::to_base64`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` for invalid base64 and
    /// `CryptoError::MalformedBlob` for undersized input.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&encoding::base64_to_bytes(encoded)?)
    }
}

// ---------------------------------------------------------------------------
// Raw AEAD
// ---------------------------------------------------------------------------

fn aead_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "invalid AEAD key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::CHACHA20_POLY1305, key)
        .map_err(|_| CryptoError::Encryption("failed to create ChaCha20-Poly1305 key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` with `nonce`, returning `ciphertext || tag`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not 32 bytes and
/// `CryptoError::Encryption` if sealing fails.
pub fn seal(plaintext: &[u8], key: &[u8], nonce: [u8; NONCE_LEN]) -> Result<Vec<u8>, CryptoError> {
    let key = aead_key(key)?;
    let mut in_out = Vec::with_capacity(plaintext.len().saturating_add(TAG_LEN));
    in_out.extend_from_slice(plaintext);
    if key
        .seal_in_place_append_tag(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut in_out,
        )
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "ChaCha20-Poly1305 encryption failed".into(),
        ));
    }
    Ok(in_out)
}

/// Authenticate and decrypt `ciphertext || tag`.
///
/// The scratch buffer is zeroized on success and on failure; no plaintext
/// leaves this function unless the tag verifies.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not 32 bytes and
/// `CryptoError::Decryption` on any authentication failure.
pub fn open(
    ciphertext_and_tag: &[u8],
    key: &[u8],
    nonce: [u8; NONCE_LEN],
) -> Result<SecretBuffer, CryptoError> {
    let key = aead_key(key)?;
    let mut in_out = ciphertext_and_tag.to_vec();
    let result = key
        .open_in_place(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut in_out,
        )
        .map(|plaintext| SecretBuffer::new(plaintext))
        .map_err(|_| CryptoError::Decryption);
    in_out.zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: [u8; KEY_LEN] = [0xAA; KEY_LEN];
    const WRONG_KEY: [u8; KEY_LEN] = [0xBB; KEY_LEN];
    const NONCE: [u8; NONCE_LEN] = [0x01; NONCE_LEN];

    #[test]
    fn seal_appends_tag() {
        let sealed = seal(b"abandon", &TEST_KEY, NONCE).unwrap();
        assert_eq!(sealed.len(), 7 + TAG_LEN);
    }

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(b"secret seed words", &TEST_KEY, NONCE).unwrap();
        let opened = open(&sealed, &TEST_KEY, NONCE).unwrap();
        assert_eq!(opened.expose(), b"secret seed words");
    }

    #[test]
    fn open_rejects_wrong_key_tampering_and_wrong_nonce() {
        let sealed = seal(b"secret", &TEST_KEY, NONCE).unwrap();
        assert!(matches!(
            open(&sealed, &WRONG_KEY, NONCE),
            Err(CryptoError::Decryption)
        ));

        let mut tampered = sealed.clone();
        tampered[0] ^= 0x80;
        assert!(matches!(
            open(&tampered, &TEST_KEY, NONCE),
            Err(CryptoError::Decryption)
        ));

        assert!(matches!(
            open(&sealed, &TEST_KEY, [0x02; NONCE_LEN]),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn open_rejects_input_shorter_than_tag() {
        assert!(matches!(
            open(&[0u8; 5], &TEST_KEY, NONCE),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = seal(b"x", &[0u8; 16], NONCE).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyMaterial(_)));
    }

    /// RFC 8439 §2.8.2 AEAD test vector (with its AAD dropped, so only the
    /// ciphertext prefix is comparable: the keystream does not depend on AAD).
    #[test]
    fn keystream_matches_rfc8439() {
        let key: Vec<u8> = (0x80u8..=0x9f).collect();
        let nonce = [
            0x07, 0x00, 0x00, 0x00, 0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47,
        ];
        let plaintext = b"Ladies and Gentlemen of the class of '99: If I could offer you only one tip for the future, sunscreen would be it.";
        let sealed = seal(plaintext, &key, nonce).unwrap();
        assert_eq!(
            encoding::bytes_to_hex(&sealed[..16]),
            "d31a8d34648e60db7b86afbc53ef7ec2"
        );
    }

    #[test]
    fn blob_bytes_split_at_fixed_offsets() {
        let blob = SealedBlob {
            salt: [1u8; BLOB_SALT_LEN],
            nonce: [2u8; NONCE_LEN],
            ciphertext_and_tag: vec![3u8; 20],
        };
        let bytes = blob.to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(&bytes[32..44], &[2u8; 12]);
        assert_eq!(SealedBlob::from_bytes(&bytes).unwrap(), blob);
        assert_eq!(SealedBlob::from_base64(&blob.to_base64()).unwrap(), blob);
    }

    #[test]
    fn blob_decoder_rejects_inputs_below_44_bytes() {
        let err = SealedBlob::from_bytes(&[0u8; 43]).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedBlob(_)));

        let empty = SealedBlob::from_bytes(&[0u8; 44]).unwrap();
        assert!(empty.ciphertext_and_tag.is_empty());
    }
}
