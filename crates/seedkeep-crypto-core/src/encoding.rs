//! Byte ⇄ string ⇄ base64/hex conversion and CSPRNG helpers.
//!
//! Everything handed to the encrypted store travels as standard padded
//! base64; identifiers and field elements are lowercase hex.

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, SecretBytes};

/// Encode bytes as standard padded base64.
#[must_use]
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard padded base64.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` on invalid characters or padding.
pub fn base64_to_bytes(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {e}")))
}

/// UTF-8 bytes of a string.
#[must_use]
pub fn string_to_bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Interpret bytes as UTF-8.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if the bytes are not valid UTF-8.
pub fn bytes_to_string(bytes: &[u8]) -> Result<String, CryptoError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| CryptoError::Encoding(format!("invalid UTF-8 at byte {}", e.valid_up_to())))
}

/// Lowercase hex without prefix.
#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}

/// Decode hex (either case), tolerating an optional `0x` prefix.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` on odd length or non-hex characters.
pub fn hex_to_bytes(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    HEXLOWER_PERMISSIVE
        .decode(digits.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("invalid hex: {e}")))
}

/// `N` random bytes as a public (non-secret) array, e.g. nonces.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn random_array<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut out = [0u8; N];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
    Ok(out)
}

/// `N` random bytes held as a secret.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn random_bytes<const N: usize>() -> Result<SecretBytes<N>, CryptoError> {
    SecretBytes::random()
}

/// `len` random bytes held as a secret.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn random_vec(len: usize) -> Result<SecretBuffer, CryptoError> {
    SecretBuffer::random(len)
}
