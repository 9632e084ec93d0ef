//! Cryptographic error types for `seedkeep-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// PBKDF2 stretching failed (empty salt, zero iterations, bad output length).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (ChaCha20-Poly1305 sealing).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed: tampered ciphertext or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Encrypted blob is structurally invalid (too short to hold salt and nonce).
    #[error("malformed encrypted blob: {0}")]
    MalformedBlob(String),

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Base64, hex or UTF-8 conversion failure.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// BIP39 mnemonic validation failure (word count, unknown word, checksum).
    #[error("invalid mnemonic: {0}")]
    Mnemonic(String),

    /// Hierarchical key derivation failure (BIP32 path, scalar grinding).
    #[error("key pair derivation failed: {0}")]
    Derivation(String),

    /// Secure memory allocation or CSPRNG failure.
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
