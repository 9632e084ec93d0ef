//! Secret-holding buffers for keys, plaintext mnemonics and derived scalars.
//!
//! - [`SecretBuffer`]: variable length (decrypted blobs, stretched passphrases)
//! - [`SecretBytes`]: fixed length (SEK, user key, private scalars)
//!
//! Both zero their contents on drop, mask `Debug`/`Display`, and try to pin
//! their pages with `mlock` so secrets do not reach swap. Pinning is
//! best-effort: a failed `mlock` only loses the swap guarantee.

use crate::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Page pinning
// ---------------------------------------------------------------------------

/// Pins a memory range for the lifetime of the guard.
struct PinnedRange {
    ptr: *const u8,
    len: usize,
    pinned: bool,
}

// SAFETY: the pointer is only handed to mlock/munlock; the bytes are owned and
// accessed through the enclosing buffer, never through this guard.
unsafe impl Send for PinnedRange {}
unsafe impl Sync for PinnedRange {}

impl PinnedRange {
    fn pin(ptr: *const u8, len: usize) -> Self {
        let pinned = platform::lock(ptr, len);
        Self { ptr, len, pinned }
    }
}

impl Drop for PinnedRange {
    fn drop(&mut self) {
        if self.pinned {
            platform::unlock(self.ptr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer
// ---------------------------------------------------------------------------

/// Heap buffer for secret bytes of arbitrary length.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
    pin: PinnedRange,
}

impl SecretBuffer {
    /// Copy `data` into a new pinned buffer.
    ///
    /// The caller remains responsible for zeroizing its own copy.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let pin = PinnedRange::pin(exposed.as_ptr(), exposed.len());
        Self { inner, pin }
    }

    /// Buffer of `len` bytes from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random(len: usize) -> Result<Self, CryptoError> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        let buf = Self::new(&bytes);
        bytes.zeroize();
        Ok(buf)
    }

    /// Borrow the secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `mlock` succeeded for this buffer.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pin.pinned
    }
}

impl Clone for SecretBuffer {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N>
// ---------------------------------------------------------------------------

/// Fixed-size secret, zeroized on drop.
///
/// The bytes live in their own heap allocation so the pinned range stays
/// valid when the value moves.
pub struct SecretBytes<const N: usize> {
    bytes: Box<[u8; N]>,
    pin: PinnedRange,
}

impl<const N: usize> SecretBytes<N> {
    #[must_use]
    pub fn new(data: [u8; N]) -> Self {
        let bytes = Box::new(data);
        let pin = PinnedRange::pin(bytes.as_ptr(), N);
        Self { bytes, pin }
    }

    /// Copy a slice that must be exactly `N` bytes long.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` on a length mismatch.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; N] = data.try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!(
                "expected {N} bytes, got {}",
                data.len()
            ))
        })?;
        Ok(Self::new(bytes))
    }

    /// `N` bytes from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; N];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        let secret = Self::new(bytes);
        bytes.zeroize();
        Ok(secret)
    }

    #[must_use]
    pub fn expose(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Whether `mlock` succeeded for the heap copy of the bytes.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pin.pinned
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        self.bytes.as_mut_slice().zeroize();
    }
}

impl<const N: usize> ZeroizeOnDrop for SecretBytes<N> {}

impl<const N: usize> Clone for SecretBytes<N> {
    fn clone(&self) -> Self {
        Self::new(*self.bytes)
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> From<[u8; N]> for SecretBytes<N> {
    fn from(data: [u8; N]) -> Self {
        Self::new(data)
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod platform {
    pub(super) fn lock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock only inspects the range; an invalid range yields ENOMEM.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn unlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock on a range we previously locked; failure is harmless.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn lock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn unlock(_ptr: *const u8, _len: usize) {}
}
