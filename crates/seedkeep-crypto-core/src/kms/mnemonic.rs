//! BIP39 mnemonics: generation, validation, and the vault's seed phrase type.
//!
//! [`validate_mnemonic`] checks any standard mnemonic against an explicitly
//! named wordlist. [`SeedPhrase`] is narrower: 24 English words, the only
//! shape the wallet generates and stores.

use std::fmt;
use std::str::FromStr;

use bip39::{Language, Mnemonic};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::encoding;
use crate::error::CryptoError;
use crate::memory::SecretBytes;

/// Word count of every seed phrase the wallet stores.
pub const SEED_PHRASE_WORD_COUNT: usize = 24;

/// Entropy behind a 24-word mnemonic (256 bits).
const SEED_PHRASE_ENTROPY_LEN: usize = 32;

/// BLAKE3 `derive_key` context for key source ids.
const KEY_SOURCE_ID_CONTEXT: &str = "seedkeep key source id v1";

/// Length of a key source id in bytes (rendered as 32 hex chars).
const KEY_SOURCE_ID_LEN: usize = 16;

// ── Validation ─────────────────────────────────────────────────────

fn parse_in(words: &[&str], language: Language) -> Result<Mnemonic, CryptoError> {
    let joined = Zeroizing::new(words.join(" "));
    Mnemonic::parse_in_normalized(language, &joined).map_err(|e| CryptoError::Mnemonic(e.to_string()))
}

/// Check word count, wordlist membership and checksum against `language`.
///
/// # Errors
///
/// Returns `CryptoError::Mnemonic` describing the first failure.
pub fn check_mnemonic(words: &[&str], language: Language) -> Result<(), CryptoError> {
    parse_in(words, language).map(drop)
}

/// `true` iff `words` is a checksum-valid mnemonic in `language`.
///
/// Accepts every standard length (12/15/18/21/24 words), not only phrases
/// this crate generated.
#[must_use]
pub fn validate_mnemonic(words: &[&str], language: Language) -> bool {
    check_mnemonic(words, language).is_ok()
}

/// Fresh 24-word English mnemonic from 256 bits of OS entropy.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn generate_mnemonic() -> Result<SeedPhrase, CryptoError> {
    let entropy = encoding::random_bytes::<SEED_PHRASE_ENTROPY_LEN>()?;
    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy.expose())
        .map_err(|e| CryptoError::Mnemonic(e.to_string()))?;
    Ok(SeedPhrase {
        phrase: Zeroizing::new(mnemonic.to_string()),
    })
}

// ── SeedPhrase ─────────────────────────────────────────────────────

/// A checksum-valid 24-word English mnemonic.
///
/// Stored single-space separated, zeroized on drop, masked in `Debug`.
/// Words are never case-folded or corrected.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedPhrase {
    phrase: Zeroizing<String>,
}

impl SeedPhrase {
    /// Parse whitespace-separated words.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Mnemonic` unless the input is exactly 24 words
    /// from the English list with a valid checksum.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let words: Vec<&str> = input.split_whitespace().collect();
        Self::from_words(&words)
    }

    /// Build from individual words.
    ///
    /// # Errors
    ///
    /// See [`Self::parse`].
    pub fn from_words(words: &[&str]) -> Result<Self, CryptoError> {
        if words.len() != SEED_PHRASE_WORD_COUNT {
            return Err(CryptoError::Mnemonic(format!(
                "expected {SEED_PHRASE_WORD_COUNT} words, got {}",
                words.len()
            )));
        }
        check_mnemonic(words, Language::English)?;
        Ok(Self {
            phrase: Zeroizing::new(words.join(" ")),
        })
    }

    /// The phrase as a single-spaced string.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.phrase
    }

    /// Iterate the words in order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split(' ')
    }

    fn mnemonic(&self) -> Result<Mnemonic, CryptoError> {
        Mnemonic::parse_in_normalized(Language::English, &self.phrase)
            .map_err(|e| CryptoError::Mnemonic(e.to_string()))
    }

    /// The 32 bytes of entropy the words encode.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Mnemonic` if the phrase no longer parses, or
    /// `CryptoError::InvalidKeyMaterial` if it does not encode 256 bits.
    pub fn entropy(&self) -> Result<SecretBytes<SEED_PHRASE_ENTROPY_LEN>, CryptoError> {
        let mut raw = self.mnemonic()?.to_entropy();
        let entropy = SecretBytes::from_slice(&raw);
        raw.zeroize();
        entropy
    }

    /// BIP39 seed with an empty BIP39 passphrase.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Mnemonic` if the phrase no longer parses.
    pub fn to_seed(&self) -> Result<SecretBytes<64>, CryptoError> {
        let mut raw = self.mnemonic()?.to_seed("");
        let seed = SecretBytes::new(raw);
        raw.zeroize();
        Ok(seed)
    }

    /// The storage namespace for this phrase.
    ///
    /// # Errors
    ///
    /// See [`Self::entropy`].
    pub fn key_source_id(&self) -> Result<KeySourceId, CryptoError> {
        let entropy = self.entropy()?;
        let mut digest = blake3::derive_key(KEY_SOURCE_ID_CONTEXT, entropy.expose());
        let id = encoding::bytes_to_hex(&digest[..KEY_SOURCE_ID_LEN]);
        digest.zeroize();
        Ok(KeySourceId(id))
    }
}

impl FromStr for SeedPhrase {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedPhrase(***)")
    }
}

// ── KeySourceId ────────────────────────────────────────────────────

/// Stable, non-secret identifier of a seed phrase.
///
/// Derived one-way from the mnemonic entropy, so it can name storage keys
/// and appear in logs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeySourceId(String);

impl KeySourceId {
    /// Id of `phrase`; same as [`SeedPhrase::key_source_id`].
    ///
    /// # Errors
    ///
    /// See [`SeedPhrase::entropy`].
    pub fn from_seed_phrase(phrase: &SeedPhrase) -> Result<Self, CryptoError> {
        phrase.key_source_id()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeySourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeySourceId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == KEY_SOURCE_ID_LEN.saturating_mul(2)
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(CryptoError::Encoding(format!(
                "key source id must be {} lowercase hex chars",
                KEY_SOURCE_ID_LEN.saturating_mul(2)
            )));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for KeySourceId {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeySourceId> for String {
    fn from(id: KeySourceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ART: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
abandon abandon abandon art";

    fn wiped_on_drop<T: zeroize::ZeroizeOnDrop>() {}

    #[test]
    fn parsed_mnemonics_are_wiped_on_drop() {
        wiped_on_drop::<bip39::Mnemonic>();
        wiped_on_drop::<SecretBytes<32>>();
        let phrase = SeedPhrase::parse(ABANDON_ART).unwrap();
        assert_eq!(phrase.mnemonic().unwrap().word_count(), 24);
    }

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
abandon abandon abandon about";

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn validate_accepts_foreign_standard_lengths() {
        assert!(validate_mnemonic(&words(ABANDON_ABOUT), Language::English));
        assert!(validate_mnemonic(&words(ABANDON_ART), Language::English));
    }

    #[test]
    fn validate_rejects_checksum_and_unknown_words() {
        let bad_checksum = ABANDON_ABOUT.replace("about", "zoo");
        assert!(!validate_mnemonic(&words(&bad_checksum), Language::English));

        let unknown = ABANDON_ABOUT.replace("about", "notaword");
        assert!(!validate_mnemonic(&words(&unknown), Language::English));
    }

    #[test]
    fn validate_is_bound_to_the_named_wordlist() {
        assert!(!validate_mnemonic(&words(ABANDON_ABOUT), Language::French));
    }

    #[test]
    fn seed_phrase_requires_24_words() {
        let err = SeedPhrase::parse(ABANDON_ABOUT).unwrap_err();
        assert!(err.to_string().contains("expected 24 words, got 12"));
    }

    #[test]
    fn seed_phrase_does_not_case_fold() {
        let shouting = ABANDON_ART.to_uppercase();
        assert!(SeedPhrase::parse(&shouting).is_err());
    }

    #[test]
    fn seed_phrase_normalizes_whitespace() {
        let spaced = format!("  {}\n", ABANDON_ART.replace(' ', "\t "));
        let phrase = SeedPhrase::parse(&spaced).unwrap();
        assert_eq!(phrase.expose(), ABANDON_ART);
        assert_eq!(phrase.words().count(), 24);
    }

    #[test]
    fn generated_phrases_are_valid_and_distinct() {
        let a = generate_mnemonic().unwrap();
        let b = generate_mnemonic().unwrap();
        assert_eq!(a.words().count(), SEED_PHRASE_WORD_COUNT);
        assert!(validate_mnemonic(&a.words().collect::<Vec<_>>(), Language::English));
        assert_ne!(a, b);
    }

    #[test]
    fn entropy_of_all_abandon_phrase_is_zero() {
        let phrase = SeedPhrase::parse(ABANDON_ART).unwrap();
        assert_eq!(phrase.entropy().unwrap().expose(), &[0u8; 32]);
    }

    #[test]
    fn bip39_seed_is_pbkdf2_of_the_words() {
        // BIP39: PBKDF2-HMAC-SHA512(words, "mnemonic" || passphrase, 2048, 64).
        let phrase = SeedPhrase::parse(ABANDON_ART).unwrap();
        let mut expected = [0u8; 64];
        crate::kdf::pbkdf2_into(
            &crate::kdf::SoftwarePerformer,
            ABANDON_ART.as_bytes(),
            b"mnemonic",
            2048,
            &mut expected,
        )
        .unwrap();
        assert_eq!(phrase.to_seed().unwrap().expose(), &expected);
    }

    #[test]
    fn key_source_id_is_deterministic_and_distinct() {
        let a = SeedPhrase::parse(ABANDON_ART).unwrap();
        let b = generate_mnemonic().unwrap();
        let id_a = a.key_source_id().unwrap();
        assert_eq!(id_a, a.key_source_id().unwrap());
        assert_ne!(id_a, b.key_source_id().unwrap());
        assert_eq!(id_a.as_str().len(), 32);
        assert_eq!(id_a.as_str().parse::<KeySourceId>().unwrap(), id_a);
    }

    #[test]
    fn key_source_id_parse_rejects_non_hex() {
        assert!("XYZ".parse::<KeySourceId>().is_err());
        assert!("0123456789ABCDEF0123456789abcdef".parse::<KeySourceId>().is_err());
        let json = serde_json::to_string(&"00".repeat(16)).unwrap();
        assert!(serde_json::from_str::<KeySourceId>(&json).is_ok());
    }

    #[test]
    fn debug_never_prints_words() {
        let phrase = SeedPhrase::parse(ABANDON_ART).unwrap();
        let debug = format!("{phrase:?}");
        assert_eq!(debug, "SeedPhrase(***)");
    }
}
