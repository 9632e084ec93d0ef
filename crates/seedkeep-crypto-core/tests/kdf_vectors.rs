#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! PBKDF2-HMAC-SHA512 known-answer tests run against every performer.
//!
//! The 4096-iteration vectors are the widely published SHA-512 extensions of
//! RFC 6070; the 200 000-iteration vector pins the production parameters.

use std::sync::Arc;

use seedkeep_crypto_core::encoding::{bytes_to_hex, hex_to_bytes};
use seedkeep_crypto_core::kdf::{pbkdf2_into, stretch, Pbkdf2Performer};
use seedkeep_crypto_core::{CryptoProvider, PerformerKind};

fn performers() -> Vec<Arc<dyn Pbkdf2Performer>> {
    vec![PerformerKind::Ring.build(), PerformerKind::Software.build()]
}

#[test]
fn rfc6070_style_4096_iterations() {
    for performer in performers() {
        let mut out = [0u8; 64];
        pbkdf2_into(performer.as_ref(), b"password", b"salt", 4096, &mut out)
            .expect("pbkdf2 should succeed");
        assert_eq!(
            bytes_to_hex(&out),
            "d197b1b33db0143e018b12f3d1d1479e6cdebdcc97c5c0f87f6902e072f457b5\
             143f30602641b3d55cd335988cb36b84376060ecd532e039b742a239434af2d5",
            "performer {}",
            performer.name()
        );
    }
}

#[test]
fn rfc6070_style_long_inputs() {
    for performer in performers() {
        let mut out = [0u8; 64];
        pbkdf2_into(
            performer.as_ref(),
            b"passwordPASSWORDpassword",
            b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
            4096,
            &mut out,
        )
        .expect("pbkdf2 should succeed");
        assert_eq!(
            bytes_to_hex(&out),
            "8c0511f4c6e597c6ac6315d8f0362e225f3c501495ba23b868c005174dc4ee71\
             115b59f9e60cd9532fa33e0f75aefe30225c583a186cd82bd4daea9724a3d3b8",
            "performer {}",
            performer.name()
        );
    }
}

#[test]
fn production_parameters_vector() {
    let expected = "40985d5d3c85c3e346f14249c0eef2556d94b6ddbcad57670885dcb9bc9b6a27";
    let salt = [0x01u8; 32];
    for performer in performers() {
        let key = stretch(performer.as_ref(), b"correct horse battery staple", &salt)
            .expect("stretch should succeed");
        assert_eq!(bytes_to_hex(key.expose()), expected, "performer {}", performer.name());
    }

    let provider = CryptoProvider::default();
    let key = provider
        .derive_key(b"correct horse battery staple", &hex_to_bytes(&"01".repeat(32)).unwrap())
        .expect("derive_key should succeed");
    assert_eq!(bytes_to_hex(key.expose()), expected);
}
