//! Authenticated envelopes using AES-128-GCM.
//!
//! The wire layout is `nonce(12) ‖ tag(16) ‖ ciphertext(variable)`. The
//! underlying AEAD library emits ciphertext with a trailing tag; both
//! [`seal`] and [`decrypt`] repack at this boundary so the library's
//! native layout never leaks onto the wire.

use aes_gcm::{
    Aes128Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};

use crate::{error::CryptoError, kdf::SessionKey};

/// AES-GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Minimum envelope length: a nonce and a tag with empty ciphertext.
pub const ENVELOPE_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Encrypt a plaintext into an envelope with a fresh random nonce.
///
/// Each call draws 12 new bytes from the OS CSPRNG; a (key, nonce) pair
/// is never reused within a process lifetime.
pub fn encrypt(key: &SessionKey, plaintext: &[u8]) -> Vec<u8> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    seal(key, &nonce, plaintext)
}

/// Encrypt a plaintext under a caller-provided nonce.
///
/// Deterministic variant of [`encrypt`] for tests. Callers outside of
/// tests MUST NOT pass a nonce that was already used with this key.
pub fn seal(key: &SessionKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes128Gcm::new(key.as_bytes().into());

    let Ok(ct_and_tag) = cipher.encrypt(Nonce::from_slice(nonce), plaintext) else {
        unreachable!("AES-GCM encryption cannot fail with valid inputs");
    };

    // Repack library layout (ciphertext ‖ tag) into wire layout
    // (nonce ‖ tag ‖ ciphertext).
    debug_assert!(ct_and_tag.len() >= TAG_SIZE);
    let split = ct_and_tag.len() - TAG_SIZE;

    let mut envelope = Vec::with_capacity(NONCE_SIZE + ct_and_tag.len());
    envelope.extend_from_slice(nonce);
    envelope.extend_from_slice(&ct_and_tag[split..]);
    envelope.extend_from_slice(&ct_and_tag[..split]);
    envelope
}

/// Decrypt an envelope, verifying its authentication tag.
///
/// # Errors
///
/// - `MalformedEnvelope` if the input is shorter than nonce + tag
/// - `Authentication` if the tag does not verify (forged, corrupted, or
///   encrypted under a different key)
///
/// On any failure no plaintext is returned; truncated or garbled input is
/// never partially decrypted.
pub fn decrypt(key: &SessionKey, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < ENVELOPE_OVERHEAD {
        return Err(CryptoError::MalformedEnvelope {
            len: envelope.len(),
            min: ENVELOPE_OVERHEAD,
        });
    }

    let nonce = &envelope[..NONCE_SIZE];
    let tag = &envelope[NONCE_SIZE..ENVELOPE_OVERHEAD];
    let ciphertext = &envelope[ENVELOPE_OVERHEAD..];

    // The library expects ciphertext ‖ tag.
    let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    ct_and_tag.extend_from_slice(ciphertext);
    ct_and_tag.extend_from_slice(tag);

    let cipher = Aes128Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ct_and_tag.as_slice())
        .map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::kdf::{SALT_SIZE, derive_key};

    // Derive once; PBKDF2's work factor makes per-case derivation too slow
    // for property tests.
    fn test_key() -> SessionKey {
        static KEY: std::sync::OnceLock<SessionKey> = std::sync::OnceLock::new();
        KEY.get_or_init(|| derive_key("test passphrase", &[0x5au8; SALT_SIZE]).unwrap()).clone()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let envelope = encrypt(&key, plaintext);
        let decrypted = decrypt(&key, &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key();

        let envelope = encrypt(&key, b"");
        assert_eq!(envelope.len(), ENVELOPE_OVERHEAD);

        let decrypted = decrypt(&key, &envelope).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key();
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let envelope = encrypt(&key, &plaintext);
        let decrypted = decrypt(&key, &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn envelope_layout_is_nonce_tag_ciphertext() {
        let key = test_key();
        let nonce = [0xabu8; NONCE_SIZE];
        let plaintext = b"layout check";

        let envelope = seal(&key, &nonce, plaintext);

        assert_eq!(&envelope[..NONCE_SIZE], &nonce);
        assert_eq!(envelope.len(), ENVELOPE_OVERHEAD + plaintext.len());
    }

    #[test]
    fn seal_is_deterministic_for_fixed_nonce() {
        let key = test_key();
        let nonce = [0x01u8; NONCE_SIZE];

        let a = seal(&key, &nonce, b"same input");
        let b = seal(&key, &nonce, b"same input");

        assert_eq!(a, b);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let key = test_key();
        let other = derive_key("test passphrase", &[0xa5u8; SALT_SIZE]).unwrap();

        let envelope = encrypt(&key, b"secret");
        assert_eq!(decrypt(&other, &envelope), Err(CryptoError::Authentication));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"original message");

        envelope[NONCE_SIZE] ^= 0x01; // first tag byte

        assert_eq!(decrypt(&key, &envelope), Err(CryptoError::Authentication));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"original message");

        envelope[ENVELOPE_OVERHEAD] ^= 0x80; // first ciphertext byte

        assert_eq!(decrypt(&key, &envelope), Err(CryptoError::Authentication));
    }

    #[test]
    fn truncated_envelope_is_malformed() {
        let key = test_key();

        let result = decrypt(&key, &[0u8; ENVELOPE_OVERHEAD - 1]);
        assert_eq!(
            result,
            Err(CryptoError::MalformedEnvelope { len: ENVELOPE_OVERHEAD - 1, min: ENVELOPE_OVERHEAD })
        );
    }

    #[test]
    fn nonces_do_not_repeat() {
        let key = test_key();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let envelope = encrypt(&key, b"x");
            let mut nonce = [0u8; NONCE_SIZE];
            nonce.copy_from_slice(&envelope[..NONCE_SIZE]);
            assert!(seen.insert(nonce), "nonce repeated under the same key");
        }
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_plaintext(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let key = test_key();
            let envelope = encrypt(&key, &plaintext);
            prop_assert_eq!(decrypt(&key, &envelope).unwrap(), plaintext);
        }

        #[test]
        fn bit_flip_anywhere_past_nonce_fails(
            plaintext in proptest::collection::vec(any::<u8>(), 1..256),
            offset in NONCE_SIZE..(ENVELOPE_OVERHEAD + 1),
            bit in 0u8..8,
        ) {
            let key = test_key();
            let mut envelope = encrypt(&key, &plaintext);
            envelope[offset] ^= 1 << bit;
            prop_assert_eq!(decrypt(&key, &envelope), Err(CryptoError::Authentication));
        }
    }
}
