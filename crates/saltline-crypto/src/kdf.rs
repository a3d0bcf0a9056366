//! Password-based key derivation via PBKDF2-HMAC-SHA256.

use hmac::Hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Derived key length in bytes (128-bit AES key).
pub const KEY_SIZE: usize = 16;

/// Salt length in bytes.
pub const SALT_SIZE: usize = 16;

/// PBKDF2 iteration count (work factor).
///
/// Together with [`KEY_SIZE`] and the SHA-256 PRF this is a fixed
/// protocol parameter: peers using a different value derive a different
/// key from the same (passphrase, salt) and cannot interoperate.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// A derived 128-bit session key.
///
/// Exists only in memory, owned by exactly one session per peer, and is
/// replaced wholesale on rekey. Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    /// Raw key bytes for the AEAD cipher.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Derive a session key from a passphrase and salt.
///
/// Pure and deterministic: the same (passphrase, salt) pair always yields
/// the same key, which is what lets two peers agree on a key by
/// exchanging only the salt.
///
/// # Errors
///
/// - `KeyDerivation` if the underlying PBKDF2 implementation rejects the
///   output length. Cannot happen with the fixed protocol parameters;
///   treated as fatal rather than silently substituting a key.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_SIZE]) -> Result<SessionKey, CryptoError> {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(SessionKey { key })
}

/// Generate a fresh salt from the OS CSPRNG.
///
/// Salts are not secret; they travel in the clear. Their job is to make
/// the derived key unique per epoch.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}
