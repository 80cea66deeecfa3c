//! Key separation using HKDF-SHA256.
//!
//! From the Argon2id master secret we derive:
//! - The **verifier** written into the master hash, which proves a
//!   password is correct without revealing anything usable for decryption.
//! - The **encryption key** for entry passwords, which is never persisted.
//!
//! HKDF (RFC 5869) uses the master secret as input keying material and a
//! context string (`info`) to produce independent sub-keys.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{PsstError, Result};

use super::encryption::{decrypt, encrypt};

/// Length of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

const VERIFIER_INFO: &[u8] = b"psst-master-verifier";
const ENCRYPTION_INFO: &[u8] = b"psst-entry-encryption";

/// Expand the master secret into `(verifier, encryption key)`.
pub fn split_master_secret(secret: &[u8]) -> Result<([u8; KEY_LEN], MasterKey)> {
    let verifier = hkdf_derive(secret, VERIFIER_INFO)?;
    let mut key_bytes = hkdf_derive(secret, ENCRYPTION_INFO)?;
    let key = MasterKey::new(key_bytes);
    key_bytes.zeroize();
    Ok((verifier, key))
}

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The extract step is skipped because the secret already has high
/// entropy (it came from Argon2id).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| PsstError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// The vault's 32-byte encryption key.  Zeroed when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Encrypt a plaintext password for storage.
    pub fn encrypt_password(&self, plaintext: &str) -> Result<Vec<u8>> {
        encrypt(&self.bytes, plaintext.as_bytes())
    }

    /// Decrypt a stored password.
    ///
    /// Invalid UTF-8 is wiped before the error is returned.
    pub fn decrypt_password(&self, ciphertext: &[u8]) -> Result<Zeroizing<String>> {
        let plaintext_bytes = decrypt(&self.bytes, ciphertext)?;
        String::from_utf8(plaintext_bytes)
            .map(Zeroizing::new)
            .map_err(|e| {
                let mut bad_bytes = e.into_bytes();
                bad_bytes.zeroize();
                PsstError::InvalidStoredData("decrypted password is not valid UTF-8".into())
            })
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
