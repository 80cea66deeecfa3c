//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The 32-byte output is the *master secret*; it is
//! never stored or used directly.  `keys` expands it into the stored
//! verifier and the in-memory encryption key.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use sha2::{Digest, Sha256};

use crate::errors::{PsstError, Result};

use super::hash::MasterHash;
use super::keys::{self, MasterKey};

/// Length of the salt generated for a new vault (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the Argon2id output in bytes (256 bits).
pub const SECRET_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost accepted, in KiB (4 GB).
pub const MAX_MEMORY_KIB: u32 = 4_194_304;

/// Largest iteration count accepted.
pub const MAX_ITERATIONS: u32 = 64;

/// Largest number of lanes accepted.
pub const MAX_PARALLELISM: u32 = 255;

/// Configurable Argon2id parameters.
///
/// New vaults take these from `Settings`; existing vaults always use the
/// parameters recorded in their master hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Check the parameters against the floors and ceilings above.
    ///
    /// Parameters read back from a stored hash pass through here before
    /// Argon2 allocates anything.
    pub fn check_bounds(&self) -> std::result::Result<(), String> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(format!(
                "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            ));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            ));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(format!(
                "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            ));
        }
        Ok(())
    }
}

/// Run Argon2id over `password` and `salt`.
///
/// The same password + salt + params always produce the same secret.
/// Rejects parameters outside `Argon2Params::check_bounds`.
pub fn derive_master_secret(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; SECRET_LEN]> {
    argon2_params
        .check_bounds()
        .map_err(PsstError::KeyDerivationFailed)?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(SECRET_LEN),
    )
    .map_err(|e| PsstError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut secret = [0u8; SECRET_LEN];
    argon2
        .hash_password_into(password, salt, &mut secret)
        .map_err(|e| PsstError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(secret)
}

/// Derive a storable master hash and the matching encryption key.
///
/// The hash carries the salt, the parameters, and the verifier; the key
/// must stay in memory.
pub fn derive_hash(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<(MasterHash, MasterKey)> {
    let mut secret = derive_master_secret(password, salt, params)?;
    let split = keys::split_master_secret(&secret);
    secret.zeroize();
    let (verifier, key) = split?;

    let hash = MasterHash::new(*params, salt.to_vec(), verifier.to_vec());
    Ok((hash, key))
}

/// Check `password` against an encoded master hash.
///
/// Returns `false` for a wrong password and for any hash that fails to
/// parse or re-derive.
pub fn verify(password: &[u8], encoded_hash: &str) -> bool {
    match encoded_hash.parse::<MasterHash>() {
        Ok(hash) => matches!(check_password(password, &hash), Ok(Some(_))),
        Err(_) => false,
    }
}

/// Re-derive from the salt and parameters in `hash` and compare verifiers.
///
/// `Ok(Some(key))` on a match, `Ok(None)` on a mismatch.  Both verifiers
/// are hashed to fixed-length digests and compared in constant time.
pub fn check_password(password: &[u8], hash: &MasterHash) -> Result<Option<MasterKey>> {
    let (candidate, key) = derive_hash(password, hash.salt(), hash.params())?;

    let expected = Sha256::digest(hash.verifier());
    let actual = Sha256::digest(candidate.verifier());

    if bool::from(expected.ct_eq(&actual)) {
        Ok(Some(key))
    } else {
        Ok(None)
    }
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
