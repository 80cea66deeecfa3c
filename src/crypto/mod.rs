//! Cryptographic primitives for psst.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation and verification (`kdf`)
//! - The strict `$argon2id$...` master hash format (`hash`)
//! - HKDF key separation and the zeroizing `MasterKey` (`keys`)

pub mod encryption;
pub mod hash;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_hash, ...};
pub use encryption::{decrypt, encrypt};
pub use hash::{HashFormatError, MasterHash};
pub use kdf::{check_password, derive_hash, generate_salt, verify, Argon2Params};
pub use keys::MasterKey;
