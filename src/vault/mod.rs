//! Vault module: the lock/unlock state machine and its data types.
//!
//! This module provides:
//! - `PasswordEntry`, `EncryptedEntry`, and `VaultMetadata` (`entry`)
//! - `VaultManager`, the only holder of the master key (`manager`)

pub mod entry;
pub mod manager;

// Re-export the most commonly used items.
pub use entry::{EncryptedEntry, PasswordEntry, VaultMetadata, VAULT_FORMAT_VERSION};
pub use manager::{VaultManager, VaultState, MIN_MASTER_PASSWORD_LEN};
