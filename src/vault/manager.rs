//! The vault manager: lock state, master key custody, and entry CRUD.
//!
//! `VaultManager` is the only place the master key lives.  The key and the
//! loaded metadata are held together in a `Session`, which exists only
//! while the vault is unlocked; dropping it (on `lock`, `close`, or when
//! the manager goes out of scope) zeroes the key.
//!
//! Every entry operation checks for a session before touching the store,
//! so a locked manager never reads or writes entries.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::crypto::kdf::{self, Argon2Params};
use crate::crypto::{MasterHash, MasterKey};
use crate::errors::{PsstError, Result, ResultExt};
use crate::store::{CredentialStore, SqliteStore};

use super::entry::{EncryptedEntry, PasswordEntry, VaultMetadata, VAULT_FORMAT_VERSION};

/// Minimum master password length accepted by `init`.
pub const MIN_MASTER_PASSWORD_LEN: usize = 8;

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No metadata yet; only `init` is possible.
    Uninitialized,
    /// Initialized, key not in memory.
    Locked,
    /// Key in memory; entry operations are allowed.
    Unlocked,
}

/// Secrets held while unlocked.
struct Session {
    key: MasterKey,
    metadata: VaultMetadata,
}

/// Sequences init/unlock/lock and wraps entry reads and writes with
/// encryption.  One manager serves one session over one store.
pub struct VaultManager<S: CredentialStore = SqliteStore> {
    store: S,
    params: Argon2Params,
    initialized: bool,
    session: Option<Session>,
}

impl VaultManager<SqliteStore> {
    /// Open the vault database at `path` with default Argon2 parameters.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_params(path, Argon2Params::default())
    }

    /// Open the vault database at `path`.
    ///
    /// `params` are only used if the vault is initialized through this
    /// manager; unlocking uses the parameters recorded in the master hash.
    pub fn open_with_params(path: &Path, params: Argon2Params) -> Result<Self> {
        let store = SqliteStore::open(path).context("failed to open vault")?;
        Self::with_store(store, params)
    }
}

impl<S: CredentialStore> VaultManager<S> {
    /// Wrap an already-open store.  The manager starts Locked if the store
    /// holds metadata, Uninitialized otherwise.
    pub fn with_store(store: S, params: Argon2Params) -> Result<Self> {
        let initialized = store
            .get_metadata()
            .context("failed to get vault metadata")?
            .is_some();

        Ok(Self {
            store,
            params,
            initialized,
            session: None,
        })
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn state(&self) -> VaultState {
        if self.session.is_some() {
            VaultState::Unlocked
        } else if self.initialized {
            VaultState::Locked
        } else {
            VaultState::Uninitialized
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Metadata loaded at unlock time; `None` while locked.
    pub fn metadata(&self) -> Option<&VaultMetadata> {
        self.session.as_ref().map(|s| &s.metadata)
    }

    /// Path of the underlying store.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize a new vault and leave it unlocked.
    ///
    /// The key is only kept once both the schema and the metadata have been
    /// written; if either write fails the manager holds nothing.
    pub fn init(&mut self, master_password: &str) -> Result<()> {
        if self.initialized {
            return Err(PsstError::VaultAlreadyInitialized(
                self.store.path().to_path_buf(),
            ));
        }
        if master_password.chars().count() < MIN_MASTER_PASSWORD_LEN {
            return Err(PsstError::Validation(format!(
                "master password must be at least {MIN_MASTER_PASSWORD_LEN} characters"
            )));
        }

        let salt = kdf::generate_salt();
        let (hash, key) = kdf::derive_hash(master_password.as_bytes(), &salt, &self.params)
            .context("failed to derive master key")?;

        let now = Utc::now();
        let metadata = VaultMetadata {
            master_hash: hash.to_string(),
            created_at: now,
            last_access: now,
            version: VAULT_FORMAT_VERSION.to_string(),
        };

        self.store
            .initialize_schema()
            .context("failed to initialize database schema")?;
        self.store
            .save_metadata(&metadata)
            .context("failed to save vault metadata")?;

        self.initialized = true;
        self.session = Some(Session { key, metadata });
        info!(path = %self.store.path().display(), "vault initialized");
        Ok(())
    }

    /// Unlock the vault with `master_password`.
    ///
    /// Returns `Ok(false)` for a wrong password; that is an expected outcome,
    /// not an error.  If the password is right but recording the access time
    /// fails, the vault *is* unlocked and the persistence error is returned.
    pub fn unlock(&mut self, master_password: &str) -> Result<bool> {
        if self.session.is_some() {
            return Ok(true);
        }

        let mut metadata = self
            .store
            .get_metadata()
            .context("failed to get vault metadata")?
            .ok_or_else(|| PsstError::NotFound("vault metadata".into()))?;

        let hash: MasterHash = metadata.master_hash.parse().map_err(|e| {
            warn!(error = %e, "stored master hash rejected");
            PsstError::InvalidHashFormat(e)
        })?;

        let Some(key) = kdf::check_password(master_password.as_bytes(), &hash)
            .context("failed to verify master password")?
        else {
            info!("unlock rejected: wrong master password");
            return Ok(false);
        };

        metadata.last_access = Utc::now();
        self.initialized = true;
        self.session = Some(Session {
            key,
            metadata: metadata.clone(),
        });
        info!("vault unlocked");

        self.store
            .save_metadata(&metadata)
            .context("failed to update last access time")?;

        Ok(true)
    }

    /// Drop the key and metadata from memory.  Safe to call repeatedly.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            info!("vault locked");
        }
    }

    /// Close the store and lock.  A close failure is logged, not returned.
    pub fn close(mut self) {
        self.lock();
        if let Err(e) = self.store.close() {
            warn!(error = %e, "error closing vault database");
        }
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    /// Encrypt and store a new entry.  Returns the id the store assigned.
    pub fn create(&mut self, mut entry: PasswordEntry) -> Result<i64> {
        let session = unlocked(&self.session)?;
        validate_service(&entry.service)?;

        let now = Utc::now();
        entry.id = None;
        entry.created_at = now;
        entry.modified_at = now;
        entry.last_used_at = None;

        let ciphertext = session
            .key
            .encrypt_password(&entry.password)
            .context("failed to encrypt password")?;
        let mut encrypted = entry.to_encrypted(ciphertext);

        self.store
            .save_entry(&mut encrypted)
            .context("failed to save password entry")?;

        let id = encrypted
            .id
            .ok_or_else(|| PsstError::InvalidStoredData("store did not assign an id".into()))?;
        debug!(service = %entry.service, id, "created entry");
        Ok(id)
    }

    /// Fetch and decrypt the entry for `service`.
    pub fn read(&self, service: &str) -> Result<Option<PasswordEntry>> {
        let session = unlocked(&self.session)?;

        let Some(stored) = self
            .store
            .get_entry(service)
            .context("failed to get password entry")?
        else {
            return Ok(None);
        };

        decrypt_entry(&session.key, stored).map(Some)
    }

    /// Every entry, decrypted, ordered by service.
    pub fn list(&self) -> Result<Vec<PasswordEntry>> {
        let session = unlocked(&self.session)?;

        let stored = self
            .store
            .list_entries()
            .context("failed to list password entries")?;

        stored
            .into_iter()
            .map(|e| decrypt_entry(&session.key, e))
            .collect()
    }

    /// Replace the entry with the same `service`.
    ///
    /// The stored id, `created_at` and `last_used_at` are kept; everything
    /// else comes from `entry`.  The password is re-encrypted under a fresh
    /// nonce and `modified_at` is stamped.
    pub fn update(&mut self, entry: PasswordEntry) -> Result<()> {
        let session = unlocked(&self.session)?;
        validate_service(&entry.service)?;

        let existing = self
            .store
            .get_entry(&entry.service)
            .context("failed to get password entry")?
            .ok_or_else(|| PsstError::NotFound(format!("entry for '{}'", entry.service)))?;

        let ciphertext = session
            .key
            .encrypt_password(&entry.password)
            .context("failed to encrypt password")?;

        let mut updated = entry.to_encrypted(ciphertext);
        updated.id = existing.id;
        updated.created_at = existing.created_at;
        updated.last_used_at = existing.last_used_at;
        updated.modified_at = Utc::now();

        self.store
            .save_entry(&mut updated)
            .context("failed to update password entry")?;

        debug!(service = %entry.service, "updated entry");
        Ok(())
    }

    /// Remove the entry for `service` and its tags.
    ///
    /// Returns `false` when there was no such entry.
    pub fn delete(&mut self, service: &str) -> Result<bool> {
        unlocked(&self.session)?;

        self.store
            .delete_entry(service)
            .context("failed to delete password entry")
    }
}

/// The session, or `VaultLocked`.  Checked before any store access.
fn unlocked(session: &Option<Session>) -> Result<&Session> {
    session.as_ref().ok_or(PsstError::VaultLocked)
}

fn validate_service(service: &str) -> Result<()> {
    if service.trim().is_empty() {
        return Err(PsstError::Validation("service name cannot be empty".into()));
    }
    Ok(())
}

fn decrypt_entry(key: &MasterKey, stored: EncryptedEntry) -> Result<PasswordEntry> {
    let password = key
        .decrypt_password(&stored.password)
        .context(&format!("failed to decrypt password for '{}'", stored.service))?;
    Ok(stored.into_plain(password))
}
