//! Entry and metadata types.
//!
//! A credential exists in two shapes.  `PasswordEntry` carries the
//! plaintext password and is what callers of the manager see;
//! `EncryptedEntry` carries the ciphertext and is the only shape the
//! credential store accepts, so plaintext cannot reach the database by
//! construction.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

/// Version string written into the metadata of newly initialized vaults.
pub const VAULT_FORMAT_VERSION: &str = "1";

/// A credential with its password in plaintext.
///
/// The password is wiped from memory when the entry is dropped and is
/// redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordEntry {
    /// Store-assigned id; `None` until the entry has been saved.
    pub id: Option<i64>,

    /// Unique service name (e.g. "gmail").
    pub service: String,

    pub username: String,

    pub password: Zeroizing<String>,

    pub url: String,

    pub notes: String,

    pub tags: BTreeSet<String>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

impl PasswordEntry {
    /// Build a new, unsaved entry.  Timestamps are stamped by the manager.
    pub fn new(service: &str, username: &str, password: &str) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            service: service.to_string(),
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            url: String::new(),
            notes: String::new(),
            tags: BTreeSet::new(),
            created_at: now,
            modified_at: now,
            last_used_at: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Pair this entry's fields with an already-encrypted password.
    pub(crate) fn to_encrypted(&self, password: Vec<u8>) -> EncryptedEntry {
        EncryptedEntry {
            id: self.id,
            service: self.service.clone(),
            username: self.username.clone(),
            password,
            url: self.url.clone(),
            notes: self.notes.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            last_used_at: self.last_used_at,
        }
    }
}

impl fmt::Debug for PasswordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordEntry")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("url", &self.url)
            .field("notes", &self.notes)
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("modified_at", &self.modified_at)
            .field("last_used_at", &self.last_used_at)
            .finish()
    }
}

/// A credential as persisted: the password is `nonce || ciphertext || tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEntry {
    pub id: Option<i64>,
    pub service: String,
    pub username: String,
    pub password: Vec<u8>,
    pub url: String,
    pub notes: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl EncryptedEntry {
    /// Rebuild the plaintext-bearing entry around a decrypted password.
    pub(crate) fn into_plain(self, password: Zeroizing<String>) -> PasswordEntry {
        PasswordEntry {
            id: self.id,
            service: self.service,
            username: self.username,
            password,
            url: self.url,
            notes: self.notes,
            tags: self.tags,
            created_at: self.created_at,
            modified_at: self.modified_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// The vault's singleton metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultMetadata {
    /// Encoded `$argon2id$...` master hash.
    pub master_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub version: String,
}
