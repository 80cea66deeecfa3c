//! Credential store: persistence for entries, tags, and vault metadata.
//!
//! The store only ever sees `EncryptedEntry` values; encryption happens
//! in the vault manager.  Every multi-statement write runs inside one
//! transaction and leaves prior state untouched on failure.

pub mod sqlite;

use std::path::Path;

use crate::errors::Result;
use crate::vault::entry::{EncryptedEntry, VaultMetadata};

pub use sqlite::SqliteStore;

/// Persistence operations the vault manager relies on.
pub trait CredentialStore {
    /// Where the store lives (a file path, or `:memory:`).
    fn path(&self) -> &Path;

    /// Create tables and indexes if they do not exist yet.
    fn initialize_schema(&self) -> Result<()>;

    /// Insert (`id == None`) or update (`id == Some`) an entry and replace
    /// its tag set.  On insert the new id is written back into `entry`.
    fn save_entry(&mut self, entry: &mut EncryptedEntry) -> Result<()>;

    fn get_entry(&self, service: &str) -> Result<Option<EncryptedEntry>>;

    /// All entries, ordered by service.
    fn list_entries(&self) -> Result<Vec<EncryptedEntry>>;

    /// Remove an entry and its tags.  Returns `false` if there was nothing
    /// to remove.
    fn delete_entry(&mut self, service: &str) -> Result<bool>;

    fn save_metadata(&mut self, metadata: &VaultMetadata) -> Result<()>;

    /// `None` when the vault has never been initialized.
    fn get_metadata(&self) -> Result<Option<VaultMetadata>>;

    /// Close the underlying connection.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
