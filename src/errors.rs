use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::hash::HashFormatError;

/// All errors that can occur in psst.
#[derive(Debug, Error)]
pub enum PsstError {
    // --- Validation errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    // --- Lookup errors ---
    #[error("{0} not found")]
    NotFound(String),

    // --- Access errors ---
    #[error("Vault is locked, please unlock the vault first")]
    VaultLocked,

    #[error("Vault already initialized at {0}")]
    VaultAlreadyInitialized(PathBuf),

    #[error("An entry for '{0}' already exists (use `update` to change it)")]
    EntryAlreadyExists(String),

    // --- Crypto errors ---
    #[error("invalid master hash format: {0}")]
    InvalidHashFormat(#[from] HashFormatError),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Stored data is corrupted: {0}")]
    InvalidStoredData(String),

    // --- Storage errors ---
    #[error("Storage error: {context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    // --- Annotation ---
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PsstError>,
    },
}

/// Broad classes of failure, used by callers that only care about the
/// category (e.g. "was this a wrong-state error or a disk error?").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Access,
    Crypto,
    Storage,
    Config,
    Command,
}

impl PsstError {
    /// Wrap a SQLite error with the store operation that produced it.
    pub fn storage(context: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage { context, source }
    }

    /// Classify this error. Annotations added with `context` are looked through.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::VaultLocked | Self::VaultAlreadyInitialized(_) | Self::EntryAlreadyExists(_) => {
                ErrorKind::Access
            }
            Self::InvalidHashFormat(_)
            | Self::EncryptionFailed(_)
            | Self::DecryptionFailed
            | Self::KeyDerivationFailed(_)
            | Self::InvalidKeyLength(_)
            | Self::InvalidStoredData(_) => ErrorKind::Crypto,
            Self::Storage { .. } | Self::Io(_) => ErrorKind::Storage,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::CommandFailed(_) => ErrorKind::Command,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// The innermost error, with every `Context` layer removed.
    pub fn root(&self) -> &PsstError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Annotate a failing result with the operation that was running.
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T, E: Into<PsstError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| PsstError::Context {
            context: context.to_string(),
            source: Box::new(e.into()),
        })
    }
}

/// Convenience type alias for psst results.
pub type Result<T> = std::result::Result<T, PsstError>;
