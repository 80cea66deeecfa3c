use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{PsstError, Result};

/// Name of the per-user directory under `$HOME`.
const HOME_DIR_NAME: &str = ".psst";

/// User configuration, loaded from `<home>/config.toml`.
///
/// Every field has a sensible default so psst works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault database file, relative to the psst home directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Seconds of inactivity before a session should auto-lock.
    /// Recognized here; not enforced by the vault manager.
    #[serde(default = "default_auto_lock_timeout_secs")]
    pub auto_lock_timeout_secs: u64,

    /// Argon2 memory cost in KiB for new vaults (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count for new vaults (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree for new vaults (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_db_file() -> String {
    "vault.db".to_string()
}

fn default_auto_lock_timeout_secs() -> u64 {
    15 * 60
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            auto_lock_timeout_secs: default_auto_lock_timeout_secs(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the psst home directory.
    const FILE_NAME: &'static str = "config.toml";

    /// Load settings from `<home>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = home.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PsstError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the vault database.
    ///
    /// Example: `~/.psst/vault.db`
    pub fn vault_path(&self, home: &Path) -> PathBuf {
        home.join(&self.db_file)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    pub fn auto_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_lock_timeout_secs)
    }
}

/// The default psst home directory: `~/.psst`.
pub fn default_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(HOME_DIR_NAME))
        .ok_or_else(|| PsstError::ConfigError("could not determine home directory".into()))
}

// ── Tests ────────────────────────────────────────────────────────────
