//! Per-invocation context passed to every command.
//!
//! Built once in `main` from the parsed arguments; commands receive it by
//! reference instead of reading process-wide state.

use std::path::{Path, PathBuf};

use crate::cli::{output, prompt_master_password, Cli};
use crate::config::{default_home, Settings};
use crate::errors::{PsstError, Result};
use crate::vault::VaultManager;

pub struct AppContext {
    /// Directory holding the vault database and `config.toml`.
    pub home: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    /// Resolve the home directory (`--home`, `PSST_HOME`, or `~/.psst`)
    /// and load its settings.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let home = match &cli.home {
            Some(home) => home.clone(),
            None => default_home()?,
        };
        let settings = Settings::load(&home)?;
        Ok(Self { home, settings })
    }

    pub fn vault_path(&self) -> PathBuf {
        self.settings.vault_path(&self.home)
    }

    /// Open the vault without unlocking it.
    pub fn open_manager(&self) -> Result<VaultManager> {
        VaultManager::open_with_params(&self.vault_path(), self.settings.argon2_params())
    }

    /// Open the vault and unlock it with the master password.
    ///
    /// A missing vault file is reported without creating one.
    pub fn open_unlocked(&self) -> Result<VaultManager> {
        let path = self.vault_path();
        if !path.exists() {
            return Err(vault_not_found(&path));
        }

        let mut manager = self.open_manager()?;
        if !manager.is_initialized() {
            manager.close();
            return Err(vault_not_found(&path));
        }

        let password = prompt_master_password()?;
        match manager.unlock(&password) {
            Ok(true) => Ok(manager),
            Ok(false) => {
                manager.close();
                Err(PsstError::CommandFailed("wrong master password".into()))
            }
            // Unlocked, but the access time could not be recorded.
            Err(e) if manager.is_unlocked() => {
                output::warning(&e.to_string());
                Ok(manager)
            }
            Err(e) => {
                manager.close();
                Err(e)
            }
        }
    }
}

fn vault_not_found(path: &Path) -> PsstError {
    output::tip("Run `psst init` to create a vault.");
    PsstError::NotFound(format!("vault at {}", path.display()))
}
