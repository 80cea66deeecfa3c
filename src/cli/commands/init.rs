//! `psst init`: create a new vault and set the master password.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{prompt_new_master_password, AppContext};
use crate::errors::{PsstError, Result, ResultExt};

/// Execute the `init` command.
///
/// An existing vault is only replaced after confirmation, or with `--force`.
pub fn execute(ctx: &AppContext, force: bool) -> Result<()> {
    let path = ctx.vault_path();

    // 1. Is there an initialized vault in the way?
    let existing = path.exists() && {
        let manager = ctx.open_manager()?;
        let initialized = manager.is_initialized();
        manager.close();
        initialized
    };

    if existing && !force && !confirm_overwrite(&path)? {
        output::info("Initialization cancelled.");
        return Ok(());
    }

    // 2. Prompt for a new master password (with confirmation) before
    //    anything is removed.
    let password = prompt_new_master_password()?;

    // 3. Remove the old vault.
    if existing {
        fs::remove_file(&path).context("failed to remove existing vault")?;
        output::warning(&format!("Removed existing vault at {}", path.display()));
    }

    // 4. Derive keys, write the schema and metadata.
    let mut manager = ctx.open_manager()?;
    manager.init(&password)?;
    output::success(&format!("Vault created at {}", manager.path().display()));
    manager.close();

    output::tip("Run `psst add <SERVICE>` to store credentials.");
    output::tip("Run `psst list` to see all stored services.");

    Ok(())
}

/// Ask before overwriting.  Without a terminal there is nobody to ask.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    if !io::stdin().is_terminal() {
        output::tip("Pass --force to overwrite it.");
        return Err(PsstError::VaultAlreadyInitialized(path.to_path_buf()));
    }

    Confirm::new()
        .with_prompt(format!(
            "Vault already exists at {}. Overwrite it? All stored credentials will be lost",
            path.display()
        ))
        .default(false)
        .interact()
        .map_err(|e| PsstError::CommandFailed(format!("confirm prompt: {e}")))
}
