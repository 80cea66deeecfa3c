//! `psst delete`: remove the credentials stored for a service.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::AppContext;
use crate::errors::{PsstError, Result};

/// Execute the `delete` command.
pub fn execute(ctx: &AppContext, service: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete credentials for '{service}'?"))
            .default(false)
            .interact()
            .map_err(|e| PsstError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let mut manager = ctx.open_unlocked()?;
    let result = manager.delete(service);
    manager.close();

    if result? {
        output::success(&format!("Deleted credentials for '{service}'"));
    } else {
        output::info(&format!("No entry for '{service}'."));
    }

    Ok(())
}
