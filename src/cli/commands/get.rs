//! `psst get`: show the credentials stored for a service.

use crate::cli::output;
use crate::cli::AppContext;
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(ctx: &AppContext, service: &str) -> Result<()> {
    let manager = ctx.open_unlocked()?;
    let result = manager.read(service);
    manager.close();

    match result? {
        Some(entry) => output::print_entry(&entry),
        None => {
            output::info(&format!("No entry for '{service}'."));
            output::tip("Run `psst list` to see all stored services.");
        }
    }

    Ok(())
}
