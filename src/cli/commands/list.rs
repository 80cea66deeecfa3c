//! `psst list`: show every stored service, without passwords.

use crate::cli::output;
use crate::cli::AppContext;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(ctx: &AppContext) -> Result<()> {
    let manager = ctx.open_unlocked()?;
    let result = manager.list();
    manager.close();

    output::print_entries_table(&result?);
    Ok(())
}
