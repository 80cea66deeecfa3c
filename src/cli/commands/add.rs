//! `psst add`: store credentials for a new service.

use crate::cli::output;
use crate::cli::{read_entry_password, AppContext, EntryFields};
use crate::errors::Result;
use crate::vault::PasswordEntry;

/// Execute the `add` command.
pub fn execute(ctx: &AppContext, service: &str, fields: &EntryFields) -> Result<()> {
    let mut manager = ctx.open_unlocked()?;

    // Read the password only once the vault is open, so a piped stdin is
    // not consumed by a failed unlock.
    let password = read_entry_password(service)?;

    let entry = PasswordEntry::new(
        service,
        fields.username.as_deref().unwrap_or_default(),
        &password,
    )
    .with_url(fields.url.as_deref().unwrap_or_default())
    .with_notes(fields.notes.as_deref().unwrap_or_default())
    .with_tags(fields.tags.iter().cloned());

    let result = manager.create(entry);
    manager.close();
    result?;

    output::success(&format!("Stored credentials for '{service}'"));
    output::tip(&format!("Run `psst get {service}` to view them."));

    Ok(())
}
