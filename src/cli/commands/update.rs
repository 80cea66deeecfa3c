//! `psst update`: change the credentials stored for a service.

use crate::cli::output;
use crate::cli::{read_entry_password, AppContext, EntryFields};
use crate::errors::Result;

/// Execute the `update` command.
///
/// Only the fields given on the command line change; tags, when given,
/// replace the whole set.
pub fn execute(
    ctx: &AppContext,
    service: &str,
    fields: &EntryFields,
    new_password: bool,
) -> Result<()> {
    let mut manager = ctx.open_unlocked()?;

    let mut entry = match manager.read(service) {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            manager.close();
            output::info(&format!("No entry for '{service}'."));
            output::tip(&format!("Run `psst add {service}` to create it."));
            return Ok(());
        }
        Err(e) => {
            manager.close();
            return Err(e);
        }
    };

    if let Some(username) = &fields.username {
        entry.username = username.clone();
    }
    if let Some(url) = &fields.url {
        entry.url = url.clone();
    }
    if let Some(notes) = &fields.notes {
        entry.notes = notes.clone();
    }
    if !fields.tags.is_empty() {
        entry.tags = fields.tags.iter().cloned().collect();
    }
    if new_password {
        match read_entry_password(service) {
            Ok(pw) => entry.password = pw,
            Err(e) => {
                manager.close();
                return Err(e);
            }
        }
    }

    let result = manager.update(entry);
    manager.close();
    result?;

    output::success(&format!("Updated credentials for '{service}'"));
    Ok(())
}
