//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::PasswordEntry;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn join_tags(entry: &PasswordEntry) -> String {
    entry.tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Print a table of entries (Service, Username, URL, Tags, Modified).
/// Passwords are never shown here.
pub fn print_entries_table(entries: &[PasswordEntry]) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `psst add <SERVICE>` to store your first credentials.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Service", "Username", "URL", "Tags", "Modified"]);

    for e in entries {
        table.add_row(vec![
            e.service.clone(),
            e.username.clone(),
            e.url.clone(),
            join_tags(e),
            e.modified_at.format(TIME_FORMAT).to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a single entry, password included.
pub fn print_entry(entry: &PasswordEntry) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Service", entry.service.as_str()]);
    table.add_row(vec!["Username", entry.username.as_str()]);
    table.add_row(vec!["Password", entry.password.as_str()]);
    if !entry.url.is_empty() {
        table.add_row(vec!["URL", entry.url.as_str()]);
    }
    if !entry.notes.is_empty() {
        table.add_row(vec!["Notes", entry.notes.as_str()]);
    }
    if !entry.tags.is_empty() {
        table.add_row(vec!["Tags".to_string(), join_tags(entry)]);
    }
    table.add_row(vec![
        "Created".to_string(),
        entry.created_at.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Modified".to_string(),
        entry.modified_at.format(TIME_FORMAT).to_string(),
    ]);

    println!("{table}");
}
