//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod context;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::errors::{PsstError, Result};
use crate::vault::MIN_MASTER_PASSWORD_LEN;

pub use context::AppContext;

/// psst: please safely store this.
#[derive(Parser)]
#[command(name = "psst", about = "Encrypted local credential vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// psst home directory holding the vault and config (default: ~/.psst)
    #[arg(long, env = "PSST_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Print diagnostic logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize a new vault
    Init {
        /// Overwrite an existing vault without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Store credentials for a new service
    Add {
        /// Service name (e.g. gmail)
        service: String,

        #[command(flatten)]
        fields: EntryFields,
    },

    /// Show the credentials stored for a service
    Get {
        /// Service name
        service: String,
    },

    /// List all stored services
    List,

    /// Change the credentials stored for a service
    Update {
        /// Service name
        service: String,

        #[command(flatten)]
        fields: EntryFields,

        /// Prompt for a new password
        #[arg(short, long)]
        password: bool,
    },

    /// Delete the credentials stored for a service
    Delete {
        /// Service name
        service: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Optional entry fields shared by `add` and `update`.
#[derive(clap::Args, Default)]
pub struct EntryFields {
    /// Username or login
    #[arg(short, long)]
    pub username: Option<String>,

    /// Website or service URL
    #[arg(long)]
    pub url: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Tag (repeatable); given tags replace the existing set
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the master password, trying in order:
/// 1. `PSST_PASSWORD` env var (scripts, tests)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_master_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter master password")
        .interact()
        .map_err(|e| PsstError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation (used during `init`).
///
/// Also respects `PSST_PASSWORD` for scripted usage.
/// Enforces a minimum password length.
pub fn prompt_new_master_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        if pw.chars().count() < MIN_MASTER_PASSWORD_LEN {
            return Err(PsstError::Validation(format!(
                "master password must be at least {MIN_MASTER_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| PsstError::CommandFailed(format!("password prompt: {e}")))?;

        if password.chars().count() < MIN_MASTER_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_MASTER_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Read the password to store for `service`.
///
/// Piped stdin is used when stdin is not a terminal; otherwise the user
/// is prompted without echo.  Only the final line ending is removed from
/// piped input; any other whitespace is part of the password.
pub fn read_entry_password(service: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let password = Zeroizing::new(strip_line_ending(&buf).to_string());
        if password.is_empty() {
            return Err(PsstError::Validation("password cannot be empty".into()));
        }
        return Ok(password);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for {service}"))
        .interact()
        .map_err(|e| PsstError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Drop a single trailing `\n` or `\r\n`.
fn strip_line_ending(input: &str) -> &str {
    match input.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => input,
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var("PSST_PASSWORD") {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}
