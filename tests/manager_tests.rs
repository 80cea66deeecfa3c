//! Integration tests for the vault manager: lifecycle, locking, and CRUD.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::Connection;

use psst::crypto::Argon2Params;
use psst::errors::{ErrorKind, PsstError};
use psst::vault::{PasswordEntry, VaultManager, VaultState};
use tempfile::TempDir;

const FAST: Argon2Params = Argon2Params {
    memory_kib: 8192,
    iterations: 1,
    parallelism: 1,
};

const MASTER: &str = "correct-horse-battery";

/// Helper: a temp dir and the vault path inside it.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("vault.db");
    (dir, path)
}

fn open(path: &Path) -> VaultManager {
    VaultManager::open_with_params(path, FAST).expect("open vault")
}

/// Helper: an initialized, unlocked vault.
fn unlocked_vault() -> (TempDir, VaultManager) {
    let (dir, path) = vault_path();
    let mut vault = open(&path);
    vault.init(MASTER).expect("init vault");
    (dir, vault)
}

fn gmail() -> PasswordEntry {
    PasswordEntry::new("gmail", "me@gmail.com", "p@ssw0rd!")
        .with_url("https://mail.google.com")
        .with_notes("recovery codes in the safe")
        .with_tags(["email", "personal"])
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_close_reopen_unlock() {
    let (_dir, path) = vault_path();

    let mut vault = open(&path);
    assert_eq!(vault.state(), VaultState::Uninitialized);
    vault.init(MASTER).unwrap();
    assert_eq!(vault.state(), VaultState::Unlocked);
    let created = vault.metadata().unwrap().created_at;
    vault.close();

    let mut vault = open(&path);
    assert_eq!(vault.state(), VaultState::Locked);
    assert!(vault.unlock(MASTER).unwrap());
    assert!(vault.is_unlocked());

    let meta = vault.metadata().unwrap();
    assert_eq!(meta.created_at, created);
    assert!(meta.last_access >= created);
    assert!(meta.master_hash.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
}

#[test]
fn wrong_password_is_not_an_error() {
    let (_dir, path) = vault_path();
    open(&path).init(MASTER).unwrap();

    let mut vault = open(&path);
    assert!(!vault.unlock("not-the-password").unwrap());
    assert_eq!(vault.state(), VaultState::Locked);
    assert!(vault.metadata().is_none());
}

#[test]
fn unlock_when_already_unlocked_is_ok() {
    let (_dir, mut vault) = unlocked_vault();
    assert!(vault.unlock("ignored-while-unlocked").unwrap());
}

#[test]
fn init_twice_is_rejected() {
    let (_dir, path) = vault_path();
    open(&path).init(MASTER).unwrap();

    let mut vault = open(&path);
    let err = vault.init("another-password").unwrap_err();
    assert!(matches!(err, PsstError::VaultAlreadyInitialized(_)));

    // The original password still works.
    assert!(vault.unlock(MASTER).unwrap());
}

#[test]
fn short_master_password_is_rejected() {
    let (_dir, path) = vault_path();
    let mut vault = open(&path);

    let err = vault.init("short").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(vault.state(), VaultState::Uninitialized);
}

#[test]
fn locked_vault_rejects_entry_operations() {
    let (_dir, mut vault) = unlocked_vault();
    vault.lock();
    vault.lock();
    assert_eq!(vault.state(), VaultState::Locked);

    assert!(matches!(vault.create(gmail()), Err(PsstError::VaultLocked)));
    assert!(matches!(vault.read("gmail"), Err(PsstError::VaultLocked)));
    assert!(matches!(vault.list(), Err(PsstError::VaultLocked)));
    assert!(matches!(vault.update(gmail()), Err(PsstError::VaultLocked)));
    assert!(matches!(vault.delete("gmail"), Err(PsstError::VaultLocked)));
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[test]
fn create_and_read_roundtrip() {
    let (_dir, mut vault) = unlocked_vault();

    let id = vault.create(gmail()).unwrap();
    let entry = vault.read("gmail").unwrap().expect("entry exists");

    assert_eq!(entry.id, Some(id));
    assert_eq!(entry.username, "me@gmail.com");
    assert_eq!(entry.password.as_str(), "p@ssw0rd!");
    assert_eq!(entry.url, "https://mail.google.com");
    assert_eq!(entry.notes, "recovery codes in the safe");
    assert_eq!(
        entry.tags.iter().map(String::as_str).collect::<Vec<_>>(),
        ["email", "personal"]
    );
    assert_eq!(entry.created_at, entry.modified_at);
    assert!(entry.last_used_at.is_none());
}

#[test]
fn entries_survive_reopen() {
    let (_dir, path) = vault_path();
    {
        let mut vault = open(&path);
        vault.init(MASTER).unwrap();
        vault.create(gmail()).unwrap();
        vault.close();
    }

    let mut vault = open(&path);
    assert!(vault.unlock(MASTER).unwrap());
    let entry = vault.read("gmail").unwrap().unwrap();
    assert_eq!(entry.password.as_str(), "p@ssw0rd!");
}

#[test]
fn read_missing_is_none() {
    let (_dir, vault) = unlocked_vault();
    assert!(vault.read("nope").unwrap().is_none());
}

#[test]
fn duplicate_service_is_an_access_error() {
    let (_dir, mut vault) = unlocked_vault();
    vault.create(gmail()).unwrap();

    let err = vault.create(gmail()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Access);
    assert!(matches!(err.root(), PsstError::EntryAlreadyExists(s) if s == "gmail"));
}

#[test]
fn blank_service_is_rejected() {
    let (_dir, mut vault) = unlocked_vault();
    let err = vault
        .create(PasswordEntry::new("   ", "user", "pw"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn list_decrypts_all_entries_in_service_order() {
    let (_dir, mut vault) = unlocked_vault();
    vault
        .create(PasswordEntry::new("zoom", "z", "zz-pass"))
        .unwrap();
    vault.create(gmail()).unwrap();
    vault
        .create(PasswordEntry::new("aws", "root", "aws-pass"))
        .unwrap();

    let entries = vault.list().unwrap();
    let summary: Vec<_> = entries
        .iter()
        .map(|e| (e.service.as_str(), e.password.as_str()))
        .collect();
    assert_eq!(
        summary,
        [("aws", "aws-pass"), ("gmail", "p@ssw0rd!"), ("zoom", "zz-pass")]
    );
}

#[test]
fn update_keeps_identity_and_creation_time() {
    let (_dir, mut vault) = unlocked_vault();
    let id = vault.create(gmail()).unwrap();
    let before = vault.read("gmail").unwrap().unwrap();

    let mut changed = before.clone();
    changed.username = "new@gmail.com".into();
    changed.password = "n3w-p@ss".to_string().into();
    changed.tags = ["email".to_string()].into_iter().collect();
    vault.update(changed).unwrap();

    let after = vault.read("gmail").unwrap().unwrap();
    assert_eq!(after.id, Some(id));
    assert_eq!(after.created_at, before.created_at);
    assert!(after.modified_at >= before.modified_at);
    assert_eq!(after.username, "new@gmail.com");
    assert_eq!(after.password.as_str(), "n3w-p@ss");
    assert_eq!(after.tags.len(), 1);
}

#[test]
fn update_missing_entry_is_not_found() {
    let (_dir, mut vault) = unlocked_vault();
    let err = vault.update(gmail()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn delete_entry() {
    let (_dir, mut vault) = unlocked_vault();
    vault.create(gmail()).unwrap();

    assert!(vault.delete("gmail").unwrap());
    assert!(vault.read("gmail").unwrap().is_none());
    assert!(!vault.delete("gmail").unwrap());
}

// ---------------------------------------------------------------------------
// At-rest protection
// ---------------------------------------------------------------------------

#[test]
fn plaintext_password_never_reaches_disk() {
    let (_dir, path) = vault_path();
    let secret = "plaintext-marker-7f3a9c";
    {
        let mut vault = open(&path);
        vault.init(MASTER).unwrap();
        vault
            .create(PasswordEntry::new("bank", "me", secret))
            .unwrap();
        vault.close();
    }

    let raw = fs::read(&path).unwrap();
    let needle = secret.as_bytes();
    assert!(
        !raw.windows(needle.len()).any(|w| w == needle),
        "plaintext password found in the database file"
    );
    let master = MASTER.as_bytes();
    assert!(!raw.windows(master.len()).any(|w| w == master));
}

#[test]
fn corrupted_ciphertext_is_a_crypto_error() {
    let (_dir, path) = vault_path();
    {
        let mut vault = open(&path);
        vault.init(MASTER).unwrap();
        vault.create(gmail()).unwrap();
        vault.close();
    }

    // Valid base64, but not a ciphertext produced under this key.
    let garbage = BASE64.encode([0x5Au8; 40]);
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE entries SET password = ?1 WHERE service = 'gmail'",
        [&garbage],
    )
    .unwrap();
    drop(conn);

    let mut vault = open(&path);
    assert!(vault.unlock(MASTER).unwrap());

    let err = vault.read("gmail").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert!(matches!(err.root(), PsstError::DecryptionFailed));

    let err = vault.list().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert!(matches!(err.root(), PsstError::DecryptionFailed));
}
