//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `client_from_env` - Build the Monzo client from environment variables
//! - `resolve_account` - Turn an optional --account flag into a concrete account ID
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::monzo::{first_open_account, MonzoClient, ACCESS_TOKEN_ENV};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_str().unwrap();
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Build a Monzo client from MONZO_ACCESS_TOKEN (and optionally MONZO_API_URL)
pub fn client_from_env() -> Result<MonzoClient> {
    MonzoClient::from_env().ok_or_else(|| {
        anyhow::anyhow!(
            "No Monzo credentials. Set {} with a bearer token from https://developers.monzo.com",
            ACCESS_TOKEN_ENV
        )
    })
}

/// Resolve the target account for a command.
///
/// An explicit --account wins and is remembered as the last used account.
/// Otherwise the last used account is reused; on a fresh database the first
/// non-closed Monzo account is picked and remembered.
pub async fn resolve_account(
    db: &Database,
    client: &MonzoClient,
    account: Option<&str>,
) -> Result<String> {
    if let Some(id) = account {
        db.set_last_used_account(id)?;
        return Ok(id.to_string());
    }

    if let Some(id) = db.get_settings()?.last_used_account {
        return Ok(id);
    }

    let account = first_open_account(client)
        .await?
        .context("No open Monzo accounts found")?;
    db.set_last_used_account(&account.id)?;

    Ok(account.id)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Export your token: export {}=...", ACCESS_TOKEN_ENV);
    println!("  2. Define a tag: tally tags add '#online' 'merchant.online == true'");
    println!("  3. Apply it: tally apply '#online'");

    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    let size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let tags = db.list_tags()?.len();
    let history = db.list_history(i64::MAX)?.len();
    let last_used = db.get_settings()?.last_used_account;

    println!();
    println!("📊 Database Status");
    println!("   ─────────────────────────────");
    println!("   Path: {}", db.path());
    println!("   Size: {} bytes", size);
    if db.is_encrypted()? {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED");
    }
    println!("   Tags defined: {}", tags);
    println!("   Tagging runs recorded: {}", history);
    match last_used {
        Some(id) => println!("   Last used account: {}", id),
        None => println!("   Last used account: (none)"),
    }

    Ok(())
}
