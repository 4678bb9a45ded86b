//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Tag your bank transactions from the command line
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Rule-based tagging for Monzo transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, size, etc.)
    Status,

    /// List Monzo accounts
    Accounts,

    /// Show spending statistics for an account
    Summary {
        /// Account ID (defaults to the last used account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Manage tag definitions
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Apply a saved tag to every matching transaction
    Apply {
        /// Tag label, e.g. "#online"
        tag: String,

        /// Account ID (defaults to the last used account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Tag transactions by when they happened
    Bucket {
        /// Bucket kind: weekday, weekday-short, month, month-short, week-number, year
        period: String,

        /// Account ID (defaults to the last used account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show past tagging operations
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// Define a new tag
    Add {
        /// Tag label, must start with '#'
        label: String,

        /// Match expression, e.g. "merchant.online == true and amount < -500"
        expression: String,
    },

    /// Replace an existing tag's expression
    Edit {
        /// Tag label
        label: String,

        /// New match expression
        expression: String,
    },

    /// Delete a tag definition (history is kept)
    Delete {
        /// Tag label
        label: String,
    },
}
