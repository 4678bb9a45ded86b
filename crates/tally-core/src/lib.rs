//! Tally Core Library
//!
//! Shared functionality for the Tally transaction tagging tool:
//! - Encrypted SQLite store for tags, history, and settings
//! - Monzo API client behind a pluggable bank trait
//! - Fixed-precision timestamp normalization
//! - Sandboxed boolean expression language for tag criteria
//! - Bulk tagging engine with idempotent note updates and history
//! - Time-bucket tagging (weekday, month, week number, year)
//! - Account summary statistics

pub mod db;
pub mod error;
pub mod expr;
pub mod models;
pub mod monzo;
pub mod summary;
pub mod tagger;
pub mod timestamp;

/// Test utilities including mock Monzo server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use db::Database;
pub use error::{Error, Result};
pub use expr::{EvalError, Expression};
pub use models::{Account, HistoryEntry, Merchant, Settings, Tag, TimeBucket, Transaction};
pub use monzo::{first_open_account, BankClient, MonzoClient};
pub use summary::{summarize, AccountSummary};
pub use tagger::{has_tag_token, ApplyOutcome, TagEngine};
pub use timestamp::{parse_instant, parse_settled};
