//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rejected credentials. Aborts the whole request.
    #[error("Monzo rejected credentials: {0}")]
    Auth(String),

    /// A Monzo call failed for reasons other than auth.
    #[error("Monzo request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream data the core cannot proceed with, e.g. an unparseable
    /// `created` timestamp. Aborts the whole batch.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The tag's expression failed to parse. Surfaced to the user as a
    /// configuration problem, never silently swallowed.
    #[error("Problem with your tag expression: {0}")]
    Expression(String),

    #[error("Tag error: {0}")]
    Tag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
