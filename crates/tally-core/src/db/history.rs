//! Tagging history operations
//!
//! History is append-only: rows are created by the tagging engine after a
//! bulk apply with at least one affected transaction, and never mutated.

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::HistoryEntry;

/// Delimiter used to serialize the affected transaction ID list
const TXN_ID_DELIMITER: &str = "|";

impl Database {
    /// Record one bulk tagging operation.
    ///
    /// Callers only invoke this with a non-empty affected list ("no matches"
    /// and "all attempts failed" outcomes write no history).
    pub fn record_history(&self, tag: &str, txn_ids: &[String]) -> Result<i64> {
        if txn_ids.is_empty() {
            return Err(Error::Tag(
                "refusing to record history with no affected transactions".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO history (tag, txn_ids, txns_affected) VALUES (?, ?, ?)",
            params![
                tag,
                txn_ids.join(TXN_ID_DELIMITER),
                txn_ids.len() as i64
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent history entries, newest-first
    pub fn list_history(&self, limit: i64) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tag, txn_ids, txns_affected, created_at
             FROM history ORDER BY id DESC LIMIT ?",
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                let txn_ids: String = row.get(2)?;
                let created_at: String = row.get(4)?;
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    tag: row.get(1)?,
                    txn_ids: txn_ids
                        .split(TXN_ID_DELIMITER)
                        .map(str::to_string)
                        .collect(),
                    txns_affected: row.get(3)?,
                    created_at: parse_datetime(&created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }
}
