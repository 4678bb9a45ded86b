//! Single-row settings operations

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::Settings;

impl Database {
    /// Overwrite the most recently viewed account
    pub fn set_last_used_account(&self, account_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO settings (id, last_used_account) VALUES (1, ?)
             ON CONFLICT(id) DO UPDATE SET last_used_account = excluded.last_used_account",
            params![account_id],
        )?;

        Ok(())
    }

    pub fn get_settings(&self) -> Result<Settings> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                "SELECT last_used_account FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        last_used_account: row.get(0)?,
                    })
                },
            )
            .unwrap_or_default();

        Ok(settings)
    }
}
