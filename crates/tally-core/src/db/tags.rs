//! Tag definition operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Tag;

impl Database {
    /// Create a tag. The label is the primary key and must start with '#'.
    pub fn create_tag(&self, label: &str, expression: &str) -> Result<()> {
        validate_label(label)?;

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tags (label, expression) VALUES (?, ?)",
            params![label, expression],
        )?;

        if inserted == 0 {
            return Err(Error::Tag(format!("Tag '{}' already exists", label)));
        }

        Ok(())
    }

    /// Replace a tag's expression
    pub fn update_tag(&self, label: &str, expression: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE tags SET expression = ? WHERE label = ?",
            params![expression, label],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Tag '{}'", label)));
        }

        Ok(())
    }

    pub fn get_tag(&self, label: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        let tag = conn
            .query_row(
                "SELECT label, expression, created_at FROM tags WHERE label = ?",
                params![label],
                row_to_tag,
            )
            .ok();

        Ok(tag)
    }

    /// All tags, newest-first
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT label, expression, created_at FROM tags ORDER BY created_at DESC, label DESC",
        )?;

        let tags = stmt
            .query_map([], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    pub fn delete_tag(&self, label: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tags WHERE label = ?", params![label])?;

        if deleted == 0 {
            return Err(Error::NotFound(format!("Tag '{}'", label)));
        }

        Ok(())
    }
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    let created_at: String = row.get(2)?;
    Ok(Tag {
        label: row.get(0)?,
        expression: row.get(1)?,
        created_at: parse_datetime(&created_at)?,
    })
}

fn validate_label(label: &str) -> Result<()> {
    if !label.starts_with('#') || label.len() < 2 {
        return Err(Error::Tag(format!(
            "Tag label must start with '#' and have at least one character: '{}'",
            label
        )));
    }
    if label.split_whitespace().count() != 1 {
        return Err(Error::Tag(format!(
            "Tag label must be a single token: '{}'",
            label
        )));
    }
    Ok(())
}
