//! Tagging history command implementation

use anyhow::Result;
use tally_core::db::Database;

use super::truncate;

pub fn cmd_history(db: &Database, limit: i64) -> Result<()> {
    let entries = db.list_history(limit)?;

    if entries.is_empty() {
        println!("No tagging runs recorded yet. Run 'tally apply <tag>' first.");
        return Ok(());
    }

    println!();
    println!("📜 Tagging History");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:19} │ {:15} │ {:>8} │ {}",
        "ID", "When (UTC)", "Tag", "Affected", "Transactions"
    );
    println!("   ─────┼─────────────────────┼─────────────────┼──────────┼─────────────────");

    for entry in entries {
        println!(
            "   {:>4} │ {:19} │ {:15} │ {:>8} │ {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&entry.tag, 15),
            entry.txns_affected,
            truncate(&entry.txn_ids.join(", "), 40)
        );
    }

    Ok(())
}
