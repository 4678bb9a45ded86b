//! Tag definition command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::expr::Expression;

use super::truncate;

pub fn cmd_tags_list(db: &Database) -> Result<()> {
    let tags = db.list_tags()?;

    if tags.is_empty() {
        println!("No tags defined. Add one with:");
        println!("  tally tags add '#online' 'merchant.online == true'");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────────────────────────────────────");

    for tag in tags {
        println!("   {:20} {}", tag.label, truncate(&tag.expression, 50));
    }

    Ok(())
}

pub fn cmd_tags_add(db: &Database, label: &str, expression: &str) -> Result<()> {
    // Reject bad expressions at definition time, not at first apply
    Expression::compile(expression)?;

    db.create_tag(label, expression)?;
    println!("✅ Created tag '{}'", label);

    Ok(())
}

pub fn cmd_tags_edit(db: &Database, label: &str, expression: &str) -> Result<()> {
    Expression::compile(expression)?;

    db.update_tag(label, expression)?;
    println!("✅ Updated tag '{}'", label);

    Ok(())
}

pub fn cmd_tags_delete(db: &Database, label: &str) -> Result<()> {
    db.delete_tag(label)?;
    println!("✅ Deleted tag '{}' (history entries are kept)", label);

    Ok(())
}
