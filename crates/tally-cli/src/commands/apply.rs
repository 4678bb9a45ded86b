//! Bulk tagging command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::TimeBucket;
use tally_core::tagger::{ApplyOutcome, TagEngine};

use super::{client_from_env, resolve_account};

pub async fn cmd_apply(db: &Database, label: &str, account: Option<&str>) -> Result<()> {
    let tag = db
        .get_tag(label)?
        .ok_or_else(|| anyhow::anyhow!("Tag '{}' not defined. See 'tally tags'.", label))?;

    let client = client_from_env()?;
    let account_id = resolve_account(db, &client, account).await?;

    println!("🏷️  Applying '{}' to account {}...", label, account_id);

    let engine = TagEngine::new(&client, db);
    let outcome = engine.apply_tag(&account_id, &tag).await?;
    report_outcome(label, &outcome);

    Ok(())
}

pub async fn cmd_bucket(db: &Database, period: &str, account: Option<&str>) -> Result<()> {
    let bucket: TimeBucket = period.parse().map_err(|e: String| {
        anyhow::anyhow!(
            "{} (valid periods: weekday, weekday-short, month, month-short, week-number, year)",
            e
        )
    })?;

    let client = client_from_env()?;
    let account_id = resolve_account(db, &client, account).await?;

    println!(
        "📅 Tagging account {} by {}...",
        account_id,
        bucket.as_str()
    );

    let engine = TagEngine::new(&client, db);
    let outcome = engine.apply_time_bucket(&account_id, bucket).await?;
    report_outcome(bucket.as_str(), &outcome);

    Ok(())
}

fn report_outcome(label: &str, outcome: &ApplyOutcome) {
    match outcome {
        ApplyOutcome::Tagged { txn_ids, failed } => {
            println!("✅ Tagged {} transactions with '{}'", txn_ids.len(), label);
            if *failed > 0 {
                println!("   ⚠️  {} note updates failed and were skipped", failed);
            }
        }
        ApplyOutcome::NoMatch => {
            println!("No matching untagged transactions. Nothing to do.");
        }
        ApplyOutcome::AllFailed { attempted } => {
            println!(
                "⚠️  {} transactions matched but every note update failed. No history recorded.",
                attempted
            );
        }
    }
}
