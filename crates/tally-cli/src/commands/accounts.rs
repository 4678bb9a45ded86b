//! Account listing and summary command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::Transaction;
use tally_core::monzo::BankClient;
use tally_core::summary::{summarize, DEFAULT_HOME_COUNTRY};

use super::{client_from_env, resolve_account};

pub async fn cmd_accounts(db: &Database) -> Result<()> {
    let client = client_from_env()?;
    let accounts = client.accounts().await?;

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    let last_used = db.get_settings()?.last_used_account;

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");

    for account in accounts {
        let marker = if last_used.as_deref() == Some(&account.id) {
            " (last used)"
        } else {
            ""
        };
        let status = if account.closed { "closed" } else { "open" };
        println!(
            "   {:30} {:15} {}{}",
            account.id,
            account.type_display(),
            status,
            marker
        );
    }

    Ok(())
}

pub async fn cmd_summary(db: &Database, account: Option<&str>) -> Result<()> {
    let client = client_from_env()?;
    let account_id = resolve_account(db, &client, account).await?;

    let raw = client.transactions(&account_id).await?;
    let txns = raw
        .into_iter()
        .map(Transaction::from_raw)
        .collect::<tally_core::Result<Vec<_>>>()?;

    let summary = summarize(&txns, DEFAULT_HOME_COUNTRY);

    println!();
    println!("📊 Account {}", account_id);
    println!("   ─────────────────────────────");
    println!("   Transactions: {}", summary.txn_count);
    println!(
        "   Online: {} / In store: {}",
        summary.online, summary.in_store
    );
    println!(
        "   Domestic ({}): {} / Abroad: {}",
        DEFAULT_HOME_COUNTRY, summary.domestic, summary.abroad
    );
    println!("   Tag usages: {}", summary.tags_used);

    if !summary.tag_counts.is_empty() {
        // Most used first, label as tiebreak for stable output
        let mut counts: Vec<_> = summary.tag_counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        println!();
        println!("   Tags:");
        for (label, count) in counts {
            println!("   {:20} {}", label, count);
        }
    }

    Ok(())
}
