//! Tag matching and bulk note-update application
//!
//! One tagging operation runs fetch -> normalize -> match -> apply -> record
//! to completion. Updates are issued sequentially in batch order so the
//! affected-ID list recorded to history is deterministic. A failed update
//! skips that one transaction (it is left out of the affected list); a
//! credential failure aborts the whole request.

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::models::{Tag, TimeBucket, Transaction};
use crate::monzo::BankClient;

/// User-facing outcome of a bulk tagging operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// At least one transaction was tagged. `failed` counts transactions
    /// that matched but whose note update did not go through.
    Tagged { txn_ids: Vec<String>, failed: usize },
    /// No transactions matched the criteria (nothing was attempted)
    NoMatch,
    /// Transactions matched but every note update failed
    AllFailed { attempted: usize },
}

impl ApplyOutcome {
    pub fn txns_affected(&self) -> usize {
        match self {
            Self::Tagged { txn_ids, .. } => txn_ids.len(),
            Self::NoMatch | Self::AllFailed { .. } => 0,
        }
    }
}

/// Exact whitespace-delimited token check, so "#a" does not match inside "#ab"
pub fn has_tag_token(notes: &str, label: &str) -> bool {
    notes.split_whitespace().any(|token| token == label)
}

/// Tagging engine tying the bank client and the tag/history store together
pub struct TagEngine<'a, C: BankClient + ?Sized> {
    client: &'a C,
    db: &'a Database,
}

impl<'a, C: BankClient + ?Sized> TagEngine<'a, C> {
    pub fn new(client: &'a C, db: &'a Database) -> Self {
        Self { client, db }
    }

    /// Apply a user-defined tag to every matching, not-yet-tagged transaction
    /// in the account.
    ///
    /// The expression is compiled before anything is fetched or mutated, so a
    /// bad expression can never leave a partially tagged batch behind.
    pub async fn apply_tag(&self, account_id: &str, tag: &Tag) -> Result<ApplyOutcome> {
        let expr = Expression::compile(&tag.expression)?;
        let txns = self.fetch_normalized(account_id).await?;

        let mut pending = Vec::new();
        for txn in &txns {
            match expr.matches(txn) {
                Ok(true) => {
                    if !has_tag_token(&txn.notes, &tag.label) {
                        pending.push((txn, tag.label.clone()));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    // Missing/mismatched field on this transaction only
                    debug!("Skipping transaction {}: {}", txn.id, e);
                }
            }
        }

        self.apply_pending(&tag.label, pending).await
    }

    /// Tag every transaction with a label derived from its `created` instant.
    ///
    /// Unlike `apply_tag` there is no expression filter and the label varies
    /// per transaction (`#friday`, `#week03`, ...); the already-tagged filter
    /// and bulk-apply semantics are the same.
    pub async fn apply_time_bucket(
        &self,
        account_id: &str,
        bucket: TimeBucket,
    ) -> Result<ApplyOutcome> {
        let txns = self.fetch_normalized(account_id).await?;

        let mut pending = Vec::new();
        for txn in &txns {
            let label = bucket.label_for(txn.created);
            if !has_tag_token(&txn.notes, &label) {
                pending.push((txn, label));
            }
        }

        self.apply_pending(bucket.as_str(), pending).await
    }

    async fn fetch_normalized(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let raw = self.client.transactions(account_id).await?;
        raw.into_iter().map(Transaction::from_raw).collect()
    }

    /// Issue the note updates and record history.
    ///
    /// Best-effort: one failed update is logged and skipped, the rest of the
    /// batch continues. Auth failures poison everything downstream, so those
    /// abort immediately.
    async fn apply_pending(
        &self,
        history_label: &str,
        pending: Vec<(&Transaction, String)>,
    ) -> Result<ApplyOutcome> {
        if pending.is_empty() {
            return Ok(ApplyOutcome::NoMatch);
        }

        let attempted = pending.len();
        let mut affected = Vec::new();
        let mut failed = 0usize;

        for (txn, label) in pending {
            let new_notes = format!("{} {}", txn.notes, label);
            match self
                .client
                .update_transaction_notes(&txn.id, &new_notes)
                .await
            {
                Ok(_) => affected.push(txn.id.clone()),
                Err(Error::Auth(msg)) => return Err(Error::Auth(msg)),
                Err(e) => {
                    warn!("Failed to update notes on {}: {}", txn.id, e);
                    failed += 1;
                }
            }
        }

        if affected.is_empty() {
            return Ok(ApplyOutcome::AllFailed { attempted });
        }

        self.db.record_history(history_label, &affected)?;
        info!(
            "Tagged {} transactions with {} ({} failed)",
            affected.len(),
            history_label,
            failed
        );

        Ok(ApplyOutcome::Tagged {
            txn_ids: affected,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;
    use crate::test_utils::MockMonzoServer;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn tag(label: &str, expression: &str) -> Tag {
        Tag {
            label: label.to_string(),
            expression: expression.to_string(),
            created_at: Utc::now(),
        }
    }

    fn txn(id: &str, notes: &str, amount: i64, online: Option<bool>) -> Value {
        let mut raw = json!({
            "id": id,
            "notes": notes,
            "created": "2019-03-01T12:00:00.5Z",
            "amount": amount
        });
        if let Some(online) = online {
            raw["merchant"] = json!({ "online": online, "address": { "country": "GBR" } });
        }
        raw
    }

    fn setup_db() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn test_has_tag_token_is_exact() {
        assert!(has_tag_token("coffee #a #b", "#a"));
        assert!(!has_tag_token("coffee #ab", "#a"));
        assert!(!has_tag_token("", "#a"));
    }

    #[tokio::test]
    async fn test_apply_tag_matches_and_records_history() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![
            txn("tx_1", "", -600, Some(true)),
            txn("tx_2", "", -600, Some(false)),
            txn("tx_3", "", -600, None), // no merchant: skipped, not fatal
        ])
        .await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_tag("acc_1", &tag("#online", "merchant.online == true"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Tagged {
                txn_ids: vec!["tx_1".to_string()],
                failed: 0
            }
        );
        assert_eq!(server.notes_of("tx_1").as_deref(), Some(" #online"));
        assert_eq!(server.notes_of("tx_2").as_deref(), Some(""));

        let history = db.list_history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tag, "#online");
        assert_eq!(history[0].txn_ids, vec!["tx_1".to_string()]);
        assert_eq!(history[0].txns_affected, 1);

        server.stop();
    }

    #[tokio::test]
    async fn test_apply_tag_second_run_is_idempotent() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![txn("tx_1", "", -600, Some(true))]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);
        let online = tag("#online", "merchant.online == true");

        let first = engine.apply_tag("acc_1", &online).await.unwrap();
        assert_eq!(first.txns_affected(), 1);

        // The mock mutates its state, so the second run sees the tag in notes
        let second = engine.apply_tag("acc_1", &online).await.unwrap();
        assert_eq!(second, ApplyOutcome::NoMatch);
        assert_eq!(db.list_history(10).unwrap().len(), 1);

        server.stop();
    }

    #[tokio::test]
    async fn test_apply_tag_invalid_syntax_mutates_nothing() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![txn("tx_1", "", -600, Some(true))]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let err = engine
            .apply_tag("acc_1", &tag("#bad", "merchant.online =="))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Expression(_)));
        assert_eq!(server.update_count(), 0);
        assert!(db.list_history(10).unwrap().is_empty());

        server.stop();
    }

    #[tokio::test]
    async fn test_apply_tag_no_match_writes_no_history() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![txn("tx_1", "", 100, Some(false))]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_tag("acc_1", &tag("#online", "merchant.online == true"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::NoMatch);
        assert!(db.list_history(10).unwrap().is_empty());

        server.stop();
    }

    #[tokio::test]
    async fn test_remote_failure_skips_transaction_and_continues() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![
            txn("tx_1", "", -600, Some(true)),
            txn("tx_2", "", -600, Some(true)),
        ])
        .await;
        server.fail_update("tx_1");
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_tag("acc_1", &tag("#online", "merchant.online == true"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Tagged {
                txn_ids: vec!["tx_2".to_string()],
                failed: 1
            }
        );
        // The failed transaction never reaches history
        let history = db.list_history(10).unwrap();
        assert_eq!(history[0].txn_ids, vec!["tx_2".to_string()]);

        server.stop();
    }

    #[tokio::test]
    async fn test_all_updates_failing_is_distinguished_from_no_match() {
        let db = setup_db();
        let mut server = MockMonzoServer::start(vec![txn("tx_1", "", -600, Some(true))]).await;
        server.fail_update("tx_1");
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_tag("acc_1", &tag("#online", "merchant.online == true"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::AllFailed { attempted: 1 });
        assert!(db.list_history(10).unwrap().is_empty());

        server.stop();
    }

    #[tokio::test]
    async fn test_unparseable_created_aborts_batch() {
        let db = setup_db();
        let mut bad = txn("tx_1", "", -600, None);
        bad["created"] = json!("not-a-timestamp");
        let mut server = MockMonzoServer::start(vec![bad]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let err = engine
            .apply_tag("acc_1", &tag("#any", "amount < 0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(server.update_count(), 0);

        server.stop();
    }

    #[tokio::test]
    async fn test_time_bucket_year_spanning_two_years() {
        let db = setup_db();
        let mut a = txn("tx_1", "", -100, None);
        a["created"] = json!("2018-12-31T23:00:00Z");
        let mut b = txn("tx_2", "", -100, None);
        b["created"] = json!("2019-01-01T01:00:00Z");
        let mut server = MockMonzoServer::start(vec![a, b]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_time_bucket("acc_1", TimeBucket::Year)
            .await
            .unwrap();
        assert_eq!(outcome.txns_affected(), 2);
        assert_eq!(server.notes_of("tx_1").as_deref(), Some(" #2018"));
        assert_eq!(server.notes_of("tx_2").as_deref(), Some(" #2019"));

        let history = db.list_history(10).unwrap();
        assert_eq!(history[0].tag, "year");

        server.stop();
    }

    #[tokio::test]
    async fn test_time_bucket_skips_already_tagged() {
        let db = setup_db();
        let mut a = txn("tx_1", "lunch #friday", -100, None);
        a["created"] = json!("2019-01-18T09:00:00Z"); // a Friday
        let mut server = MockMonzoServer::start(vec![a]).await;
        let client = crate::monzo::MonzoClient::new(&server.url(), "t");
        let engine = TagEngine::new(&client, &db);

        let outcome = engine
            .apply_time_bucket("acc_1", TimeBucket::Weekday)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::NoMatch);
        assert_eq!(server.update_count(), 0);

        server.stop();
    }
}
