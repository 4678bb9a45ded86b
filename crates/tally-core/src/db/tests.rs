//! Database layer tests

use super::Database;
use crate::error::Error;

fn setup() -> Database {
    Database::in_memory().unwrap()
}

#[test]
fn test_create_and_get_tag() {
    let db = setup();
    db.create_tag("#online", "merchant.online == true").unwrap();

    let tag = db.get_tag("#online").unwrap().unwrap();
    assert_eq!(tag.label, "#online");
    assert_eq!(tag.expression, "merchant.online == true");

    assert!(db.get_tag("#missing").unwrap().is_none());
}

#[test]
fn test_create_tag_rejects_duplicates() {
    let db = setup();
    db.create_tag("#online", "merchant.online == true").unwrap();

    let err = db.create_tag("#online", "amount < 0").unwrap_err();
    assert!(matches!(err, Error::Tag(_)));

    // Original expression untouched
    let tag = db.get_tag("#online").unwrap().unwrap();
    assert_eq!(tag.expression, "merchant.online == true");
}

#[test]
fn test_create_tag_validates_label() {
    let db = setup();
    assert!(db.create_tag("online", "amount < 0").is_err());
    assert!(db.create_tag("#", "amount < 0").is_err());
    assert!(db.create_tag("#two words", "amount < 0").is_err());
}

#[test]
fn test_update_tag_expression() {
    let db = setup();
    db.create_tag("#big", "amount < -1000").unwrap();
    db.update_tag("#big", "amount < -5000").unwrap();

    let tag = db.get_tag("#big").unwrap().unwrap();
    assert_eq!(tag.expression, "amount < -5000");

    assert!(matches!(
        db.update_tag("#missing", "amount < 0").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_list_tags_newest_first() {
    let db = setup();
    db.create_tag("#a", "amount < 0").unwrap();
    db.create_tag("#b", "amount < 0").unwrap();
    db.create_tag("#c", "amount < 0").unwrap();

    let labels: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.label).collect();
    assert_eq!(labels, vec!["#c", "#b", "#a"]);
}

#[test]
fn test_delete_tag() {
    let db = setup();
    db.create_tag("#gone", "amount < 0").unwrap();
    db.delete_tag("#gone").unwrap();
    assert!(db.get_tag("#gone").unwrap().is_none());

    assert!(matches!(
        db.delete_tag("#gone").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_history_roundtrip_preserves_order() {
    let db = setup();
    let ids = vec![
        "tx_3".to_string(),
        "tx_1".to_string(),
        "tx_2".to_string(),
    ];
    db.record_history("#online", &ids).unwrap();

    let entries = db.list_history(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, "#online");
    assert_eq!(entries[0].txn_ids, ids);
    assert_eq!(entries[0].txns_affected, 3);
}

#[test]
fn test_history_count_matches_id_list_length() {
    let db = setup();
    let ids: Vec<String> = (0..5).map(|i| format!("tx_{}", i)).collect();
    db.record_history("#batch", &ids).unwrap();

    let entry = &db.list_history(1).unwrap()[0];
    assert_eq!(entry.txns_affected as usize, entry.txn_ids.len());
}

#[test]
fn test_history_refuses_empty_affected_list() {
    let db = setup();
    assert!(db.record_history("#none", &[]).is_err());
    assert!(db.list_history(10).unwrap().is_empty());
}

#[test]
fn test_history_survives_tag_deletion() {
    let db = setup();
    db.create_tag("#temp", "amount < 0").unwrap();
    db.record_history("#temp", &["tx_1".to_string()]).unwrap();
    db.delete_tag("#temp").unwrap();

    let entries = db.list_history(10).unwrap();
    assert_eq!(entries[0].tag, "#temp");
}

#[test]
fn test_history_newest_first_with_limit() {
    let db = setup();
    for i in 0..5 {
        db.record_history(&format!("#t{}", i), &[format!("tx_{}", i)])
            .unwrap();
    }

    let entries = db.list_history(2).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].tag, "#t4");
    assert_eq!(entries[1].tag, "#t3");
}

#[test]
fn test_corrupt_stored_timestamp_is_an_error() {
    let db = setup();
    db.create_tag("#ok", "amount < 0").unwrap();

    let conn = db.conn().unwrap();
    conn.execute("UPDATE tags SET created_at = 'garbage' WHERE label = '#ok'", [])
        .unwrap();
    drop(conn);

    // Surfaced as an error, not a fabricated timestamp
    assert!(db.list_tags().is_err());
}

#[test]
fn test_settings_single_row_overwrite() {
    let db = setup();
    assert!(db.get_settings().unwrap().last_used_account.is_none());

    db.set_last_used_account("acc_1").unwrap();
    db.set_last_used_account("acc_2").unwrap();

    let settings = db.get_settings().unwrap();
    assert_eq!(settings.last_used_account.as_deref(), Some("acc_2"));
}

#[test]
fn test_encrypted_database_requires_key() {
    // Without TALLY_DB_KEY set, Database::new must refuse
    std::env::remove_var(super::DB_KEY_ENV);
    let err = Database::new("/tmp/tally_test_encrypted.db").unwrap_err();
    assert!(matches!(err, Error::Encryption(_)));
}
