//! Account summary statistics
//!
//! Pure computation over a fetched transaction batch: tag usage counts,
//! online vs in-store split and domestic vs abroad split. Rendering is up to
//! the caller.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::Transaction;

/// ISO3 country code treated as "home" by default
pub const DEFAULT_HOME_COUNTRY: &str = "GBR";

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\w+").expect("tag regex is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub txn_count: usize,
    /// Usage count per #tag token found across all notes
    pub tag_counts: HashMap<String, usize>,
    /// Total number of tag usages (sum of tag_counts values)
    pub tags_used: usize,
    pub online: usize,
    pub in_store: usize,
    pub domestic: usize,
    pub abroad: usize,
}

/// Summarize a transaction batch.
///
/// Transactions without merchant data count as in-store and abroad, matching
/// how the per-field splits treat missing data as "not the positive case".
pub fn summarize(txns: &[Transaction], home_country: &str) -> AccountSummary {
    let mut tag_counts: HashMap<String, usize> = HashMap::new();
    let mut online = 0;
    let mut domestic = 0;

    for txn in txns {
        for m in tag_re().find_iter(&txn.notes) {
            *tag_counts.entry(m.as_str().to_string()).or_insert(0) += 1;
        }

        if let Some(ref merchant) = txn.merchant {
            if merchant.online {
                online += 1;
            }
            let country = merchant
                .address
                .as_ref()
                .map(|address| address.country.as_str())
                .unwrap_or_default();
            if country == home_country {
                domestic += 1;
            }
        }
    }

    let txn_count = txns.len();
    AccountSummary {
        txn_count,
        tags_used: tag_counts.values().sum(),
        tag_counts,
        online,
        in_store: txn_count - online,
        domestic,
        abroad: txn_count - domestic,
    }
}
