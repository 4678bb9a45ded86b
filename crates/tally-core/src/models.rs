//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::timestamp;

/// A Monzo account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

impl Account {
    /// Human-readable account type ("uk_retail" -> "Personal")
    pub fn type_display(&self) -> &str {
        match self.account_type.as_deref() {
            Some("uk_prepaid") => "Prepaid",
            Some("uk_retail") => "Personal",
            Some("uk_retail_joint") => "Joint",
            Some(other) => other,
            None => "Unknown",
        }
    }
}

/// Merchant details attached to a transaction (may be absent or null)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub address: Option<MerchantAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantAddress {
    /// ISO3 country code, e.g. "GBR"
    #[serde(default)]
    pub country: String,
}

/// A transaction with normalized timestamps.
///
/// The complete raw JSON object is retained alongside the typed fields:
/// expressions are evaluated against the raw field map, so fields the core
/// has no opinion about (amount, description, currency, ...) stay exactly as
/// the API sent them.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub notes: String,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    /// None = not yet settled
    pub settled: Option<DateTime<Utc>>,
    pub merchant: Option<Merchant>,
    fields: Value,
}

impl Transaction {
    /// Normalize a raw transaction object from the Monzo API.
    ///
    /// `created` must parse; `updated` must parse when present; `settled` is
    /// the only field permitted to be empty (meaning unsettled). Anything
    /// else is a hard error for the batch.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::InvalidData("transaction is not a JSON object".to_string()))?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidData("transaction missing id".to_string()))?
            .to_string();

        let notes = obj
            .get("notes")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let created = obj
            .get("created")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidData(format!("transaction {} missing created", id)))
            .and_then(timestamp::parse_instant)
            .map_err(|e| Error::InvalidData(format!("transaction {}: {}", id, e)))?;

        let updated = match obj.get("updated").and_then(Value::as_str) {
            Some(s) => Some(
                timestamp::parse_instant(s)
                    .map_err(|e| Error::InvalidData(format!("transaction {}: {}", id, e)))?,
            ),
            None => None,
        };

        let settled = match obj.get("settled").and_then(Value::as_str) {
            Some(s) => timestamp::parse_settled(s)
                .map_err(|e| Error::InvalidData(format!("transaction {}: {}", id, e)))?,
            None => None,
        };

        // Merchant is best-effort: absent, null, or an unexpected shape all
        // degrade to None rather than failing the batch.
        let merchant = obj
            .get("merchant")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Ok(Self {
            id,
            notes,
            created,
            updated,
            settled,
            merchant,
            fields: raw,
        })
    }

    /// Whether the transaction has settled
    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    /// Look up a raw field by path, e.g. `["merchant", "address", "country"]`
    pub fn field(&self, path: &[String]) -> Option<&Value> {
        let mut current = &self.fields;
        for segment in path {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// A user-defined tag with a membership expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// User-facing token, expected to start with '#'
    pub label: String,
    /// Source text of the boolean membership expression
    pub expression: String,
    pub created_at: DateTime<Utc>,
}

/// One audit record per bulk tagging operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    /// Tag label at the time of the operation (informational, survives tag edits)
    pub tag: String,
    /// Affected transaction IDs in the order they were applied
    pub txn_ids: Vec<String>,
    pub txns_affected: i64,
    pub created_at: DateTime<Utc>,
}

/// Single-row, process-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Most recently viewed account, used as the default for tagging commands
    pub last_used_account: Option<String>,
}

/// Time buckets for the per-transaction label tagger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBucket {
    Weekday,
    WeekdayShort,
    Month,
    MonthShort,
    WeekNumber,
    Year,
}

impl TimeBucket {
    pub fn all() -> &'static [TimeBucket] {
        &[
            Self::Weekday,
            Self::WeekdayShort,
            Self::Month,
            Self::MonthShort,
            Self::WeekNumber,
            Self::Year,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::WeekdayShort => "weekday-short",
            Self::Month => "month",
            Self::MonthShort => "month-short",
            Self::WeekNumber => "week-number",
            Self::Year => "year",
        }
    }

    fn strftime(&self) -> &'static str {
        match self {
            Self::Weekday => "%A",
            Self::WeekdayShort => "%a",
            Self::Month => "%B",
            Self::MonthShort => "%b",
            Self::WeekNumber => "week%W",
            Self::Year => "%Y",
        }
    }

    /// Derive the bucket label for an instant, e.g. `#week03` or `#friday`
    pub fn label_for(&self, instant: DateTime<Utc>) -> String {
        format!("#{}", instant.format(self.strftime())).to_lowercase()
    }
}

impl std::str::FromStr for TimeBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekday" => Ok(Self::Weekday),
            "weekday-short" => Ok(Self::WeekdayShort),
            "month" => Ok(Self::Month),
            "month-short" => Ok(Self::MonthShort),
            "week-number" | "week" => Ok(Self::WeekNumber),
            "year" => Ok(Self::Year),
            _ => Err(format!("Unknown time bucket: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
