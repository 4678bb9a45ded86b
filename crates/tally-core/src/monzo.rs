//! Monzo API client abstraction
//!
//! The tagging engine only needs two capabilities from the bank: fetch a
//! batch of transactions and rewrite one transaction's notes. `BankClient`
//! is the seam; `MonzoClient` is the real reqwest-backed implementation and
//! the mock server in `test_utils` stands in for it in tests.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Account;

/// Environment variable holding the Monzo bearer token
pub const ACCESS_TOKEN_ENV: &str = "MONZO_ACCESS_TOKEN";

/// Environment variable overriding the API base URL (for testing)
pub const API_URL_ENV: &str = "MONZO_API_URL";

const DEFAULT_API_URL: &str = "https://api.monzo.com";

/// Trait defining the banking capabilities the tagging engine consumes
#[async_trait]
pub trait BankClient: Send + Sync {
    /// List the user's accounts
    async fn accounts(&self) -> Result<Vec<Account>>;

    /// Fetch all transactions for an account as raw JSON objects.
    ///
    /// Normalization (timestamps, merchant shape) is the core's job, so the
    /// client hands back exactly what the wire carried.
    async fn transactions(&self, account_id: &str) -> Result<Vec<Value>>;

    /// Replace a transaction's notes, returning the updated transaction
    async fn update_transaction_notes(&self, txn_id: &str, notes: &str) -> Result<Value>;
}

/// Pick the first non-closed account (the original dashboard's default view)
pub async fn first_open_account<C: BankClient + ?Sized>(client: &C) -> Result<Option<Account>> {
    let accounts = client.accounts().await?;
    Ok(accounts.into_iter().find(|account| !account.closed))
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    transaction: Value,
}

/// Monzo API client
#[derive(Clone)]
pub struct MonzoClient {
    http_client: Client,
    base_url: String,
    access_token: String,
}

impl MonzoClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Create from environment variables.
    ///
    /// Requires `MONZO_ACCESS_TOKEN`; `MONZO_API_URL` overrides the base URL.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV).ok()?;
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Some(Self::new(&base_url, &token))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map HTTP status to the error taxonomy. Auth failures abort the whole
    /// request upstream; 404 only concerns the one transaction.
    fn check(response: Response, what: &str) -> Result<Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth(format!(
                "{} returned {}",
                what,
                response.status()
            ))),
            StatusCode::NOT_FOUND => Err(Error::NotFound(what.to_string())),
            status if !status.is_success() => {
                Err(Error::Request(format!("{} returned {}", what, status)))
            }
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl BankClient for MonzoClient {
    async fn accounts(&self) -> Result<Vec<Account>> {
        let response = self
            .http_client
            .get(format!("{}/accounts", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = Self::check(response, "GET /accounts")?;
        let body: AccountsResponse = response.json().await?;
        debug!("Fetched {} accounts", body.accounts.len());

        Ok(body.accounts)
    }

    async fn transactions(&self, account_id: &str) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .get(format!("{}/transactions", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[("account_id", account_id), ("expand[]", "merchant")])
            .send()
            .await?;

        let response = Self::check(response, "GET /transactions")?;
        let body: TransactionsResponse = response.json().await?;
        debug!(
            "Fetched {} transactions for {}",
            body.transactions.len(),
            account_id
        );

        Ok(body.transactions)
    }

    async fn update_transaction_notes(&self, txn_id: &str, notes: &str) -> Result<Value> {
        let response = self
            .http_client
            .patch(format!("{}/transactions/{}", self.base_url, txn_id))
            .bearer_auth(&self.access_token)
            .form(&[("metadata[notes]", notes)])
            .send()
            .await?;

        let response = Self::check(response, &format!("PATCH /transactions/{}", txn_id))?;
        let body: TransactionResponse = response.json().await?;

        Ok(body.transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockMonzoServer;
    use serde_json::json;

    fn sample_txn(id: &str) -> Value {
        json!({
            "id": id,
            "notes": "",
            "created": "2019-03-01T12:00:00.5Z",
            "amount": -100
        })
    }

    #[tokio::test]
    async fn test_fetch_and_update_roundtrip() {
        let mut server = MockMonzoServer::start(vec![sample_txn("tx_1")]).await;
        let client = MonzoClient::new(&server.url(), "test-token");

        let accounts = client.accounts().await.unwrap();
        assert!(!accounts.is_empty());

        let txns = client.transactions(&accounts[0].id).await.unwrap();
        assert_eq!(txns.len(), 1);

        let updated = client
            .update_transaction_notes("tx_1", "coffee #treat")
            .await
            .unwrap();
        assert_eq!(updated["notes"], "coffee #treat");
        assert_eq!(server.notes_of("tx_1").as_deref(), Some("coffee #treat"));

        server.stop();
    }

    #[tokio::test]
    async fn test_rejected_credentials_map_to_auth_error() {
        let mut server = MockMonzoServer::start(vec![]).await;
        server.reject_auth();
        let client = MonzoClient::new(&server.url(), "expired-token");

        let err = client.transactions("acc_1").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));

        server.stop();
    }

    #[tokio::test]
    async fn test_unknown_transaction_maps_to_not_found() {
        let mut server = MockMonzoServer::start(vec![]).await;
        let client = MonzoClient::new(&server.url(), "test-token");

        let err = client
            .update_transaction_notes("tx_missing", "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        server.stop();
    }

    #[tokio::test]
    async fn test_first_open_account_skips_closed() {
        let mut server = MockMonzoServer::start(vec![]).await;
        server.set_accounts(vec![
            json!({ "id": "acc_closed", "type": "uk_prepaid", "closed": true }),
            json!({ "id": "acc_open", "type": "uk_retail", "closed": false }),
        ]);
        let client = MonzoClient::new(&server.url(), "test-token");

        let account = first_open_account(&client).await.unwrap().unwrap();
        assert_eq!(account.id, "acc_open");

        server.stop();
    }
}
