//! Test utilities for tally-core
//!
//! This module provides testing infrastructure including a mock Monzo server
//! that can be used for development and integration tests. The mock mutates
//! its in-memory transaction state on note updates, so idempotence tests see
//! the tag in `notes` on the second fetch just like the real API would.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Default)]
struct MockState {
    transactions: Mutex<Vec<Value>>,
    accounts: Mutex<Vec<Value>>,
    /// Transaction IDs whose note update returns a 500
    fail_updates: Mutex<HashSet<String>>,
    reject_auth: AtomicBool,
    update_count: AtomicUsize,
}

/// Mock Monzo server for testing and development
pub struct MockMonzoServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: Arc<MockState>,
}

impl MockMonzoServer {
    /// Start the mock server on an available port with the given transactions
    pub async fn start(transactions: Vec<Value>) -> Self {
        let state = Arc::new(MockState {
            transactions: Mutex::new(transactions),
            accounts: Mutex::new(vec![
                json!({ "id": "acc_1", "type": "uk_retail", "closed": false }),
            ]),
            ..Default::default()
        });

        let app = Router::new()
            .route("/accounts", get(handle_accounts))
            .route("/transactions", get(handle_transactions))
            .route("/transactions/:id", patch(handle_update_notes))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the account list
    pub fn set_accounts(&self, accounts: Vec<Value>) {
        *self.state.accounts.lock().unwrap() = accounts;
    }

    /// Make every subsequent request fail with 401
    pub fn reject_auth(&self) {
        self.state.reject_auth.store(true, Ordering::SeqCst);
    }

    /// Make note updates for this transaction ID fail with 500
    pub fn fail_update(&self, txn_id: &str) {
        self.state
            .fail_updates
            .lock()
            .unwrap()
            .insert(txn_id.to_string());
    }

    /// Current notes of a stored transaction
    pub fn notes_of(&self, txn_id: &str) -> Option<String> {
        self.state
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|txn| txn["id"] == txn_id)
            .and_then(|txn| txn["notes"].as_str().map(str::to_string))
    }

    /// Number of successful note updates handled so far
    pub fn update_count(&self) -> usize {
        self.state.update_count.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockMonzoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_accounts(
    State(state): State<Arc<MockState>>,
) -> Result<Json<Value>, StatusCode> {
    if state.reject_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let accounts = state.accounts.lock().unwrap().clone();
    Ok(Json(json!({ "accounts": accounts })))
}

async fn handle_transactions(
    State(state): State<Arc<MockState>>,
) -> Result<Json<Value>, StatusCode> {
    if state.reject_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let transactions = state.transactions.lock().unwrap().clone();
    Ok(Json(json!({ "transactions": transactions })))
}

async fn handle_update_notes(
    State(state): State<Arc<MockState>>,
    Path(txn_id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if state.reject_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if state.fail_updates.lock().unwrap().contains(&txn_id) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let notes = form
        .get("metadata[notes]")
        .cloned()
        .ok_or(StatusCode::BAD_REQUEST)?;

    let mut transactions = state.transactions.lock().unwrap();
    let txn = transactions
        .iter_mut()
        .find(|txn| txn["id"] == txn_id.as_str())
        .ok_or(StatusCode::NOT_FOUND)?;

    txn["notes"] = json!(notes);
    state.update_count.fetch_add(1, Ordering::SeqCst);

    Ok(Json(json!({ "transaction": txn.clone() })))
}
