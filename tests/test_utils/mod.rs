//! Test utilities for pipeline testing.
//!
//! In-memory SQLite storage with migrations applied, provider fixtures and a
//! ready-to-run orchestrator wired to the in-memory provider.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use finsync::auth::AuthorizationBroker;
use finsync::code::CodeRequest;
use finsync::credentials::{Credential, CredentialStore, RequesterId};
use finsync::executors::{ExecutorKind, build_all};
use finsync::orchestrator::SyncOrchestrator;
use finsync::provider::memory::{InMemoryProvider, ProviderData};
use finsync::provider::{AccountRecord, OperationRecord, TradingOperationRecord};
use finsync::storage::Storage;

pub const ALICE: RequesterId = RequesterId(42);
pub const BOB: RequesterId = RequesterId(7);

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_storage(chunk_size: usize) -> Result<Storage> {
    Ok(Storage::new(setup_test_db().await?, chunk_size))
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn operation(id: &str, time: DateTime<Utc>) -> OperationRecord {
    OperationRecord {
        id: id.to_string(),
        account_id: "acc-1".to_string(),
        debiting_time: time,
        description: format!("Payment {}", id),
        category: Some("Restaurants".to_string()),
        amount: 20.0,
        currency: "RUB".to_string(),
        status: "OK".to_string(),
        has_shopping_receipt: false,
        loyalty_bonuses: Vec::new(),
    }
}

pub fn account(id: &str) -> AccountRecord {
    AccountRecord {
        id: id.to_string(),
        name: format!("Account {}", id),
        account_type: "Current".to_string(),
        currency: "RUB".to_string(),
        balance: 1000.0,
    }
}

pub fn trade(id: &str, kind: &str, ticker: &str, quantity: i64, time: DateTime<Utc>) -> TradingOperationRecord {
    TradingOperationRecord {
        id: id.to_string(),
        date: time,
        operation_type: kind.to_string(),
        ticker: ticker.to_string(),
        quantity,
        price: 100.0,
        payment: 100.0 * quantity as f64,
        currency: "USD".to_string(),
    }
}

/// Orchestrator over in-memory storage and provider.
///
/// `ALICE` maps to provider user `acct1`, `BOB` to `acct2`.
pub struct Harness {
    pub orchestrator: SyncOrchestrator,
    pub provider: InMemoryProvider,
    pub storage: Storage,
}

pub async fn harness(kinds: &[ExecutorKind], code: Option<&str>) -> Result<Harness> {
    let provider = InMemoryProvider::default();
    provider
        .add_user("acct1", "alice-pw", code, ProviderData::default())
        .await;
    provider
        .add_user("acct2", "bob-pw", code, ProviderData::default())
        .await;

    let credentials = CredentialStore::from_entries([
        (ALICE, Credential::new("acct1", "alice-pw")),
        (BOB, Credential::new("acct2", "bob-pw")),
    ]);
    let broker = AuthorizationBroker::new(
        Arc::new(credentials),
        Arc::new(provider.clone()),
        Duration::from_secs(5),
    );
    let storage = setup_storage(100).await?;
    let orchestrator = SyncOrchestrator::new(broker, storage.clone(), build_all(kinds))?;

    Ok(Harness {
        orchestrator,
        provider,
        storage,
    })
}

/// Answers every code request with `code`.
pub fn answer_codes(mut requests: mpsc::Receiver<CodeRequest>, code: &str) -> JoinHandle<()> {
    let code = code.to_string();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            request.respond(code.clone());
        }
    })
}
