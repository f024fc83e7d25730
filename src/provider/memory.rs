//! In-memory provider
//!
//! A fixture-backed [`Provider`] used by the CLI and the test suite. Users,
//! passwords, optional one-time codes and per-user data are loaded from JSON:
//!
//! ```json
//! {"users": {"acct1": {"password": "pw", "code": "1234", "data": {"operations": []}}}}
//! ```
//!
//! A user without `code` is authorized immediately on login.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{
    AccountRecord, CandleRecord, Challenge, LoginStep, OperationRecord, Provider, ProviderError,
    PurchasedSecurityRecord, Session, ShoppingReceiptRecord, TradingOperationRecord,
};
use crate::credentials::Secret;

/// Everything the provider holds for one username.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderData {
    pub accounts: Vec<AccountRecord>,
    pub operations: Vec<OperationRecord>,
    pub receipts: Vec<ShoppingReceiptRecord>,
    pub trading_operations: Vec<TradingOperationRecord>,
    pub purchased_securities: Vec<PurchasedSecurityRecord>,
    pub candles: Vec<CandleRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub password: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub data: ProviderData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderFixture {
    #[serde(default)]
    pub users: BTreeMap<String, FixtureUser>,
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read provider fixture {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse provider fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session calls that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Accounts,
    Operations,
    ShoppingReceipt,
    TradingOperations,
    PurchasedSecurities,
    Candles,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Accounts => "accounts",
            FetchKind::Operations => "operations",
            FetchKind::ShoppingReceipt => "shopping_receipt",
            FetchKind::TradingOperations => "trading_operations",
            FetchKind::PurchasedSecurities => "purchased_securities",
            FetchKind::Candles => "candles",
        }
    }
}

#[derive(Default)]
struct State {
    users: RwLock<BTreeMap<String, FixtureUser>>,
    /// Open handshakes: handshake id -> username
    handshakes: Mutex<HashMap<String, String>>,
    failures: Mutex<HashSet<FetchKind>>,
    calls: Mutex<Vec<String>>,
}

impl State {
    async fn record(&self, call: impl Into<String>) {
        self.calls.lock().await.push(call.into());
    }

    async fn data(&self, username: &str, kind: FetchKind) -> Result<ProviderData, ProviderError> {
        self.record(kind.as_str()).await;

        if self.failures.lock().await.contains(&kind) {
            return Err(ProviderError::Unavailable(format!(
                "{} fetch failed",
                kind.as_str()
            )));
        }

        self.users
            .read()
            .await
            .get(username)
            .map(|user| user.data.clone())
            .ok_or_else(|| ProviderError::Rejected(format!("session for unknown user {}", username)))
    }
}

/// Fixture-backed provider; cheap to clone, clones share state.
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    state: Arc<State>,
}

impl InMemoryProvider {
    pub fn new(fixture: ProviderFixture) -> Self {
        Self {
            state: Arc::new(State {
                users: RwLock::new(fixture.users),
                ..State::default()
            }),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        let fixture: ProviderFixture = serde_json::from_str(raw)?;
        Ok(Self::new(fixture))
    }

    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Register or replace a user.
    pub async fn add_user(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
        code: Option<&str>,
        data: ProviderData,
    ) {
        self.state.users.write().await.insert(
            username.into(),
            FixtureUser {
                password: password.into(),
                code: code.map(str::to_string),
                data,
            },
        );
    }

    /// Mutate the provider-side data of one user.
    pub async fn update_data<F>(&self, username: &str, update: F)
    where
        F: FnOnce(&mut ProviderData),
    {
        if let Some(user) = self.state.users.write().await.get_mut(username) {
            update(&mut user.data);
        }
    }

    /// Make every subsequent call of `kind` fail as unavailable.
    pub async fn fail_on(&self, kind: FetchKind) {
        self.state.failures.lock().await.insert(kind);
    }

    /// Calls made so far, in order: `login`, `confirm`, `abort` and fetch names.
    pub async fn calls(&self) -> Vec<String> {
        self.state.calls.lock().await.clone()
    }

    pub async fn open_handshakes(&self) -> usize {
        self.state.handshakes.lock().await.len()
    }

    fn session(&self, username: &str) -> Box<dyn Session> {
        Box::new(MemorySession {
            username: username.to_string(),
            state: self.state.clone(),
        })
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn login(&self, username: &str, password: &Secret) -> Result<LoginStep, ProviderError> {
        self.state.record("login").await;

        let code = {
            let users = self.state.users.read().await;
            match users.get(username) {
                Some(user) if user.password == password.expose() => user.code.clone(),
                _ => return Err(ProviderError::Rejected("invalid credentials".to_string())),
            }
        };

        if code.is_none() {
            return Ok(LoginStep::Authorized(self.session(username)));
        }

        let handshake_id = Uuid::new_v4().to_string();
        self.state
            .handshakes
            .lock()
            .await
            .insert(handshake_id.clone(), username.to_string());
        debug!(username, handshake_id = %handshake_id, "Login requires one-time code");

        Ok(LoginStep::CodeRequired(Challenge {
            handshake_id,
            username: username.to_string(),
            hint: Some("code sent by SMS".to_string()),
        }))
    }

    async fn confirm(
        &self,
        challenge: &Challenge,
        code: &str,
    ) -> Result<Box<dyn Session>, ProviderError> {
        self.state.record("confirm").await;

        let username = self
            .state
            .handshakes
            .lock()
            .await
            .remove(&challenge.handshake_id)
            .ok_or_else(|| ProviderError::Rejected("unknown handshake".to_string()))?;

        let expected = self
            .state
            .users
            .read()
            .await
            .get(&username)
            .and_then(|user| user.code.clone());

        match expected {
            Some(expected) if expected == code => Ok(self.session(&username)),
            _ => Err(ProviderError::Rejected("invalid one-time code".to_string())),
        }
    }

    async fn abort(&self, challenge: &Challenge) {
        self.state.record("abort").await;
        self.state
            .handshakes
            .lock()
            .await
            .remove(&challenge.handshake_id);
    }
}

struct MemorySession {
    username: String,
    state: Arc<State>,
}

fn newer_than<T>(
    records: Vec<T>,
    since: Option<DateTime<Utc>>,
    time: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    match since {
        Some(since) => records.into_iter().filter(|r| time(r) > since).collect(),
        None => records,
    }
}

#[async_trait]
impl Session for MemorySession {
    fn username(&self) -> &str {
        &self.username
    }

    async fn accounts(&self) -> Result<Vec<AccountRecord>, ProviderError> {
        let data = self.state.data(&self.username, FetchKind::Accounts).await?;
        Ok(data.accounts)
    }

    async fn operations(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OperationRecord>, ProviderError> {
        let data = self.state.data(&self.username, FetchKind::Operations).await?;
        Ok(newer_than(data.operations, since, |r| r.debiting_time))
    }

    async fn shopping_receipt(
        &self,
        operation_id: &str,
    ) -> Result<Option<ShoppingReceiptRecord>, ProviderError> {
        let data = self
            .state
            .data(&self.username, FetchKind::ShoppingReceipt)
            .await?;
        Ok(data
            .receipts
            .into_iter()
            .find(|receipt| receipt.operation_id == operation_id))
    }

    async fn trading_operations(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<TradingOperationRecord>, ProviderError> {
        let data = self
            .state
            .data(&self.username, FetchKind::TradingOperations)
            .await?;
        Ok(newer_than(data.trading_operations, since, |r| r.date))
    }

    async fn purchased_securities(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PurchasedSecurityRecord>, ProviderError> {
        let data = self
            .state
            .data(&self.username, FetchKind::PurchasedSecurities)
            .await?;
        Ok(newer_than(data.purchased_securities, since, |r| {
            r.purchase_time
        }))
    }

    async fn candles(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CandleRecord>, ProviderError> {
        let data = self.state.data(&self.username, FetchKind::Candles).await?;
        Ok(newer_than(data.candles, since, |r| r.time))
    }
}
