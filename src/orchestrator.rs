//! # Sync Orchestrator
//!
//! Runs one sync command: authorize the requester, then run the configured
//! executors in order, each against its own watermark. The chain is fail-fast:
//! the first error stops it, executors that already finished keep their
//! committed rows and report lines, and the failure is reported last.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::auth::{AuthorizationBroker, Authorized};
use crate::code::CodeProvider;
use crate::credentials::RequesterId;
use crate::error::SyncError;
use crate::executors::{BatchResult, Executor, ExecutorContext};
use crate::report::Report;
use crate::storage::Storage;
use crate::telemetry::{RunContext, with_run_context};

/// Inbound request to sync the requester's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCommand {
    pub requester: RequesterId,
}

/// Position of a run in its lifecycle. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Authorizing,
    /// Executing the executor at this index
    Running(usize),
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Result of one run. The report is present on both terminal states.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub state: RunState,
    pub report: Report,
    pub error: Option<SyncError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Done
    }
}

struct Run {
    state: RunState,
    report: Report,
}

impl Run {
    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Run state transition");
        self.state = next;
    }
}

pub struct SyncOrchestrator {
    broker: AuthorizationBroker,
    storage: Storage,
    executors: Vec<Arc<dyn Executor>>,
}

impl SyncOrchestrator {
    /// Build an orchestrator. Every executor's descriptors are validated here
    /// so configuration errors surface before any run.
    pub fn new(
        broker: AuthorizationBroker,
        storage: Storage,
        executors: Vec<Arc<dyn Executor>>,
    ) -> Result<Self, SyncError> {
        for executor in &executors {
            executor
                .validate()
                .map_err(|e| SyncError::from_storage(executor.kind(), e))?;
        }

        Ok(Self {
            broker,
            storage,
            executors,
        })
    }

    pub fn executor_kinds(&self) -> Vec<&'static str> {
        self.executors.iter().map(|e| e.kind()).collect()
    }

    /// Execute one command end to end. Never panics on run errors; they are
    /// reported through the returned outcome.
    pub async fn run(
        &self,
        command: SyncCommand,
        codes: &dyn CodeProvider,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", run_id = %run_id, requester = %command.requester);
        let context = RunContext {
            run_id: run_id.to_string(),
            requester: command.requester,
        };

        with_run_context(
            context,
            self.execute(run_id, command, codes, cancel).instrument(span),
        )
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        command: SyncCommand,
        codes: &dyn CodeProvider,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut run = Run {
            state: RunState::Idle,
            report: Report::new(),
        };
        let started = Instant::now();

        run.advance(RunState::Authorizing);
        let result = match self.broker.authorize(command.requester, codes, cancel).await {
            Ok(authorized) => self.run_chain(&mut run, &authorized, cancel).await,
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(()) => {
                run.advance(RunState::Done);
                counter!("sync_runs_total", "status" => "done").increment(1);
                info!(
                    executors = self.executors.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Sync run completed"
                );
                None
            }
            Err(e) => {
                error!(error = %e, stage = ?run.state, "Sync run failed");
                run.report.push(failure_line(&e, run.state, &self.executors));
                run.advance(RunState::Failed);
                counter!("sync_runs_total", "status" => "failed").increment(1);
                Some(e)
            }
        };

        RunOutcome {
            run_id,
            state: run.state,
            report: run.report,
            error,
        }
    }

    async fn run_chain(
        &self,
        run: &mut Run,
        authorized: &Authorized,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let ctx = ExecutorContext {
            session: authorized.session.as_ref(),
            storage: &self.storage,
            tenant: &authorized.tenant,
            cancel,
        };

        for (index, executor) in self.executors.iter().enumerate() {
            run.advance(RunState::Running(index));

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let result = self.run_executor(executor.as_ref(), &ctx).await?;
            run.report
                .push(format!("{}: {}", result.kind, result.summary));
        }

        Ok(())
    }

    async fn run_executor(
        &self,
        executor: &dyn Executor,
        ctx: &ExecutorContext<'_>,
    ) -> Result<BatchResult, SyncError> {
        let kind = executor.kind();
        let started = Instant::now();

        let result = async {
            let since = executor
                .watermark(ctx.storage, ctx.tenant)
                .await
                .map_err(|e| SyncError::from_storage(kind, e))?;
            debug!(kind, ?since, "Resolved watermark");
            executor.run(ctx, since).await
        }
        .await;

        histogram!("sync_executor_duration_ms", "kind" => kind)
            .record(started.elapsed().as_millis() as f64);

        match &result {
            Ok(batch) => {
                counter!("sync_executor_runs_total", "kind" => kind, "status" => "ok")
                    .increment(1);
                counter!("sync_rows_reconciled_total", "kind" => kind)
                    .increment(batch.outcome.inserted);
                info!(
                    kind,
                    fetched = batch.fetched,
                    deleted = batch.outcome.deleted,
                    inserted = batch.outcome.inserted,
                    "Executor completed"
                );
            }
            Err(e) => {
                counter!("sync_executor_runs_total", "kind" => kind, "status" => e.label())
                    .increment(1);
            }
        }

        result
    }
}

/// Report line for the stage that broke the run.
fn failure_line(error: &SyncError, state: RunState, executors: &[Arc<dyn Executor>]) -> String {
    match (error, state) {
        (SyncError::Cancelled, RunState::Running(index)) => match executors.get(index) {
            Some(executor) => format!("sync failed: run cancelled before {}", executor.kind()),
            None => format!("sync failed: {}", error),
        },
        _ => format!("sync failed: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::code_channel;
    use crate::credentials::{Credential, CredentialStore, TenantKey};
    use crate::error::StorageError;
    use crate::executors::{ExecutorKind, build_all};
    use crate::models::{Account, Candle, Operation};
    use crate::provider::memory::{FetchKind, InMemoryProvider, ProviderData};
    use crate::provider::{AccountRecord, CandleRecord, OperationRecord};
    use crate::storage::{ReconcileOutcome, Watermark, test_storage};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    /// Executor that cancels the run it belongs to.
    struct CancellingExecutor;

    #[async_trait]
    impl Executor for CancellingExecutor {
        fn kind(&self) -> &'static str {
            "cancelling"
        }

        fn validate(&self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn watermark(
            &self,
            _storage: &Storage,
            _tenant: &TenantKey,
        ) -> Result<Watermark, StorageError> {
            Ok(None)
        }

        async fn run(
            &self,
            ctx: &ExecutorContext<'_>,
            _since: Watermark,
        ) -> Result<BatchResult, SyncError> {
            ctx.cancel.cancel();
            Ok(BatchResult {
                kind: "cancelling",
                fetched: 0,
                outcome: ReconcileOutcome::default(),
                summary: "cancel requested".to_string(),
            })
        }
    }

    fn data() -> ProviderData {
        ProviderData {
            accounts: vec![AccountRecord {
                id: "acc-1".to_string(),
                name: "Debit card".to_string(),
                account_type: "Current".to_string(),
                currency: "RUB".to_string(),
                balance: 100.0,
            }],
            operations: (1..=3)
                .map(|day| OperationRecord {
                    id: format!("op-{}", day),
                    account_id: "acc-1".to_string(),
                    debiting_time: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
                    description: "Taxi".to_string(),
                    category: None,
                    amount: 7.0,
                    currency: "RUB".to_string(),
                    status: "OK".to_string(),
                    has_shopping_receipt: false,
                    loyalty_bonuses: Vec::new(),
                })
                .collect(),
            candles: vec![CandleRecord {
                ticker: "SBER".to_string(),
                interval: "day".to_string(),
                time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                open: 1.0,
                close: 2.0,
                high: 2.0,
                low: 1.0,
                volume: 10,
            }],
            ..ProviderData::default()
        }
    }

    async fn orchestrator(
        kinds: &[ExecutorKind],
    ) -> (SyncOrchestrator, InMemoryProvider, Storage) {
        let provider = InMemoryProvider::default();
        provider.add_user("acct1", "pw", None, data()).await;
        let credentials =
            CredentialStore::from_entries([(RequesterId(42), Credential::new("acct1", "pw"))]);
        let broker = AuthorizationBroker::new(
            Arc::new(credentials),
            Arc::new(provider.clone()),
            Duration::from_secs(5),
        );
        let storage = test_storage(100).await;
        let orchestrator =
            SyncOrchestrator::new(broker, storage.clone(), build_all(kinds)).unwrap();
        (orchestrator, provider, storage)
    }

    #[tokio::test]
    async fn test_successful_run_reports_every_executor() {
        let (orchestrator, _provider, storage) =
            orchestrator(&[ExecutorKind::Accounts, ExecutorKind::Operations]).await;
        let (codes, _requests) = code_channel(1);

        let outcome = orchestrator
            .run(
                SyncCommand { requester: RequesterId(42) },
                &codes,
                &CancellationToken::new(),
            )
            .await;

        assert!(outcome.is_success());
        assert!(outcome.error.is_none());
        assert_eq!(
            outcome.report.lines(),
            ["accounts: 1 accounts", "operations: 3 new operations"]
        );
        let tenant = TenantKey::new("acct1");
        assert_eq!(storage.count::<Account>(&tenant).await.unwrap(), 1);
        assert_eq!(storage.count::<Operation>(&tenant).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failing_executor_stops_the_chain() {
        let (orchestrator, provider, storage) = orchestrator(&[
            ExecutorKind::Accounts,
            ExecutorKind::Operations,
            ExecutorKind::Candles,
        ])
        .await;
        provider.fail_on(FetchKind::Operations).await;
        let (codes, _requests) = code_channel(1);

        let outcome = orchestrator
            .run(
                SyncCommand { requester: RequesterId(42) },
                &codes,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.state, RunState::Failed);
        assert!(matches!(
            outcome.error,
            Some(SyncError::FetchFailed { kind: "operations", .. })
        ));
        let lines = outcome.report.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "accounts: 1 accounts");
        assert!(lines[1].starts_with("sync failed: operations: fetch failed"));

        let tenant = TenantKey::new("acct1");
        assert_eq!(storage.count::<Account>(&tenant).await.unwrap(), 1);
        assert_eq!(storage.count::<Candle>(&tenant).await.unwrap(), 0);
        assert!(!provider.calls().await.contains(&"candles".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_requester_fails_before_any_executor() {
        let (orchestrator, provider, _storage) = orchestrator(&[ExecutorKind::Accounts]).await;
        let (codes, _requests) = code_channel(1);

        let outcome = orchestrator
            .run(
                SyncCommand { requester: RequesterId(1) },
                &codes,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.state, RunState::Failed);
        assert!(matches!(outcome.error, Some(SyncError::UnknownUser(_))));
        assert_eq!(outcome.report.lines(), ["sync failed: unknown user 1"]);
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_executor() {
        let (_, provider, storage) = orchestrator(&[ExecutorKind::Accounts]).await;
        let credentials =
            CredentialStore::from_entries([(RequesterId(42), Credential::new("acct1", "pw"))]);
        let broker = AuthorizationBroker::new(
            Arc::new(credentials),
            Arc::new(provider.clone()),
            Duration::from_secs(5),
        );
        let executors: Vec<Arc<dyn Executor>> = vec![
            Arc::new(CancellingExecutor),
            ExecutorKind::Candles.build(),
        ];
        let orchestrator = SyncOrchestrator::new(broker, storage, executors).unwrap();
        let (codes, _requests) = code_channel(1);

        let outcome = orchestrator
            .run(
                SyncCommand { requester: RequesterId(42) },
                &codes,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome.error, Some(SyncError::Cancelled)));
        assert_eq!(
            outcome.report.lines(),
            [
                "cancelling: cancel requested",
                "sync failed: run cancelled before candles"
            ]
        );
        assert!(!provider.calls().await.contains(&"candles".to_string()));
    }

    #[tokio::test]
    async fn test_run_cancelled_before_login_makes_no_provider_call() {
        let (orchestrator, provider, _storage) =
            orchestrator(&[ExecutorKind::Accounts, ExecutorKind::Candles]).await;
        let (codes, _requests) = code_channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = orchestrator
            .run(SyncCommand { requester: RequesterId(42) }, &codes, &cancel)
            .await;

        assert_eq!(outcome.state, RunState::Failed);
        assert!(matches!(
            outcome.error,
            Some(SyncError::AuthorizationAborted(_))
        ));
        assert!(provider.calls().await.is_empty());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Running(0).is_terminal());
        assert!(!RunState::Idle.is_terminal());
    }
}
