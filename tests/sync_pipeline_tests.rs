//! End-to-end sync pipeline tests: authorization, executor chain, storage.

mod test_utils;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use finsync::auth::AuthorizationBroker;
use finsync::code::code_channel;
use finsync::credentials::{CredentialStore, TenantKey};
use finsync::error::SyncError;
use finsync::executors::{ExecutorKind, build_all};
use finsync::models::{Account, Operation, TradingOperation};
use finsync::orchestrator::{RunState, SyncCommand, SyncOrchestrator};
use finsync::provider::memory::{FetchKind, InMemoryProvider};
use test_utils::{
    ALICE, BOB, account, answer_codes, at, harness, operation, setup_storage, trade,
};

fn command(requester: finsync::credentials::RequesterId) -> SyncCommand {
    SyncCommand { requester }
}

#[tokio::test]
async fn five_new_operations_for_empty_tenant() -> Result<()> {
    let h = harness(&[ExecutorKind::Operations], Some("1234")).await?;
    h.provider
        .update_data("acct1", |data| {
            data.operations = (1..=5)
                .map(|day| operation(&format!("op-{}", day), at(day, 10)))
                .collect();
        })
        .await;
    let tenant = TenantKey::new("acct1");
    assert_eq!(h.storage.latest_time::<Operation>(&tenant).await?, None);

    let (codes, requests) = code_channel(1);
    let responder = answer_codes(requests, "1234");
    let outcome = h
        .orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    responder.abort();

    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.report.lines(), ["operations: 5 new operations"]);
    assert_eq!(h.storage.count::<Operation>(&tenant).await?, 5);
    assert_eq!(
        h.storage.latest_time::<Operation>(&tenant).await?,
        Some(at(5, 10))
    );
    Ok(())
}

#[tokio::test]
async fn rerun_without_upstream_changes_is_idempotent() -> Result<()> {
    let h = harness(
        &[ExecutorKind::Accounts, ExecutorKind::Operations],
        None,
    )
    .await?;
    h.provider
        .update_data("acct1", |data| {
            data.accounts = vec![account("acc-1")];
            data.operations = vec![operation("op-1", at(1, 9)), operation("op-2", at(2, 9))];
        })
        .await;
    let tenant = TenantKey::new("acct1");
    let (codes, _requests) = code_channel(1);

    let first = h
        .orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    let second = h
        .orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;

    assert!(first.is_success() && second.is_success());
    assert_eq!(
        second.report.lines(),
        ["accounts: 1 accounts", "operations: 0 new operations"]
    );
    assert_eq!(h.storage.count::<Account>(&tenant).await?, 1);
    assert_eq!(h.storage.count::<Operation>(&tenant).await?, 2);
    assert_ne!(first.run_id, second.run_id);
    Ok(())
}

#[tokio::test]
async fn watermark_never_moves_backwards() -> Result<()> {
    let h = harness(&[ExecutorKind::Operations], None).await?;
    let tenant = TenantKey::new("acct1");
    let (codes, _requests) = code_channel(1);

    h.provider
        .update_data("acct1", |data| {
            data.operations = vec![operation("op-1", at(3, 9))];
        })
        .await;
    h.orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    let before = h.storage.latest_time::<Operation>(&tenant).await?;

    // A late-arriving record older than the watermark is not refetched and
    // cannot lower it; a newer one raises it.
    h.provider
        .update_data("acct1", |data| {
            data.operations.push(operation("op-0", at(1, 9)));
            data.operations.push(operation("op-2", at(4, 9)));
        })
        .await;
    let outcome = h
        .orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    let after = h.storage.latest_time::<Operation>(&tenant).await?;

    assert_eq!(outcome.report.lines(), ["operations: 1 new operations"]);
    assert!(after >= before);
    assert_eq!(after, Some(at(4, 9)));
    assert_eq!(h.storage.count::<Operation>(&tenant).await?, 2);
    Ok(())
}

#[tokio::test]
async fn tenants_do_not_see_each_other() -> Result<()> {
    let h = harness(&[ExecutorKind::Operations], None).await?;
    h.provider
        .update_data("acct1", |data| {
            data.operations = vec![operation("a-1", at(10, 9))];
        })
        .await;
    h.provider
        .update_data("acct2", |data| {
            data.operations = vec![operation("b-1", at(2, 9)), operation("b-2", at(3, 9))];
        })
        .await;
    let (codes, _requests) = code_channel(1);

    h.orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    // Bob's watermark is computed over his own rows only, so his older
    // records are still fetched after Alice's newer ones landed.
    let bob = h
        .orchestrator
        .run(command(BOB), &codes, &CancellationToken::new())
        .await;

    assert_eq!(bob.report.lines(), ["operations: 2 new operations"]);
    let alice = TenantKey::new("acct1");
    let bob_key = TenantKey::new("acct2");
    assert_eq!(h.storage.count::<Operation>(&alice).await?, 1);
    assert_eq!(h.storage.count::<Operation>(&bob_key).await?, 2);
    assert_eq!(
        h.storage.latest_time::<Operation>(&bob_key).await?,
        Some(at(3, 9))
    );
    Ok(())
}

#[tokio::test]
async fn failing_executor_keeps_prefix_and_skips_the_rest() -> Result<()> {
    let h = harness(
        &[
            ExecutorKind::Accounts,
            ExecutorKind::TradingOperations,
            ExecutorKind::Operations,
        ],
        None,
    )
    .await?;
    h.provider
        .update_data("acct1", |data| {
            data.accounts = vec![account("acc-1"), account("acc-2")];
            data.trading_operations = vec![trade("t-1", "Buy", "AAPL", 1, at(1, 9))];
            data.operations = vec![operation("op-1", at(1, 9))];
        })
        .await;
    h.provider.fail_on(FetchKind::TradingOperations).await;
    let (codes, _requests) = code_channel(1);

    let outcome = h
        .orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;

    assert_eq!(outcome.state, RunState::Failed);
    assert!(matches!(
        outcome.error,
        Some(SyncError::FetchFailed {
            kind: "trading_operations",
            ..
        })
    ));
    let lines = outcome.report.lines();
    assert_eq!(lines[0], "accounts: 2 accounts");
    assert!(lines[1].contains("trading_operations: fetch failed"));
    assert_eq!(lines.len(), 2);

    let tenant = TenantKey::new("acct1");
    assert_eq!(h.storage.count::<Account>(&tenant).await?, 2);
    assert_eq!(h.storage.count::<TradingOperation>(&tenant).await?, 0);
    assert_eq!(h.storage.count::<Operation>(&tenant).await?, 0);
    assert_eq!(h.provider.calls().await, vec!["login", "accounts", "trading_operations"]);
    Ok(())
}

#[tokio::test]
async fn cancelled_code_wait_aborts_without_running_executors() -> Result<()> {
    let h = harness(&[ExecutorKind::Accounts], Some("1234")).await?;
    let (codes, mut requests) = code_channel(1);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let transport = tokio::spawn(async move {
        let request = requests.recv().await.expect("code requested");
        trigger.cancel();
        request
    });

    let outcome = h.orchestrator.run(command(ALICE), &codes, &cancel).await;

    assert_eq!(outcome.state, RunState::Failed);
    assert!(matches!(
        outcome.error,
        Some(SyncError::AuthorizationAborted(_))
    ));
    assert_eq!(outcome.report.lines().len(), 1);
    assert_eq!(h.provider.open_handshakes().await, 0);
    assert_eq!(h.provider.calls().await, vec!["login", "abort"]);
    assert!(transport.await?.is_abandoned());
    Ok(())
}

#[tokio::test]
async fn positions_view_reflects_synced_trades() -> Result<()> {
    let h = harness(&[ExecutorKind::TradingOperations], None).await?;
    h.provider
        .update_data("acct1", |data| {
            data.trading_operations = vec![
                trade("t-1", "Buy", "AAPL", 5, at(1, 9)),
                trade("t-2", "Sell", "AAPL", 2, at(2, 9)),
                trade("t-3", "Buy", "MSFT", 1, at(1, 9)),
                trade("t-4", "Sell", "MSFT", 1, at(2, 9)),
            ];
        })
        .await;
    let (codes, _requests) = code_channel(1);
    h.orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;

    let tenant = TenantKey::new("acct1");
    let open = h.storage.trading_positions(at(5, 0), &tenant).await?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].ticker, "AAPL");
    assert_eq!(open[0].quantity, 3);
    assert!(open[0].is_open());

    let since_start = h.storage.trading_positions(at(1, 0), &tenant).await?;
    assert_eq!(since_start.len(), 2);
    Ok(())
}

#[tokio::test]
async fn pipeline_runs_from_fixture_and_credential_files() -> Result<()> {
    let mut credentials_file = tempfile::NamedTempFile::new()?;
    write!(
        credentials_file,
        r#"{{"42": {{"username": "acct1", "password": "pw"}}}}"#
    )?;
    let credentials = CredentialStore::from_path(credentials_file.path())?;

    let provider = InMemoryProvider::from_json(
        r#"{"users": {"acct1": {"password": "pw", "code": "9999", "data": {
            "accounts": [{"id": "acc-1", "name": "Card", "account_type": "Credit", "currency": "RUB", "balance": -50.0}],
            "operations": [{"id": "op-1", "account_id": "acc-1", "debiting_time": "2024-03-01T10:00:00Z",
                            "description": "Books", "amount": 50.0, "currency": "RUB", "status": "OK"}]
        }}}}"#,
    )?;
    let broker = AuthorizationBroker::new(
        Arc::new(credentials),
        Arc::new(provider),
        Duration::from_secs(5),
    );
    let storage = setup_storage(10).await?;
    let orchestrator = SyncOrchestrator::new(
        broker,
        storage.clone(),
        build_all(&[ExecutorKind::Accounts, ExecutorKind::Operations]),
    )?;

    let (codes, requests) = code_channel(1);
    let responder = answer_codes(requests, "9999\n");
    let outcome = orchestrator
        .run(command(ALICE), &codes, &CancellationToken::new())
        .await;
    responder.abort();

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        outcome.report.pages(4096),
        vec!["accounts: 1 accounts\noperations: 1 new operations"]
    );
    assert_eq!(
        storage.latest_time::<Operation>(&TenantKey::new("acct1")).await?,
        Some(at(1, 10))
    );
    Ok(())
}
