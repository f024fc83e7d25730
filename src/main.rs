//! # finsync command line
//!
//! `migrate` applies the schema, `sync` runs one sync command against a
//! fixture-backed provider and `positions` prints the trading positions view.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use finsync::auth::AuthorizationBroker;
use finsync::code::{CodeRequest, code_channel};
use finsync::config::{AppConfig, ConfigLoader};
use finsync::credentials::{CredentialStore, RequesterId, TenantKey};
use finsync::db;
use finsync::executors::build_all;
use finsync::orchestrator::{SyncCommand, SyncOrchestrator};
use finsync::provider::memory::InMemoryProvider;
use finsync::report::ReportSink;
use finsync::storage::Storage;
use finsync::telemetry::init_tracing;

/// finsync - incremental sync of provider financial data
#[derive(Parser, Debug)]
#[command(name = "finsync")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Run one sync command for a requester
    Sync {
        /// Requester id as configured in the credentials file
        #[arg(long)]
        user: i64,

        /// Provider fixture (JSON) served by the in-memory provider
        #[arg(long)]
        fixture: PathBuf,
    },

    /// Print trading positions open at or closed after a point in time
    Positions {
        #[arg(long)]
        username: String,

        /// RFC 3339 timestamp, e.g. 2024-01-01T00:00:00Z
        #[arg(long)]
        from: DateTime<Utc>,
    },
}

/// Prints report pages to stdout.
struct StdoutSink;

#[async_trait]
impl ReportSink for StdoutSink {
    async fn deliver(&self, pages: Vec<String>) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        for page in pages {
            stdout.write_all(page.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.flush().await?;
        Ok(())
    }
}

/// Answers code requests with lines read from stdin.
async fn stdin_code_transport(mut requests: mpsc::Receiver<CodeRequest>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(request) = requests.recv().await {
        eprintln!("{}:", request.prompt());
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !request.respond(line) {
                    warn!("Code arrived after the run stopped waiting");
                }
            }
            Ok(None) => {
                request.decline("stdin closed");
            }
            Err(e) => {
                request.decline(format!("failed to read stdin: {}", e));
            }
        }
    }
}

async fn connect(config: &AppConfig) -> Result<Storage> {
    let db = db::init_pool(config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&db).await?;
    Ok(Storage::new(db, config.insert_chunk_size))
}

async fn sync(config: &AppConfig, user: i64, fixture: PathBuf) -> Result<()> {
    let credentials = CredentialStore::from_path(&config.credentials_path)
        .context("loading credentials")?;
    info!(requesters = credentials.len(), "Loaded credentials");

    let provider =
        InMemoryProvider::from_path(&fixture).context("loading provider fixture")?;
    let storage = connect(config).await?;

    let broker = AuthorizationBroker::new(
        Arc::new(credentials),
        Arc::new(provider),
        config.code_timeout(),
    );
    let orchestrator = SyncOrchestrator::new(broker, storage, build_all(&config.executors))
        .context("validating executors")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let (codes, requests) = code_channel(1);
    let transport = tokio::spawn(stdin_code_transport(requests));

    let outcome = orchestrator
        .run(
            SyncCommand {
                requester: RequesterId(user),
            },
            &codes,
            &cancel,
        )
        .await;
    transport.abort();

    StdoutSink
        .deliver(outcome.report.pages(config.report_page_chars))
        .await?;

    if let Some(error) = outcome.error {
        bail!("sync run {} failed: {}", outcome.run_id, error);
    }
    Ok(())
}

async fn positions(config: &AppConfig, username: String, from: DateTime<Utc>) -> Result<()> {
    let storage = connect(config).await?;
    let positions = storage
        .trading_positions(from, &TenantKey::new(username))
        .await
        .context("querying trading positions")?;

    for position in positions {
        println!("{}", serde_json::to_string(&position)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    init_tracing(&config)?;
    if let Ok(redacted) = config.redacted_json() {
        info!(profile = %config.profile, config = %redacted, "Loaded configuration");
    }

    match cli.command {
        Commands::Migrate => {
            connect(&config).await?;
            info!("Migrations applied");
            Ok(())
        }
        Commands::Sync { user, fixture } => sync(&config, user, fixture).await,
        Commands::Positions { username, from } => positions(&config, username, from).await,
    }
}
