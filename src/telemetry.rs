//! Telemetry utilities for run-scoped tracing metadata and global subscriber management.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;
use crate::credentials::RequesterId;

/// Identity of the sync run the current task belongs to.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub requester: RequesterId,
}

task_local! {
    static ACTIVE_RUN_CONTEXT: RunContext;
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing exactly once, routing `log::` records from sqlx and
/// sea-orm through the same subscriber. Output goes to stderr so stdout stays
/// free for reports.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        let logger_type = type_name_of_val(log::logger());
        if !logger_type.contains("LogTracer") {
            eprintln!(
                "Warning: failed to install log tracer bridge: {}. `log` records will not reach the subscriber.",
                err
            );
        }
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        _ => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: failed to set global tracing subscriber: {}. Default subscriber remains in effect.",
            err
        );
    }

    Ok(())
}

/// Execute `future` within the given run context.
pub async fn with_run_context<Fut, R>(context: RunContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_RUN_CONTEXT.scope(context, future).await
}

/// Run id of the sync run executing on this task, if any.
pub fn current_run_id() -> Option<String> {
    ACTIVE_RUN_CONTEXT.try_with(|ctx| ctx.run_id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_id_is_scoped_to_the_future() {
        assert_eq!(current_run_id(), None);

        let context = RunContext {
            run_id: "run-1".to_string(),
            requester: RequesterId(42),
        };
        let seen = with_run_context(context, async { current_run_id() }).await;

        assert_eq!(seen.as_deref(), Some("run-1"));
        assert_eq!(current_run_id(), None);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = AppConfig::default();
        init_tracing(&config).unwrap();
        init_tracing(&config).unwrap();
    }
}
