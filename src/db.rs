//! Database connection and schema management.
//!
//! Opens the SeaORM pool used as the system of record (Postgres in
//! production, SQLite for local runs and tests) and applies migrations.

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Errors that can occur during database setup.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("Database connection timeout after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Open a connection pool, retrying transient failures with exponential backoff.
///
/// ```no_run
/// use finsync::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let db = init_pool(&AppConfig::default()).await?;
///     finsync::db::migrate(&db).await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut retry_delay = Duration::from_millis(100);

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                log::info!("Connected to database (attempt {})", attempt);
                return Ok(conn);
            }
            Err(e) => {
                if attempt == MAX_CONNECT_ATTEMPTS {
                    log::error!(
                        "Failed to connect to database after {} attempts: {}",
                        MAX_CONNECT_ATTEMPTS,
                        e
                    );
                    return Err(DatabaseError::ConnectionFailed { source: e }.into());
                }

                log::warn!(
                    "Database connection attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    retry_delay
                );

                sleep(retry_delay).await;
                retry_delay *= 2;
            }
        }
    }

    Err(DatabaseError::ConnectionTimeout {
        timeout_ms: cfg.db_acquire_timeout_ms,
    }
    .into())
}

/// Apply all pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .context("Failed to apply database migrations")?;
    Ok(())
}

/// Verify the connection answers a trivial query.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt)
        .await
        .context("Database health check failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_database_url() {
        let config = AppConfig {
            database_url: String::new(),
            ..AppConfig::default()
        };

        let result = init_pool(&config).await;

        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_sqlite_pool_migrates_and_answers() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            ..AppConfig::default()
        };

        let db = init_pool(&config).await.unwrap();
        migrate(&db).await.unwrap();
        migrate(&db).await.unwrap();
        health_check(&db).await.unwrap();
    }
}
