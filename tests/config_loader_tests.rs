use finsync::config::{ConfigError, ConfigLoader};
use finsync::executors::ExecutorKind;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
    time::Duration,
};
use tempfile::TempDir;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("FINSYNC_PROFILE");
        env::remove_var("FINSYNC_LOG_LEVEL");
        env::remove_var("FINSYNC_DATABASE_URL");
        env::remove_var("FINSYNC_CODE_TIMEOUT_SECONDS");
        env::remove_var("FINSYNC_EXECUTORS");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.database_url, "sqlite://finsync.db?mode=rwc");
    assert_eq!(cfg.code_timeout(), Duration::from_secs(300));
    assert_eq!(cfg.executors, ExecutorKind::ALL.to_vec());
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "FINSYNC_DATABASE_URL=sqlite://base.db\n");
    write_env_file(&temp_dir, ".env.test", "FINSYNC_DATABASE_URL=sqlite://test.db\n");
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "FINSYNC_DATABASE_URL=sqlite://test-local.db\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "FINSYNC_PROFILE=test\nFINSYNC_DATABASE_URL=sqlite://local.db\nFINSYNC_EXECUTORS=accounts,operations\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.database_url, "sqlite://test-local.db");
    assert_eq!(
        cfg.executors,
        vec![ExecutorKind::Accounts, ExecutorKind::Operations]
    );
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "FINSYNC_LOG_LEVEL=debug\nFINSYNC_CODE_TIMEOUT_SECONDS=60\n",
    );

    unsafe {
        env::set_var("FINSYNC_CODE_TIMEOUT_SECONDS", "90");
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.code_timeout(), Duration::from_secs(90));

    clear_env();
}

#[test]
fn unknown_executor_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("FINSYNC_EXECUTORS", "accounts, brokerage");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("unknown executor should fail");
    assert!(matches!(err, ConfigError::UnknownExecutor(_)));
    assert!(format!("{}", err).contains("unknown executor 'brokerage'"));

    clear_env();
}

#[test]
fn code_timeout_out_of_range_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("FINSYNC_CODE_TIMEOUT_SECONDS", "0");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("zero code timeout should fail");
    assert!(matches!(err, ConfigError::InvalidCodeTimeout { value: 0 }));

    clear_env();
}
