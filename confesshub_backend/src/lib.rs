use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use models::db_operations::posts_db_operations::RedbPostRepository;
use models::db_operations::reports_db_operations::SqliteReportRepository;
use models::db_operations::users_db_operations::SqliteUserRepository;
use models::repository::{PostRepository, ReportRepository, UserRepository};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use redb::Database;
use setup::db_setup::{self, SetupError};
use thiserror::Error;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Runtime knobs the handlers need, taken from `Config`.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub password_hash_cost: u32,
    pub reset_token_ttl: Duration,
    pub public_base_url: String,
}

pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub users: Arc<dyn UserRepository>,
    pub settings: AppSettings,
    pub started_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Could not create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not open posts database: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("Could not build SQLite pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Schema setup failed: {0}")]
    Setup(#[from] SetupError),
}

pub fn accounts_db_file(database_path: &Path) -> PathBuf {
    database_path.join("accounts").join("accounts.db")
}

pub fn posts_db_file(database_path: &Path) -> PathBuf {
    database_path.join("posts").join("posts.db")
}

pub fn build_pool(path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")
    });
    Pool::builder().build(manager)
}

/// Opens (creating when missing) both stores under `database_path` and makes
/// sure every table exists.
pub fn open_databases(database_path: &Path) -> Result<(RedbPostRepository, DbPool), StartupError> {
    let accounts_path = accounts_db_file(database_path);
    let posts_path = posts_db_file(database_path);
    for path in [&accounts_path, &posts_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let posts_db = Database::create(&posts_path)?;
    db_setup::setup_posts_db(&posts_db)?;

    let pool = build_pool(&accounts_path)?;
    {
        let mut conn = pool.get()?;
        db_setup::setup_accounts_db(&mut conn)?;
    }

    Ok((RedbPostRepository::new(posts_db), pool))
}

impl AppState {
    pub fn open(database_path: &Path, settings: AppSettings) -> Result<Self, StartupError> {
        let (posts, pool) = open_databases(database_path)?;
        Ok(AppState {
            posts: Arc::new(posts),
            reports: Arc::new(SqliteReportRepository::new(pool.clone())),
            users: Arc::new(SqliteUserRepository::new(pool)),
            settings,
            started_at: Utc::now(),
        })
    }
}

pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;

#[cfg(test)]
pub(crate) mod test_support;
