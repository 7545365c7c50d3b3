use crate::helper::anonymous_names;
use crate::models::db_operations::posts_db_operations::{COMMENTS, COMMENT_INDEX, POSTS};
use crate::models::db_operations::DbError;
use crate::models::repository::PostRepository;
use crate::models::{Post, PostReactions};
use chrono::{Duration, Utc};
use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Seeding error: {0}")]
    Seed(#[from] DbError),
}

pub fn setup_accounts_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            anonymous_id TEXT NOT NULL,
            join_date TEXT NOT NULL,
            last_login TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    log::info!("Creating 'user_activity' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS user_activity (
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('post', 'comment', 'reaction')),
            item_id TEXT NOT NULL,
            PRIMARY KEY (user_id, kind, item_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    log::info!("Creating 'password_reset_tokens' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            expires TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    log::info!("Creating 'reports' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            reporter_id TEXT,
            reason TEXT NOT NULL,
            description TEXT,
            timestamp TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('pending', 'resolved', 'dismissed')),
            priority TEXT NOT NULL CHECK(priority IN ('low', 'medium', 'high', 'urgent')),
            reviewed_by TEXT,
            reviewed_at TEXT,
            admin_notes TEXT
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_reports_post_reporter ON reports (post_id, reporter_id)",
        [],
    )?;
    // At most one open report per signed-in reporter and post.
    tx.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_active_reporter ON reports (post_id, reporter_id)
         WHERE reporter_id IS NOT NULL AND status != 'dismissed'",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn setup_posts_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        log::info!("Creating 'posts' table in Redb...");
        write_txn.open_table(POSTS)?;

        log::info!("Creating 'comments' table in Redb...");
        write_txn.open_table(COMMENTS)?;

        log::info!("Creating 'comment_index' table in Redb...");
        write_txn.open_table(COMMENT_INDEX)?;
    }
    write_txn.commit()?;
    Ok(())
}

const SAMPLE_CONFESSIONS: [(&str, &str, [&str; 3]); 5] = [
    (
        "I've been struggling with anxiety for months but haven't told anyone. Sometimes I feel like I'm drowning in my own thoughts and I don't know how to reach out for help.",
        "health",
        ["anxiety", "mental-health", "support"],
    ),
    (
        "I secretly wish my parents would be proud of me just once. I've achieved so much but they never seem to notice or care.",
        "family",
        ["family", "validation", "parents"],
    ),
    (
        "I quit my high-paying job to pursue my passion and I'm terrified I made a huge mistake. Everyone thinks I'm crazy.",
        "work",
        ["career", "passion", "courage"],
    ),
    (
        "I've never felt truly loved by anyone and I'm starting to think there's something fundamentally wrong with me.",
        "relationships",
        ["loneliness", "self-worth", "love"],
    ),
    (
        "I pretend to be happy all the time but inside I feel empty. I don't want to burden others with my problems.",
        "personal",
        ["depression", "facade", "authenticity"],
    ),
];

/// Inserts a handful of example confessions, spaced an hour apart.
pub fn seed_sample_posts(posts: &dyn PostRepository) -> Result<usize, SetupError> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    for (i, (content, category, tags)) in SAMPLE_CONFESSIONS.iter().enumerate() {
        let post = Post {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            category: category.to_string(),
            anonymous_name: anonymous_names::generate_anonymous_name(&mut rng),
            timestamp: now - Duration::hours(i as i64 + 2),
            reactions: PostReactions::default(),
            comments: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            user_id: None,
        };
        posts.insert_post(&post)?;
        log::info!("Seeded '{}' confession {}", category, post.id);
    }
    Ok(SAMPLE_CONFESSIONS.len())
}
