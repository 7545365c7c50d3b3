use crate::models::db_operations::{
    column_optional_timestamp, column_timestamp, is_unique_violation, to_db_timestamp, DbError,
};
use crate::models::repository::UserRepository;
use crate::models::{ActivityKind, PasswordResetToken, User};
use crate::DbPool;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, anonymous_id, join_date, last_login, is_admin, is_active";

fn user_from_row(row: &rusqlite::Row<'_>) -> RusqliteResult<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        anonymous_id: row.get(3)?,
        join_date: column_timestamp(row, 4)?,
        last_login: column_optional_timestamp(row, 5)?,
        is_admin: row.get(6)?,
        is_active: row.get(7)?,
        posts: Vec::new(),
        comments: Vec::new(),
        reactions: Vec::new(),
    })
}

fn read_activity(conn: &Connection, user_id: &str, kind: ActivityKind) -> RusqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT item_id FROM user_activity WHERE user_id = ?1 AND kind = ?2 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![user_id, kind.as_str()], |row| row.get(0))?;
    let ids = rows.collect::<RusqliteResult<Vec<String>>>()?;
    Ok(ids)
}

fn with_activity(conn: &Connection, mut user: User) -> RusqliteResult<User> {
    user.posts = read_activity(conn, &user.id, ActivityKind::Post)?;
    user.comments = read_activity(conn, &user.id, ActivityKind::Comment)?;
    user.reactions = read_activity(conn, &user.id, ActivityKind::Reaction)?;
    Ok(user)
}

pub fn create_user(conn: &Connection, user: &User) -> RusqliteResult<()> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, anonymous_id, join_date, last_login, is_admin, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.email.to_lowercase(),
            user.password_hash,
            user.anonymous_id,
            to_db_timestamp(user.join_date),
            user.last_login.map(to_db_timestamp),
            user.is_admin,
            user.is_active,
        ],
    )?;
    Ok(())
}

pub fn read_user_by_email(conn: &Connection, email: &str) -> RusqliteResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            [email.to_lowercase()],
            user_from_row,
        )
        .optional()?;
    user.map(|u| with_activity(conn, u)).transpose()
}

pub fn read_user_by_id(conn: &Connection, user_id: &str) -> RusqliteResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [user_id],
            user_from_row,
        )
        .optional()?;
    user.map(|u| with_activity(conn, u)).transpose()
}

pub fn read_all_users(conn: &Connection) -> RusqliteResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY join_date", USER_COLUMNS))?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<RusqliteResult<Vec<User>>>()?;
    users.into_iter().map(|u| with_activity(conn, u)).collect()
}

pub fn read_admin_emails(conn: &Connection) -> RusqliteResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT email FROM users WHERE is_admin = 1 ORDER BY join_date")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let emails = rows.collect::<RusqliteResult<Vec<String>>>()?;
    Ok(emails)
}

pub fn update_last_login_time(conn: &Connection, user_id: &str, at: DateTime<Utc>) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        params![to_db_timestamp(at), user_id],
    )?;
    Ok(())
}

pub fn update_password_hash(conn: &Connection, user_id: &str, password_hash: &str) -> RusqliteResult<usize> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )
}

pub fn update_active_flag(conn: &Connection, user_id: &str, is_active: bool) -> RusqliteResult<usize> {
    conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![is_active, user_id],
    )
}

pub fn add_activity(conn: &Connection, user_id: &str, kind: ActivityKind, item_id: &str) -> RusqliteResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_activity (user_id, kind, item_id) VALUES (?1, ?2, ?3)",
        params![user_id, kind.as_str(), item_id],
    )?;
    Ok(())
}

// --- Password reset tokens ---

pub fn create_reset_token(conn: &Connection, token: &PasswordResetToken) -> RusqliteResult<()> {
    conn.execute(
        "INSERT INTO password_reset_tokens (id, user_id, token, expires, used) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token.id,
            token.user_id,
            token.token,
            to_db_timestamp(token.expires),
            token.used,
        ],
    )?;
    Ok(())
}

pub fn read_unused_reset_token(conn: &Connection, token: &str) -> RusqliteResult<Option<PasswordResetToken>> {
    conn.query_row(
        "SELECT id, user_id, token, expires, used FROM password_reset_tokens WHERE token = ?1 AND used = 0",
        [token],
        |row| {
            Ok(PasswordResetToken {
                id: row.get(0)?,
                user_id: row.get(1)?,
                token: row.get(2)?,
                expires: column_timestamp(row, 3)?,
                used: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn consume_reset_token(
    conn: &mut Connection,
    token_id: &str,
    user_id: &str,
    new_password_hash: &str,
) -> RusqliteResult<bool> {
    let tx = conn.transaction()?;
    let claimed = tx.execute(
        "UPDATE password_reset_tokens SET used = 1 WHERE id = ?1 AND used = 0",
        [token_id],
    )?;
    if claimed == 0 {
        return Ok(false);
    }
    let updated = tx.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![new_password_hash, user_id],
    )?;
    if updated == 0 {
        // Dropping the transaction rolls the token claim back.
        return Ok(false);
    }
    tx.commit()?;
    Ok(true)
}

pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let conn = self.pool.get()?;
        create_user(&conn, user).map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Duplicate(format!("user {}", user.email))
            } else {
                DbError::from(e)
            }
        })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_user_by_email(&conn, email)?)
    }

    fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_user_by_id(&conn, user_id)?)
    }

    fn list_users(&self) -> Result<Vec<User>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_all_users(&conn)?)
    }

    fn update_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), DbError> {
        let conn = self.pool.get()?;
        Ok(update_last_login_time(&conn, user_id, at)?)
    }

    fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<bool, DbError> {
        let conn = self.pool.get()?;
        Ok(update_password_hash(&conn, user_id, password_hash)? > 0)
    }

    fn set_active(&self, user_id: &str, is_active: bool) -> Result<bool, DbError> {
        let conn = self.pool.get()?;
        Ok(update_active_flag(&conn, user_id, is_active)? > 0)
    }

    fn record_activity(&self, user_id: &str, kind: ActivityKind, item_id: &str) -> Result<(), DbError> {
        let conn = self.pool.get()?;
        Ok(add_activity(&conn, user_id, kind, item_id)?)
    }

    fn insert_reset_token(&self, token: &PasswordResetToken) -> Result<(), DbError> {
        let conn = self.pool.get()?;
        Ok(create_reset_token(&conn, token)?)
    }

    fn find_unused_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_unused_reset_token(&conn, token)?)
    }

    fn consume_reset_token(&self, token_id: &str, user_id: &str, new_password_hash: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get()?;
        Ok(consume_reset_token(&mut conn, token_id, user_id, new_password_hash)?)
    }
}
