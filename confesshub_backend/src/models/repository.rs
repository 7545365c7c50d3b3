//! Storage seams for the application state.
//!
//! Handlers never touch a database handle directly; they go through these
//! traits so the backing store can be swapped (see `db_operations` for the
//! redb and SQLite implementations).

use crate::models::db_operations::DbError;
use crate::models::{
    ActivityKind, Comment, CommentReactionKind, PasswordResetToken, Post, ReactionKind, Report, ReportStatus, User,
};
use chrono::{DateTime, Utc};

pub trait PostRepository: Send + Sync {
    fn insert_post(&self, post: &Post) -> Result<(), DbError>;
    fn find_post(&self, post_id: &str) -> Result<Option<Post>, DbError>;
    fn list_posts(&self) -> Result<Vec<Post>, DbError>;
    /// Returns the updated post, or `None` if it does not exist.
    fn increment_post_reaction(&self, post_id: &str, kind: ReactionKind) -> Result<Option<Post>, DbError>;
    /// Removes the post and all of its comments.
    fn delete_post(&self, post_id: &str) -> Result<bool, DbError>;

    /// Stores the comment and bumps the parent post's comment counter.
    fn insert_comment(&self, comment: &Comment) -> Result<(), DbError>;
    fn find_comment(&self, comment_id: &str) -> Result<Option<Comment>, DbError>;
    /// Comments of a post, oldest first.
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, DbError>;
    fn increment_comment_reaction(&self, comment_id: &str, kind: CommentReactionKind) -> Result<Option<Comment>, DbError>;
}

pub trait ReportRepository: Send + Sync {
    fn insert_report(&self, report: &Report) -> Result<(), DbError>;
    fn find_report(&self, report_id: &str) -> Result<Option<Report>, DbError>;
    /// A non-dismissed report filed by `reporter_id` against `post_id`.
    fn find_active_report(&self, post_id: &str, reporter_id: &str) -> Result<Option<Report>, DbError>;
    fn list_reports(&self) -> Result<Vec<Report>, DbError>;
    fn list_reports_for_post(&self, post_id: &str) -> Result<Vec<Report>, DbError>;
    /// Moves a pending report to `status`. Returns `false` when the report
    /// was no longer pending, so a report is only ever reviewed once.
    fn mark_reviewed(
        &self,
        report_id: &str,
        status: ReportStatus,
        reviewer_id: &str,
        reviewed_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<bool, DbError>;
}

pub trait UserRepository: Send + Sync {
    fn insert_user(&self, user: &User) -> Result<(), DbError>;
    /// Lookup is case-insensitive.
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
    fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, DbError>;
    fn list_users(&self) -> Result<Vec<User>, DbError>;
    fn update_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), DbError>;
    fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<bool, DbError>;
    fn set_active(&self, user_id: &str, is_active: bool) -> Result<bool, DbError>;
    /// Adds an item id to one of the user's activity lists. Duplicates are ignored.
    fn record_activity(&self, user_id: &str, kind: ActivityKind, item_id: &str) -> Result<(), DbError>;

    fn insert_reset_token(&self, token: &PasswordResetToken) -> Result<(), DbError>;
    fn find_unused_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, DbError>;
    /// Marks the token used and stores the new hash in one transaction.
    /// Returns `false` if the token had already been used.
    fn consume_reset_token(&self, token_id: &str, user_id: &str, new_password_hash: &str) -> Result<bool, DbError>;
}
