use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ====================================================================
// ============================ POSTS =================================
// ====================================================================

/// Categories a confession can be filed under.
pub const POST_CATEGORIES: [(&str, &str); 8] = [
    ("general", "General"),
    ("relationships", "Relationships"),
    ("work", "Work & Career"),
    ("family", "Family"),
    ("health", "Health & Wellness"),
    ("personal", "Personal Growth"),
    ("secrets", "Secrets"),
    ("regrets", "Regrets"),
];

pub fn is_known_post_category(category: &str) -> bool {
    POST_CATEGORIES.iter().any(|(value, _)| *value == category)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Support,
    Relate,
    Care,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Support => "support",
            ReactionKind::Relate => "relate",
            ReactionKind::Care => "care",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PostReactions {
    pub support: u64,
    pub relate: u64,
    pub care: u64,
}

impl PostReactions {
    pub fn total(&self) -> u64 {
        self.support + self.relate + self.care
    }

    pub fn increment(&mut self, kind: ReactionKind) {
        match kind {
            ReactionKind::Support => self.support += 1,
            ReactionKind::Relate => self.relate += 1,
            ReactionKind::Care => self.care += 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub category: String,
    pub anonymous_name: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: PostReactions,
    pub comments: u64,
    pub tags: Vec<String>,
    /// Owner of the post. Kept in storage, never sent to clients.
    #[serde(default, skip_serializing)]
    pub user_id: Option<String>,
}

/// Storage form of a post. Unlike `Post`, this serializes the owner.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredPost {
    pub id: String,
    pub content: String,
    pub category: String,
    pub anonymous_name: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: PostReactions,
    pub comments: u64,
    pub tags: Vec<String>,
    pub user_id: Option<String>,
}

impl From<StoredPost> for Post {
    fn from(p: StoredPost) -> Self {
        Post {
            id: p.id,
            content: p.content,
            category: p.category,
            anonymous_name: p.anonymous_name,
            timestamp: p.timestamp,
            reactions: p.reactions,
            comments: p.comments,
            tags: p.tags,
            user_id: p.user_id,
        }
    }
}

impl From<&Post> for StoredPost {
    fn from(p: &Post) -> Self {
        StoredPost {
            id: p.id.clone(),
            content: p.content.clone(),
            category: p.category.clone(),
            anonymous_name: p.anonymous_name.clone(),
            timestamp: p.timestamp,
            reactions: p.reactions.clone(),
            comments: p.comments,
            tags: p.tags.clone(),
            user_id: p.user_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Recent,
    Popular,
    Discussed,
}

// ====================================================================
// =========================== COMMENTS ===============================
// ====================================================================

/// Comments only take the two lighter reactions.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommentReactionKind {
    Support,
    Relate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CommentReactions {
    pub support: u64,
    pub relate: u64,
}

impl CommentReactions {
    pub fn increment(&mut self, kind: CommentReactionKind) {
        match kind {
            CommentReactionKind::Support => self.support += 1,
            CommentReactionKind::Relate => self.relate += 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub anonymous_name: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: CommentReactions,
    pub user_id: Option<String>,
}

/// A comment with its replies, as returned to clients.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub anonymous_name: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: CommentReactions,
    pub replies: Vec<CommentThread>,
}

impl From<Comment> for CommentThread {
    fn from(c: Comment) -> Self {
        CommentThread {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            content: c.content,
            anonymous_name: c.anonymous_name,
            timestamp: c.timestamp,
            reactions: c.reactions,
            replies: Vec::new(),
        }
    }
}

// ====================================================================
// =========================== REPORTS ================================
// ====================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            other => Err(format!("unknown report status '{}'", other)),
        }
    }
}

/// Triage tier. Variant order is the triage order, lowest first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
            ReportPriority::Urgent => "urgent",
        }
    }

    /// Fixed mapping from report reason to triage tier.
    pub fn for_reason(reason: &str) -> Self {
        match reason {
            "self-harm" => ReportPriority::Urgent,
            "harassment" | "hate-speech" => ReportPriority::High,
            "spam" => ReportPriority::Low,
            _ => ReportPriority::Medium,
        }
    }
}

impl FromStr for ReportPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ReportPriority::Low),
            "medium" => Ok(ReportPriority::Medium),
            "high" => Ok(ReportPriority::High),
            "urgent" => Ok(ReportPriority::Urgent),
            other => Err(format!("unknown report priority '{}'", other)),
        }
    }
}

impl fmt::Display for ReportPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Resolve,
    Dismiss,
}

impl ReviewAction {
    pub fn resulting_status(&self) -> ReportStatus {
        match self {
            ReviewAction::Resolve => ReportStatus::Resolved,
            ReviewAction::Dismiss => ReportStatus::Dismissed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub post_id: String,
    pub reporter_id: Option<String>,
    pub reason: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReportCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const REPORT_CATEGORIES: [ReportCategory; 8] = [
    ReportCategory {
        id: "harassment",
        name: "Harassment or Bullying",
        description: "Content that targets, intimidates, or harms others",
    },
    ReportCategory {
        id: "hate-speech",
        name: "Hate Speech",
        description: "Content promoting hatred or discrimination",
    },
    ReportCategory {
        id: "spam",
        name: "Spam or Commercial",
        description: "Unwanted promotional content or repetitive posts",
    },
    ReportCategory {
        id: "self-harm",
        name: "Self-Harm Content",
        description: "Content promoting or encouraging self-harm",
    },
    ReportCategory {
        id: "inappropriate",
        name: "Inappropriate Content",
        description: "Sexually explicit or disturbing content",
    },
    ReportCategory {
        id: "misinformation",
        name: "Misinformation",
        description: "False or misleading information",
    },
    ReportCategory {
        id: "privacy",
        name: "Privacy Violation",
        description: "Sharing personal information without consent",
    },
    ReportCategory {
        id: "other",
        name: "Other",
        description: "Other policy violations not listed above",
    },
];

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_reports: usize,
    pub pending_reports: usize,
    pub resolved_reports: usize,
    pub dismissed_reports: usize,
    /// Urgent reports still waiting for review.
    pub urgent_reports: usize,
    pub reports_by_category: BTreeMap<String, usize>,
    pub reports_by_priority: BTreeMap<String, usize>,
    pub reports_by_status: BTreeMap<String, usize>,
    /// Mean time from creation to review, in hours.
    pub average_response_time: f64,
}

// ====================================================================
// ============================ USERS =================================
// ====================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub anonymous_id: String,
    pub join_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_active: bool,
    pub posts: Vec<String>,
    pub comments: Vec<String>,
    pub reactions: Vec<String>,
}

/// A user with the password hash removed.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub anonymous_id: String,
    pub join_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_active: bool,
    pub posts: Vec<String>,
    pub comments: Vec<String>,
    pub reactions: Vec<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        PublicUser {
            id: u.id,
            email: u.email,
            anonymous_id: u.anonymous_id,
            join_date: u.join_date,
            last_login: u.last_login,
            is_admin: u.is_admin,
            is_active: u.is_active,
            posts: u.posts,
            comments: u.comments,
            reactions: u.reactions,
        }
    }
}

/// Kinds of items tracked against a user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Post,
    Comment,
    Reaction,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Post => "post",
            ActivityKind::Comment => "comment",
            ActivityKind::Reaction => "reaction",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    pub used: bool,
}

impl PasswordResetToken {
    /// A token stops being valid at the instant it expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub new_users_today: usize,
    pub admin_users: usize,
}

pub mod db_operations;
pub mod repository;
