use crate::helper::anonymous_names::generate_anonymous_name;
use crate::helper::sanitization_helpers::{normalize_tags, sanitize_plain_text};
use crate::models::db_operations::DbError;
use crate::models::repository::{PostRepository, UserRepository};
use crate::models::{
    is_known_post_category, ActivityKind, Comment, CommentReactionKind, CommentReactions, CommentThread, Post,
    PostReactions, PostSort, ReactionKind,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_POST_CHARS: usize = 10;
pub const MAX_POST_CHARS: usize = 1000;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_REPLY_CHARS: usize = 500;
pub const MAX_TAGS: usize = 5;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum PostError {
    #[error("{0}")]
    Validation(String),
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Parent comment belongs to a different post")]
    ParentMismatch,
    #[error(transparent)]
    Storage(#[from] DbError),
}

pub struct NewPost<'a> {
    pub content: &'a str,
    pub category: &'a str,
    pub tags: &'a [String],
    pub user_id: Option<&'a str>,
}

pub fn create_post<R: Rng + ?Sized>(
    posts: &dyn PostRepository,
    users: &dyn UserRepository,
    input: NewPost<'_>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Post, PostError> {
    let content = sanitize_plain_text(input.content);
    let category = input.category.trim();
    if content.is_empty() || category.is_empty() {
        return Err(PostError::Validation("Content and category are required".to_string()));
    }
    let length = content.chars().count();
    if length < MIN_POST_CHARS {
        return Err(PostError::Validation(format!(
            "Content must be at least {} characters long",
            MIN_POST_CHARS
        )));
    }
    if length > MAX_POST_CHARS {
        return Err(PostError::Validation(format!(
            "Content must be at most {} characters",
            MAX_POST_CHARS
        )));
    }
    if !is_known_post_category(category) {
        return Err(PostError::Validation(format!("Unknown category '{}'", category)));
    }

    let post = Post {
        id: Uuid::new_v4().to_string(),
        content,
        category: category.to_string(),
        anonymous_name: generate_anonymous_name(rng),
        timestamp: now,
        reactions: PostReactions::default(),
        comments: 0,
        tags: normalize_tags(input.tags, MAX_TAGS),
        user_id: input.user_id.map(str::to_string),
    };
    posts.insert_post(&post)?;

    if let Some(user_id) = input.user_id {
        users.record_activity(user_id, ActivityKind::Post, &post.id)?;
    }
    log::info!("Post {} created in '{}'", post.id, post.category);
    Ok(post)
}

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: PostSort,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostAnalytics {
    pub total_posts: usize,
    pub total_reactions: u64,
    pub category_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    /// Number of posts matching the filters, before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
    pub analytics: PostAnalytics,
}

pub fn compute_analytics(posts: &[Post]) -> PostAnalytics {
    let mut analytics = PostAnalytics {
        total_posts: posts.len(),
        ..PostAnalytics::default()
    };
    for post in posts {
        analytics.total_reactions += post.reactions.total();
        *analytics.category_breakdown.entry(post.category.clone()).or_insert(0) += 1;
    }
    analytics
}

fn matches_query(post: &Post, category: Option<&str>, needle: Option<&str>) -> bool {
    let category_ok = category.map_or(true, |c| post.category == c);
    let search_ok = needle.map_or(true, |n| {
        post.content.to_lowercase().contains(n) || post.tags.iter().any(|t| t.to_lowercase().contains(n))
    });
    category_ok && search_ok
}

pub fn sort_posts(posts: &mut [Post], sort: PostSort) {
    match sort {
        PostSort::Recent => posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        PostSort::Popular => posts.sort_by(|a, b| {
            b.reactions
                .total()
                .cmp(&a.reactions.total())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        }),
        PostSort::Discussed => posts.sort_by(|a, b| {
            b.comments
                .cmp(&a.comments)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        }),
    }
}

pub fn list_posts(posts: &dyn PostRepository, query: &PostQuery) -> Result<PostPage, PostError> {
    let all = posts.list_posts()?;
    let analytics = compute_analytics(&all);

    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "all");
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut matching: Vec<Post> = all
        .into_iter()
        .filter(|p| matches_query(p, category, needle.as_deref()))
        .collect();
    sort_posts(&mut matching, query.sort);

    let total = matching.len();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);
    let page: Vec<Post> = matching.into_iter().skip(offset).take(limit).collect();

    Ok(PostPage {
        has_more: offset + page.len() < total,
        posts: page,
        total,
        limit,
        offset,
        analytics,
    })
}

pub fn get_post(posts: &dyn PostRepository, post_id: &str) -> Result<Post, PostError> {
    posts.find_post(post_id)?.ok_or(PostError::PostNotFound)
}

pub fn react_to_post(
    posts: &dyn PostRepository,
    users: &dyn UserRepository,
    post_id: &str,
    kind: ReactionKind,
    user_id: Option<&str>,
) -> Result<Post, PostError> {
    let post = posts
        .increment_post_reaction(post_id, kind)?
        .ok_or(PostError::PostNotFound)?;
    if let Some(user_id) = user_id {
        users.record_activity(user_id, ActivityKind::Reaction, &post.id)?;
    }
    Ok(post)
}

pub fn delete_post(posts: &dyn PostRepository, post_id: &str) -> Result<(), PostError> {
    if !posts.delete_post(post_id)? {
        return Err(PostError::PostNotFound);
    }
    Ok(())
}

pub struct NewComment<'a> {
    pub post_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub content: &'a str,
    pub user_id: Option<&'a str>,
}

pub fn create_comment<R: Rng + ?Sized>(
    posts: &dyn PostRepository,
    users: &dyn UserRepository,
    input: NewComment<'_>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Comment, PostError> {
    let parent_id = input.parent_id.map(str::trim).filter(|p| !p.is_empty());
    let max_chars = if parent_id.is_some() { MAX_REPLY_CHARS } else { MAX_COMMENT_CHARS };

    let content = sanitize_plain_text(input.content);
    if content.is_empty() {
        return Err(PostError::Validation("Comment content is required".to_string()));
    }
    if content.chars().count() > max_chars {
        return Err(PostError::Validation(format!(
            "Comment must be at most {} characters",
            max_chars
        )));
    }

    if posts.find_post(input.post_id)?.is_none() {
        return Err(PostError::PostNotFound);
    }
    if let Some(parent_id) = parent_id {
        let parent = posts.find_comment(parent_id)?.ok_or(PostError::CommentNotFound)?;
        if parent.post_id != input.post_id {
            return Err(PostError::ParentMismatch);
        }
        if parent.parent_id.is_some() {
            return Err(PostError::Validation("Replies cannot be nested".to_string()));
        }
    }

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        post_id: input.post_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        content,
        anonymous_name: generate_anonymous_name(rng),
        timestamp: now,
        reactions: CommentReactions::default(),
        user_id: input.user_id.map(str::to_string),
    };
    match posts.insert_comment(&comment) {
        Ok(()) => {}
        // Deleted between the existence check and the write.
        Err(DbError::NotFound(_)) => return Err(PostError::PostNotFound),
        Err(e) => return Err(e.into()),
    }

    if let Some(user_id) = input.user_id {
        users.record_activity(user_id, ActivityKind::Comment, &comment.id)?;
    }
    Ok(comment)
}

/// Groups a post's comments (oldest first) into top-level threads with one
/// level of replies. A reply whose parent is itself a reply is listed under
/// the top-level comment of that chain.
pub fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let mut threads: Vec<CommentThread> = Vec::new();
    let mut thread_of: HashMap<String, usize> = HashMap::new();
    for comment in comments {
        let slot = comment.parent_id.as_ref().and_then(|p| thread_of.get(p).copied());
        match slot {
            Some(slot) => {
                thread_of.insert(comment.id.clone(), slot);
                threads[slot].replies.push(CommentThread::from(comment));
            }
            None => {
                thread_of.insert(comment.id.clone(), threads.len());
                threads.push(CommentThread::from(comment));
            }
        }
    }
    threads
}

pub fn comment_threads(posts: &dyn PostRepository, post_id: &str) -> Result<Vec<CommentThread>, PostError> {
    if posts.find_post(post_id)?.is_none() {
        return Err(PostError::PostNotFound);
    }
    Ok(build_threads(posts.list_comments(post_id)?))
}

pub fn react_to_comment(
    posts: &dyn PostRepository,
    users: &dyn UserRepository,
    comment_id: &str,
    kind: CommentReactionKind,
    user_id: Option<&str>,
) -> Result<Comment, PostError> {
    let comment = posts
        .increment_comment_reaction(comment_id, kind)?
        .ok_or(PostError::CommentNotFound)?;
    if let Some(user_id) = user_id {
        users.record_activity(user_id, ActivityKind::Reaction, &comment.id)?;
    }
    Ok(comment)
}
