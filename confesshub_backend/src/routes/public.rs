use crate::error::ApiResult;
use crate::helper::post_helpers::{self, NewComment, NewPost, PostQuery};
use crate::middleware::MaybeSessionUser;
use crate::models::{CommentReactionKind, CommentThread, ReactionKind, POST_CATEGORIES};
use crate::routes::{deserialize_tags, success};
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    kind: ReactionKind,
}

#[derive(Deserialize)]
pub struct CommentReactionRequest {
    #[serde(rename = "type")]
    kind: CommentReactionKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    content: String,
    parent_id: Option<String>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/posts", web::get().to(list_posts))
        .route("/posts", web::post().to(create_post))
        .route("/posts/categories", web::get().to(post_categories))
        .route("/posts/{id}", web::get().to(get_post))
        .route("/posts/{id}/reactions", web::get().to(get_reactions))
        .route("/posts/{id}/reactions", web::post().to(add_reaction))
        .route("/posts/{id}/comments", web::get().to(list_comments))
        .route("/posts/{id}/comments", web::post().to(create_comment))
        .route("/comments/{id}/reactions", web::post().to(add_comment_reaction));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn list_posts(state: web::Data<AppState>, query: web::Query<PostQuery>) -> ApiResult<HttpResponse> {
    let page = post_helpers::list_posts(state.posts.as_ref(), &query)?;
    Ok(success(page))
}

async fn create_post(
    state: web::Data<AppState>,
    user: MaybeSessionUser,
    body: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let post = post_helpers::create_post(
        state.posts.as_ref(),
        state.users.as_ref(),
        NewPost {
            content: &body.content,
            category: &body.category,
            tags: &body.tags,
            user_id: user.user_id(),
        },
        Utc::now(),
        &mut rand::thread_rng(),
    )?;
    Ok(success(json!({ "post": post, "message": "Post created successfully" })))
}

async fn post_categories() -> HttpResponse {
    let categories: Vec<_> = POST_CATEGORIES
        .iter()
        .map(|(value, label)| json!({ "value": value, "label": label }))
        .collect();
    success(json!({ "categories": categories }))
}

async fn get_post(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let post = post_helpers::get_post(state.posts.as_ref(), &id)?;
    Ok(success(json!({ "post": post })))
}

async fn get_reactions(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let post = post_helpers::get_post(state.posts.as_ref(), &id)?;
    Ok(success(json!({ "total": post.reactions.total(), "reactions": post.reactions })))
}

async fn add_reaction(
    state: web::Data<AppState>,
    user: MaybeSessionUser,
    id: web::Path<String>,
    body: web::Json<ReactionRequest>,
) -> ApiResult<HttpResponse> {
    let post = post_helpers::react_to_post(state.posts.as_ref(), state.users.as_ref(), &id, body.kind, user.user_id())?;
    Ok(success(json!({
        "message": "Reaction added successfully",
        "total": post.reactions.total(),
        "reactions": post.reactions,
        "post": post,
    })))
}

async fn list_comments(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let comments = post_helpers::comment_threads(state.posts.as_ref(), &id)?;
    Ok(success(json!({ "comments": comments })))
}

async fn create_comment(
    state: web::Data<AppState>,
    user: MaybeSessionUser,
    id: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> ApiResult<HttpResponse> {
    let comment = post_helpers::create_comment(
        state.posts.as_ref(),
        state.users.as_ref(),
        NewComment {
            post_id: &id,
            parent_id: body.parent_id.as_deref(),
            content: &body.content,
            user_id: user.user_id(),
        },
        Utc::now(),
        &mut rand::thread_rng(),
    )?;
    Ok(success(json!({ "comment": CommentThread::from(comment) })))
}

async fn add_comment_reaction(
    state: web::Data<AppState>,
    user: MaybeSessionUser,
    id: web::Path<String>,
    body: web::Json<CommentReactionRequest>,
) -> ApiResult<HttpResponse> {
    let comment = post_helpers::react_to_comment(state.posts.as_ref(), state.users.as_ref(), &id, body.kind, user.user_id())?;
    Ok(success(json!({ "reactions": comment.reactions })))
}
