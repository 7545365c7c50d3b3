use crate::error::{ApiError, ApiResult};
use crate::helper::report_helpers::{self, ReportFilter, DEFAULT_RECENT_LIMIT};
use crate::helper::{admin_helpers, post_helpers};
use crate::middleware::AdminUser;
use crate::models::ReviewAction;
use crate::routes::success;
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// Upper bound on ids accepted by one bulk-resolve call.
const MAX_BULK_REPORTS: usize = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    report_id: String,
    action: ReviewAction,
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolveRequest {
    #[serde(default)]
    report_ids: Vec<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct RecentQuery {
    limit: Option<usize>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/stats", web::get().to(dashboard_stats))
        .route("/reports", web::get().to(list_reports))
        .route("/reports/recent", web::get().to(recent_reports))
        .route("/reports/review", web::post().to(review_report))
        .route("/reports/bulk-resolve", web::post().to(bulk_resolve))
        .route("/posts/{id}/reports", web::get().to(reports_for_post))
        .route("/posts/{id}", web::delete().to(delete_post))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}/deactivate", web::post().to(deactivate_user))
        .route("/users/{id}/reactivate", web::post().to(reactivate_user));
}

async fn dashboard_stats(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let stats = admin_helpers::dashboard_stats(
        state.posts.as_ref(),
        state.reports.as_ref(),
        state.users.as_ref(),
        state.started_at,
        Utc::now(),
    )?;
    Ok(success(json!({ "stats": stats })))
}

async fn list_reports(state: web::Data<AppState>, filter: web::Query<ReportFilter>) -> ApiResult<HttpResponse> {
    let reports = report_helpers::list_reports(state.reports.as_ref(), &filter)?;
    let stats = report_helpers::report_stats(state.reports.as_ref())?;
    Ok(success(json!({
        "total": reports.len(),
        "reports": reports,
        "stats": stats,
    })))
}

async fn recent_reports(state: web::Data<AppState>, query: web::Query<RecentQuery>) -> ApiResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let reports = report_helpers::recent_reports(state.reports.as_ref(), limit)?;
    Ok(success(json!({ "reports": reports })))
}

async fn review_report(
    state: web::Data<AppState>,
    admin: AdminUser,
    body: web::Json<ReviewRequest>,
) -> ApiResult<HttpResponse> {
    if body.report_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Report ID and action are required".to_string()));
    }
    let report = report_helpers::review_report(
        state.reports.as_ref(),
        body.report_id.trim(),
        &admin.user_id,
        body.action,
        body.notes.as_deref(),
        Utc::now(),
    )?;
    let verb = match body.action {
        ReviewAction::Resolve => "resolved",
        ReviewAction::Dismiss => "dismissed",
    };
    Ok(success(json!({
        "message": format!("Report {} successfully", verb),
        "action": body.action,
        "report": report,
    })))
}

async fn bulk_resolve(
    state: web::Data<AppState>,
    admin: AdminUser,
    body: web::Json<BulkResolveRequest>,
) -> ApiResult<HttpResponse> {
    if body.report_ids.is_empty() {
        return Err(ApiError::BadRequest("At least one report ID is required".to_string()));
    }
    if body.report_ids.len() > MAX_BULK_REPORTS {
        return Err(ApiError::BadRequest(format!(
            "At most {} reports can be resolved at once",
            MAX_BULK_REPORTS
        )));
    }
    let outcome = report_helpers::bulk_resolve(
        state.reports.as_ref(),
        &body.report_ids,
        &admin.user_id,
        body.notes.as_deref(),
        Utc::now(),
    )?;
    // `{"success": <count>, "failed": <count>}`, no envelope.
    Ok(HttpResponse::Ok().json(outcome))
}

async fn reports_for_post(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let reports = report_helpers::reports_for_post(state.reports.as_ref(), &id)?;
    Ok(success(json!({ "reports": reports })))
}

async fn delete_post(state: web::Data<AppState>, admin: AdminUser, id: web::Path<String>) -> ApiResult<HttpResponse> {
    post_helpers::delete_post(state.posts.as_ref(), &id)?;
    log::info!("Admin {} deleted post {}", admin.user_id, id.as_str());
    Ok(success(json!({ "message": "Post deleted successfully" })))
}

async fn list_users(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let users = admin_helpers::list_users(state.users.as_ref())?;
    let stats = admin_helpers::user_stats(state.users.as_ref(), Utc::now())?;
    Ok(success(json!({ "users": users, "stats": stats })))
}

async fn deactivate_user(state: web::Data<AppState>, admin: AdminUser, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let user = admin_helpers::set_user_active(state.users.as_ref(), &admin.user_id, &id, false)?;
    Ok(success(json!({ "user": user })))
}

async fn reactivate_user(state: web::Data<AppState>, admin: AdminUser, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let user = admin_helpers::set_user_active(state.users.as_ref(), &admin.user_id, &id, true)?;
    Ok(success(json!({ "user": user })))
}
