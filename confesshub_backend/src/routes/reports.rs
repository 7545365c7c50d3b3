use crate::error::ApiResult;
use crate::helper::report_helpers::{self, NewReport, ReportFilter};
use crate::middleware::{AdminUser, MaybeSessionUser};
use crate::models::REPORT_CATEGORIES;
use crate::routes::success;
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    post_id: String,
    #[serde(default)]
    reason: String,
    description: Option<String>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/reports", web::post().to(create_report))
        .route("/reports", web::get().to(list_reports))
        .route("/reports/categories", web::get().to(report_categories));
}

async fn create_report(
    state: web::Data<AppState>,
    user: MaybeSessionUser,
    body: web::Json<CreateReportRequest>,
) -> ApiResult<HttpResponse> {
    let report = report_helpers::create_report(
        state.posts.as_ref(),
        state.reports.as_ref(),
        NewReport {
            post_id: &body.post_id,
            reason: &body.reason,
            description: body.description.as_deref(),
            reporter_id: user.user_id(),
        },
        Utc::now(),
    )?;
    Ok(success(json!({
        "report": report,
        "message": "Report submitted successfully. Our moderation team will review it.",
    })))
}

async fn list_reports(
    state: web::Data<AppState>,
    _admin: AdminUser,
    filter: web::Query<ReportFilter>,
) -> ApiResult<HttpResponse> {
    let reports = report_helpers::list_reports(state.reports.as_ref(), &filter)?;
    let stats = report_helpers::report_stats(state.reports.as_ref())?;
    Ok(success(json!({
        "reports": reports,
        "stats": stats,
        "categories": REPORT_CATEGORIES,
    })))
}

async fn report_categories() -> HttpResponse {
    success(json!({ "categories": REPORT_CATEGORIES }))
}
