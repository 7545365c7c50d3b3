use crate::models::db_operations::DbError;
use crate::models::repository::{PostRepository, ReportRepository};
use crate::models::{Report, ReportPriority, ReportStats, ReportStatus, ReviewAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_REASON_CHARS: usize = 64;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_NOTES_CHARS: usize = 2000;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),
    #[error("Post not found")]
    PostNotFound,
    #[error("You have already reported this post")]
    AlreadyReported,
    #[error("Report not found")]
    ReportNotFound,
    #[error("Report has already been reviewed")]
    AlreadyReviewed,
    #[error(transparent)]
    Storage(#[from] DbError),
}

pub struct NewReport<'a> {
    pub post_id: &'a str,
    pub reason: &'a str,
    pub description: Option<&'a str>,
    /// `None` files the report anonymously.
    pub reporter_id: Option<&'a str>,
}

fn optional_text(value: Option<&str>, max_chars: usize, field: &str) -> Result<Option<String>, ReportError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max_chars => Err(ReportError::Validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        ))),
        Some(v) => Ok(Some(v.to_string())),
        None => Ok(None),
    }
}

pub fn create_report(
    posts: &dyn PostRepository,
    reports: &dyn ReportRepository,
    input: NewReport<'_>,
    now: DateTime<Utc>,
) -> Result<Report, ReportError> {
    let post_id = input.post_id.trim();
    let reason = input.reason.trim();
    if post_id.is_empty() || reason.is_empty() {
        return Err(ReportError::Validation("Post ID and reason are required".to_string()));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(ReportError::Validation(format!(
            "Reason must be at most {} characters",
            MAX_REASON_CHARS
        )));
    }
    let description = optional_text(input.description, MAX_DESCRIPTION_CHARS, "Description")?;

    if posts.find_post(post_id)?.is_none() {
        return Err(ReportError::PostNotFound);
    }

    if let Some(reporter_id) = input.reporter_id {
        if reports.find_active_report(post_id, reporter_id)?.is_some() {
            return Err(ReportError::AlreadyReported);
        }
    }

    let report = Report {
        id: Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        reporter_id: input.reporter_id.map(str::to_string),
        reason: reason.to_string(),
        description,
        timestamp: now,
        status: ReportStatus::Pending,
        priority: ReportPriority::for_reason(reason),
        reviewed_by: None,
        reviewed_at: None,
        admin_notes: None,
    };
    match reports.insert_report(&report) {
        Ok(()) => {}
        // Lost a race with a concurrent report from the same reporter.
        Err(DbError::Duplicate(_)) => return Err(ReportError::AlreadyReported),
        Err(e) => return Err(e.into()),
    }

    log::info!(
        "Report {} filed against post {} (reason '{}', priority {})",
        report.id, report.post_id, report.reason, report.priority
    );
    Ok(report)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub priority: Option<ReportPriority>,
    pub reason: Option<String>,
    pub limit: Option<usize>,
}

impl ReportFilter {
    fn matches(&self, report: &Report) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.priority.map_or(true, |p| report.priority == p)
            && self.reason.as_deref().map_or(true, |r| report.reason == r)
    }
}

/// Most urgent first, newest first within a tier.
pub fn triage_order(a: &Report, b: &Report) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
}

pub fn filter_and_sort(reports: Vec<Report>, filter: &ReportFilter) -> Vec<Report> {
    let mut filtered: Vec<Report> = reports.into_iter().filter(|r| filter.matches(r)).collect();
    filtered.sort_by(triage_order);
    if let Some(limit) = filter.limit.filter(|l| *l > 0) {
        filtered.truncate(limit);
    }
    filtered
}

pub fn list_reports(reports: &dyn ReportRepository, filter: &ReportFilter) -> Result<Vec<Report>, ReportError> {
    Ok(filter_and_sort(reports.list_reports()?, filter))
}

pub fn reports_for_post(reports: &dyn ReportRepository, post_id: &str) -> Result<Vec<Report>, ReportError> {
    let mut found = reports.list_reports_for_post(post_id)?;
    found.sort_by(triage_order);
    Ok(found)
}

/// Newest reports regardless of priority.
pub fn recent_reports(reports: &dyn ReportRepository, limit: usize) -> Result<Vec<Report>, ReportError> {
    let mut all = reports.list_reports()?;
    all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    all.truncate(limit);
    Ok(all)
}

pub fn review_report(
    reports: &dyn ReportRepository,
    report_id: &str,
    admin_id: &str,
    action: ReviewAction,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Report, ReportError> {
    let notes = optional_text(notes, MAX_NOTES_CHARS, "Notes")?;
    let report = reports.find_report(report_id)?.ok_or(ReportError::ReportNotFound)?;
    if report.status != ReportStatus::Pending {
        return Err(ReportError::AlreadyReviewed);
    }

    let status = action.resulting_status();
    if !reports.mark_reviewed(report_id, status, admin_id, now, notes.as_deref())? {
        // Another reviewer got there between the read and the update.
        return Err(ReportError::AlreadyReviewed);
    }

    log::info!("Report {} {} by admin {}", report_id, status.as_str(), admin_id);
    Ok(Report {
        status,
        reviewed_by: Some(admin_id.to_string()),
        reviewed_at: Some(now),
        admin_notes: notes,
        ..report
    })
}

#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub success: usize,
    pub failed: usize,
}

/// Resolves each report independently; review failures are counted, storage
/// failures abort.
pub fn bulk_resolve(
    reports: &dyn ReportRepository,
    report_ids: &[String],
    admin_id: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<BulkOutcome, ReportError> {
    let mut outcome = BulkOutcome::default();
    for report_id in report_ids {
        match review_report(reports, report_id, admin_id, ReviewAction::Resolve, notes, now) {
            Ok(_) => outcome.success += 1,
            Err(ReportError::Storage(e)) => return Err(ReportError::Storage(e)),
            Err(e) => {
                log::warn!("Bulk resolve skipped report {}: {}", report_id, e);
                outcome.failed += 1;
            }
        }
    }
    Ok(outcome)
}

pub fn compute_stats(reports: &[Report]) -> ReportStats {
    let mut stats = ReportStats {
        total_reports: reports.len(),
        ..ReportStats::default()
    };

    let mut reviewed = 0usize;
    let mut total_latency_ms = 0i64;

    for report in reports {
        match report.status {
            ReportStatus::Pending => stats.pending_reports += 1,
            ReportStatus::Resolved => stats.resolved_reports += 1,
            ReportStatus::Dismissed => stats.dismissed_reports += 1,
        }
        if report.status == ReportStatus::Pending && report.priority == ReportPriority::Urgent {
            stats.urgent_reports += 1;
        }
        *stats.reports_by_category.entry(report.reason.clone()).or_insert(0) += 1;
        *stats.reports_by_priority.entry(report.priority.as_str().to_string()).or_insert(0) += 1;
        *stats.reports_by_status.entry(report.status.as_str().to_string()).or_insert(0) += 1;

        if let Some(reviewed_at) = report.reviewed_at {
            reviewed += 1;
            total_latency_ms += (reviewed_at - report.timestamp).num_milliseconds();
        }
    }

    if reviewed > 0 {
        stats.average_response_time = total_latency_ms as f64 / reviewed as f64 / 3_600_000.0;
    }
    stats
}

pub fn report_stats(reports: &dyn ReportRepository) -> Result<ReportStats, ReportError> {
    Ok(compute_stats(&reports.list_reports()?))
}
