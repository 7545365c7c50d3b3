use crate::models::db_operations::{
    column_optional_timestamp, column_parsed, column_timestamp, is_unique_violation, to_db_timestamp,
    DbError,
};
use crate::models::repository::ReportRepository;
use crate::models::{Report, ReportStatus};
use crate::DbPool;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult};

const REPORT_COLUMNS: &str = "id, post_id, reporter_id, reason, description, timestamp, status, priority, reviewed_by, reviewed_at, admin_notes";

fn report_from_row(row: &rusqlite::Row<'_>) -> RusqliteResult<Report> {
    Ok(Report {
        id: row.get(0)?,
        post_id: row.get(1)?,
        reporter_id: row.get(2)?,
        reason: row.get(3)?,
        description: row.get(4)?,
        timestamp: column_timestamp(row, 5)?,
        status: column_parsed(row, 6)?,
        priority: column_parsed(row, 7)?,
        reviewed_by: row.get(8)?,
        reviewed_at: column_optional_timestamp(row, 9)?,
        admin_notes: row.get(10)?,
    })
}

pub fn create_report(conn: &Connection, report: &Report) -> RusqliteResult<()> {
    conn.execute(
        "INSERT INTO reports (id, post_id, reporter_id, reason, description, timestamp, status, priority, reviewed_by, reviewed_at, admin_notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            report.id,
            report.post_id,
            report.reporter_id,
            report.reason,
            report.description,
            to_db_timestamp(report.timestamp),
            report.status.as_str(),
            report.priority.as_str(),
            report.reviewed_by,
            report.reviewed_at.map(to_db_timestamp),
            report.admin_notes,
        ],
    )?;
    Ok(())
}

pub fn read_report(conn: &Connection, report_id: &str) -> RusqliteResult<Option<Report>> {
    conn.query_row(
        &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
        [report_id],
        report_from_row,
    )
    .optional()
}

pub fn read_active_report(conn: &Connection, post_id: &str, reporter_id: &str) -> RusqliteResult<Option<Report>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM reports WHERE post_id = ?1 AND reporter_id = ?2 AND status != 'dismissed' LIMIT 1",
            REPORT_COLUMNS
        ),
        params![post_id, reporter_id],
        report_from_row,
    )
    .optional()
}

pub fn read_all_reports(conn: &Connection) -> RusqliteResult<Vec<Report>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM reports ORDER BY rowid", REPORT_COLUMNS))?;
    let reports = stmt
        .query_map([], report_from_row)?
        .collect::<RusqliteResult<Vec<Report>>>()?;
    Ok(reports)
}

pub fn read_reports_for_post(conn: &Connection, post_id: &str) -> RusqliteResult<Vec<Report>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reports WHERE post_id = ?1 ORDER BY rowid",
        REPORT_COLUMNS
    ))?;
    let reports = stmt
        .query_map([post_id], report_from_row)?
        .collect::<RusqliteResult<Vec<Report>>>()?;
    Ok(reports)
}

/// Only a pending report can be reviewed; the status check lives in the
/// UPDATE itself so two concurrent reviews cannot both succeed.
pub fn update_review(
    conn: &Connection,
    report_id: &str,
    status: ReportStatus,
    reviewer_id: &str,
    reviewed_at: DateTime<Utc>,
    notes: Option<&str>,
) -> RusqliteResult<usize> {
    conn.execute(
        "UPDATE reports SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, admin_notes = ?4
         WHERE id = ?5 AND status = 'pending'",
        params![status.as_str(), reviewer_id, to_db_timestamp(reviewed_at), notes, report_id],
    )
}

pub struct SqliteReportRepository {
    pool: DbPool,
}

impl SqliteReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ReportRepository for SqliteReportRepository {
    fn insert_report(&self, report: &Report) -> Result<(), DbError> {
        let conn = self.pool.get()?;
        create_report(&conn, report).map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Duplicate(format!("active report on post {}", report.post_id))
            } else {
                DbError::from(e)
            }
        })
    }

    fn find_report(&self, report_id: &str) -> Result<Option<Report>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_report(&conn, report_id)?)
    }

    fn find_active_report(&self, post_id: &str, reporter_id: &str) -> Result<Option<Report>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_active_report(&conn, post_id, reporter_id)?)
    }

    fn list_reports(&self) -> Result<Vec<Report>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_all_reports(&conn)?)
    }

    fn list_reports_for_post(&self, post_id: &str) -> Result<Vec<Report>, DbError> {
        let conn = self.pool.get()?;
        Ok(read_reports_for_post(&conn, post_id)?)
    }

    fn mark_reviewed(
        &self,
        report_id: &str,
        status: ReportStatus,
        reviewer_id: &str,
        reviewed_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<bool, DbError> {
        let conn = self.pool.get()?;
        Ok(update_review(&conn, report_id, status, reviewer_id, reviewed_at, notes)? == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportPriority;
    use crate::setup::db_setup;

    fn open_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = Connection::open(dir.path().join("accounts.db")).unwrap();
        db_setup::setup_accounts_db(&mut conn).unwrap();
        (dir, conn)
    }

    fn pending(id: &str, reporter: Option<&str>) -> Report {
        Report {
            id: id.to_string(),
            post_id: "post-1".to_string(),
            reporter_id: reporter.map(str::to_string),
            reason: "harassment".to_string(),
            description: Some("targets a named person".to_string()),
            timestamp: Utc::now(),
            status: ReportStatus::Pending,
            priority: ReportPriority::High,
            reviewed_by: None,
            reviewed_at: None,
            admin_notes: None,
        }
    }

    #[test]
    fn report_round_trips_through_sqlite() {
        let (_dir, conn) = open_conn();
        let report = pending("r1", Some("u1"));
        create_report(&conn, &report).unwrap();

        let loaded = read_report(&conn, "r1").unwrap().unwrap();
        assert_eq!(loaded.priority, ReportPriority::High);
        assert_eq!(loaded.status, ReportStatus::Pending);
        assert_eq!(loaded.reporter_id.as_deref(), Some("u1"));
        assert_eq!(loaded.timestamp.timestamp_millis(), report.timestamp.timestamp_millis());
    }

    #[test]
    fn review_applies_only_to_pending_reports() {
        let (_dir, conn) = open_conn();
        create_report(&conn, &pending("r1", None)).unwrap();

        let now = Utc::now();
        assert_eq!(update_review(&conn, "r1", ReportStatus::Resolved, "admin", now, Some("ok")).unwrap(), 1);
        assert_eq!(update_review(&conn, "r1", ReportStatus::Dismissed, "admin", now, None).unwrap(), 0);

        let loaded = read_report(&conn, "r1").unwrap().unwrap();
        assert_eq!(loaded.status, ReportStatus::Resolved);
        assert_eq!(loaded.admin_notes.as_deref(), Some("ok"));
        assert_eq!(loaded.reviewed_by.as_deref(), Some("admin"));
    }

    #[test]
    fn dismissed_reports_are_not_active() {
        let (_dir, conn) = open_conn();
        create_report(&conn, &pending("r1", Some("u1"))).unwrap();
        assert!(read_active_report(&conn, "post-1", "u1").unwrap().is_some());

        update_review(&conn, "r1", ReportStatus::Dismissed, "admin", Utc::now(), None).unwrap();
        assert!(read_active_report(&conn, "post-1", "u1").unwrap().is_none());
    }

    #[test]
    fn second_open_report_from_reporter_violates_index() {
        let (_dir, conn) = open_conn();
        create_report(&conn, &pending("r1", Some("u1"))).unwrap();

        let err = create_report(&conn, &pending("r2", Some("u1"))).unwrap_err();
        assert!(is_unique_violation(&err));

        // Anonymous reports never collide.
        create_report(&conn, &pending("r3", None)).unwrap();
        create_report(&conn, &pending("r4", None)).unwrap();

        update_review(&conn, "r1", ReportStatus::Dismissed, "admin", Utc::now(), None).unwrap();
        create_report(&conn, &pending("r2", Some("u1"))).unwrap();
    }
}
