use crate::helper::post_helpers::{compute_analytics, PostAnalytics};
use crate::helper::report_helpers::compute_stats;
use crate::models::db_operations::DbError;
use crate::models::repository::{PostRepository, ReportRepository, UserRepository};
use crate::models::{PublicUser, ReportStats, User, UserStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("User not found")]
    UserNotFound,
    #[error("Administrators cannot deactivate their own account")]
    CannotDeactivateSelf,
    #[error(transparent)]
    Storage(#[from] DbError),
}

pub fn compute_user_stats(users: &[User], now: DateTime<Utc>) -> UserStats {
    let today = now.date_naive();
    UserStats {
        total_users: users.len(),
        active_users: users.iter().filter(|u| u.is_active).count(),
        new_users_today: users.iter().filter(|u| u.join_date.date_naive() == today).count(),
        admin_users: users.iter().filter(|u| u.is_admin).count(),
    }
}

pub fn user_stats(users: &dyn UserRepository, now: DateTime<Utc>) -> Result<UserStats, AdminHelperError> {
    Ok(compute_user_stats(&users.list_users()?, now))
}

/// Newest accounts first, without password hashes.
pub fn list_users(users: &dyn UserRepository) -> Result<Vec<PublicUser>, AdminHelperError> {
    let mut all = users.list_users()?;
    all.sort_by(|a, b| b.join_date.cmp(&a.join_date));
    Ok(all.into_iter().map(PublicUser::from).collect())
}

pub fn set_user_active(
    users: &dyn UserRepository,
    acting_admin_id: &str,
    user_id: &str,
    is_active: bool,
) -> Result<PublicUser, AdminHelperError> {
    if !is_active && acting_admin_id == user_id {
        return Err(AdminHelperError::CannotDeactivateSelf);
    }
    if !users.set_active(user_id, is_active)? {
        return Err(AdminHelperError::UserNotFound);
    }
    let user = users.find_user_by_id(user_id)?.ok_or(AdminHelperError::UserNotFound)?;
    log::info!(
        "Admin {} {} account {}",
        acting_admin_id,
        if is_active { "reactivated" } else { "deactivated" },
        user_id
    );
    Ok(PublicUser::from(user))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: UserStats,
    pub posts: PostAnalytics,
    pub reports: ReportStats,
    pub last_updated: DateTime<Utc>,
    pub uptime_seconds: i64,
}

pub fn dashboard_stats(
    posts: &dyn PostRepository,
    reports: &dyn ReportRepository,
    users: &dyn UserRepository,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<AdminStats, AdminHelperError> {
    Ok(AdminStats {
        users: user_stats(users, now)?,
        posts: compute_analytics(&posts.list_posts()?),
        reports: compute_stats(&reports.list_reports()?),
        last_updated: now,
        uptime_seconds: (now - started_at).num_seconds().max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_post, TestStores};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 6, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn seed(stores: &TestStores, email: &str, joined: DateTime<Utc>, is_admin: bool) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            anonymous_id: "CalmVoice3".to_string(),
            join_date: joined,
            last_login: None,
            is_admin,
            is_active: true,
            posts: Vec::new(),
            comments: Vec::new(),
            reactions: Vec::new(),
        };
        stores.users.insert_user(&user).unwrap();
        user
    }

    #[test]
    fn user_stats_count_today_in_utc() {
        let stores = TestStores::open();
        seed(&stores, "old@example.com", t(-48), false);
        seed(&stores, "admin@example.com", t(-1), true);
        let fresh = seed(&stores, "fresh@example.com", t(1), false);
        stores.users.set_active(&fresh.id, false).unwrap();

        let stats = user_stats(&stores.users, t(2)).unwrap();
        assert_eq!(
            stats,
            UserStats { total_users: 3, active_users: 2, new_users_today: 2, admin_users: 1 }
        );
    }

    #[test]
    fn listing_is_newest_first() {
        let stores = TestStores::open();
        seed(&stores, "first@example.com", t(0), false);
        seed(&stores, "second@example.com", t(1), false);
        let listed = list_users(&stores.users).unwrap();
        assert_eq!(listed[0].email, "second@example.com");
    }

    #[test]
    fn deactivation_rules() {
        let stores = TestStores::open();
        let admin = seed(&stores, "admin@example.com", t(0), true);
        let member = seed(&stores, "member@example.com", t(0), false);

        assert!(matches!(
            set_user_active(&stores.users, &admin.id, &admin.id, false),
            Err(AdminHelperError::CannotDeactivateSelf)
        ));
        assert!(matches!(
            set_user_active(&stores.users, &admin.id, "missing", false),
            Err(AdminHelperError::UserNotFound)
        ));

        assert!(!set_user_active(&stores.users, &admin.id, &member.id, false).unwrap().is_active);
        assert!(set_user_active(&stores.users, &admin.id, &member.id, true).unwrap().is_active);
    }

    #[test]
    fn dashboard_combines_all_stores() {
        let stores = TestStores::open();
        seed(&stores, "admin@example.com", t(0), true);
        insert_post(&stores, "family");
        insert_post(&stores, "family");

        let stats = dashboard_stats(&stores.posts, &stores.reports, &stores.users, t(0), t(1)).unwrap();
        assert_eq!(stats.users.total_users, 1);
        assert_eq!(stats.posts.total_posts, 2);
        assert_eq!(stats.posts.category_breakdown.get("family"), Some(&2));
        assert_eq!(stats.reports.total_reports, 0);
        assert_eq!(stats.uptime_seconds, 3600);
        assert_eq!(stats.last_updated, t(1));
    }
}
