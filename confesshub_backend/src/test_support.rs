use crate::models::db_operations::posts_db_operations::RedbPostRepository;
use crate::models::db_operations::reports_db_operations::SqliteReportRepository;
use crate::models::db_operations::users_db_operations::SqliteUserRepository;
use crate::models::repository::PostRepository;
use crate::models::{Post, PostReactions};
use crate::open_databases;
use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

/// Fresh on-disk stores in a temporary directory.
pub struct TestStores {
    _dir: TempDir,
    pub posts: RedbPostRepository,
    pub reports: SqliteReportRepository,
    pub users: SqliteUserRepository,
}

impl TestStores {
    pub fn open() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let (posts, pool) = open_databases(dir.path()).unwrap();
        TestStores {
            _dir: dir,
            posts,
            reports: SqliteReportRepository::new(pool.clone()),
            users: SqliteUserRepository::new(pool),
        }
    }
}

pub fn insert_post(stores: &TestStores, category: &str) -> Post {
    let post = Post {
        id: Uuid::new_v4().to_string(),
        content: "A confession long enough to be stored".to_string(),
        category: category.to_string(),
        anonymous_name: "QuietSoul1".to_string(),
        timestamp: Utc::now(),
        reactions: PostReactions::default(),
        comments: 0,
        tags: Vec::new(),
        user_id: None,
    };
    stores.posts.insert_post(&post).unwrap();
    post
}
