use crate::models::db_operations::DbError;
use crate::models::repository::PostRepository;
use crate::models::{Comment, CommentReactionKind, Post, ReactionKind, StoredPost};
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

// --- Posts ---
pub const POSTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("posts");

// --- Comments ---
pub const COMMENTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("comments");
/// (post id, created-at millis, comment id). Range scans give a post's
/// comments oldest first.
pub const COMMENT_INDEX: TableDefinition<(&[u8; 16], i64, &[u8; 16]), ()> = TableDefinition::new("comment_index");

/// Ids that are not UUIDs simply do not exist in this store.
fn key_for(id: &str) -> Option<[u8; 16]> {
    Uuid::parse_str(id).ok().map(|uuid| uuid.into_bytes())
}

pub struct RedbPostRepository {
    db: Database,
}

impl RedbPostRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl PostRepository for RedbPostRepository {
    fn insert_post(&self, post: &Post) -> Result<(), DbError> {
        let post_id_bytes = Uuid::parse_str(&post.id)?.into_bytes();
        let post_json = serde_json::to_string(&StoredPost::from(post))?;

        let write_txn = self.db.begin_write()?;
        {
            let mut posts_table = write_txn.open_table(POSTS)?;
            posts_table.insert(&post_id_bytes, post_json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_post(&self, post_id: &str) -> Result<Option<Post>, DbError> {
        let Some(post_id_bytes) = key_for(post_id) else {
            return Ok(None);
        };

        let read_txn = self.db.begin_read()?;
        let posts_table = read_txn.open_table(POSTS)?;
        let stored = posts_table
            .get(&post_id_bytes)?
            .map(|guard| serde_json::from_str::<StoredPost>(guard.value()))
            .transpose()?;
        Ok(stored.map(Post::from))
    }

    fn list_posts(&self) -> Result<Vec<Post>, DbError> {
        let read_txn = self.db.begin_read()?;
        let posts_table = read_txn.open_table(POSTS)?;

        let mut posts = Vec::new();
        for item_result in posts_table.iter()? {
            let (_id_bytes, post_json) = item_result?;
            let stored: StoredPost = serde_json::from_str(post_json.value())?;
            posts.push(Post::from(stored));
        }
        Ok(posts)
    }

    fn increment_post_reaction(&self, post_id: &str, kind: ReactionKind) -> Result<Option<Post>, DbError> {
        let Some(post_id_bytes) = key_for(post_id) else {
            return Ok(None);
        };

        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut posts_table = write_txn.open_table(POSTS)?;
            let current = posts_table
                .get(&post_id_bytes)?
                .map(|guard| serde_json::from_str::<StoredPost>(guard.value()))
                .transpose()?;

            match current {
                Some(mut post) => {
                    post.reactions.increment(kind);
                    let post_json = serde_json::to_string(&post)?;
                    posts_table.insert(&post_id_bytes, post_json.as_str())?;
                    Some(post)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated.map(Post::from))
    }

    fn delete_post(&self, post_id: &str) -> Result<bool, DbError> {
        let Some(post_id_bytes) = key_for(post_id) else {
            return Ok(false);
        };

        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut posts_table = write_txn.open_table(POSTS)?;
            let mut comments_table = write_txn.open_table(COMMENTS)?;
            let mut comment_index = write_txn.open_table(COMMENT_INDEX)?;

            let existed = posts_table.remove(&post_id_bytes)?.is_some();

            let start_key = (&post_id_bytes, i64::MIN, &[0u8; 16]);
            let end_key = (&post_id_bytes, i64::MAX, &[255u8; 16]);
            let comment_keys = comment_index
                .range(start_key..=end_key)?
                .map(|item_result| {
                    item_result.map(|(key, _)| {
                        let (_, created_at, comment_id) = key.value();
                        (created_at, *comment_id)
                    })
                })
                .collect::<Result<Vec<(i64, [u8; 16])>, _>>()?;

            for (created_at, comment_id) in &comment_keys {
                comment_index.remove((&post_id_bytes, *created_at, comment_id))?;
                comments_table.remove(comment_id)?;
            }
            existed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn insert_comment(&self, comment: &Comment) -> Result<(), DbError> {
        let post_id_bytes = Uuid::parse_str(&comment.post_id)?.into_bytes();
        let comment_id_bytes = Uuid::parse_str(&comment.id)?.into_bytes();
        let comment_json = serde_json::to_string(comment)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut posts_table = write_txn.open_table(POSTS)?;
            let mut comments_table = write_txn.open_table(COMMENTS)?;
            let mut comment_index = write_txn.open_table(COMMENT_INDEX)?;

            let mut post: StoredPost = {
                let post_guard = posts_table
                    .get(&post_id_bytes)?
                    .ok_or_else(|| DbError::NotFound(format!("post {}", comment.post_id)))?;
                serde_json::from_str(post_guard.value())?
            };
            post.comments += 1;
            let post_json = serde_json::to_string(&post)?;

            posts_table.insert(&post_id_bytes, post_json.as_str())?;
            comments_table.insert(&comment_id_bytes, comment_json.as_str())?;
            comment_index.insert(
                (&post_id_bytes, comment.timestamp.timestamp_millis(), &comment_id_bytes),
                (),
            )?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_comment(&self, comment_id: &str) -> Result<Option<Comment>, DbError> {
        let Some(comment_id_bytes) = key_for(comment_id) else {
            return Ok(None);
        };

        let read_txn = self.db.begin_read()?;
        let comments_table = read_txn.open_table(COMMENTS)?;
        let comment = comments_table
            .get(&comment_id_bytes)?
            .map(|guard| serde_json::from_str::<Comment>(guard.value()))
            .transpose()?;
        Ok(comment)
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, DbError> {
        let Some(post_id_bytes) = key_for(post_id) else {
            return Ok(Vec::new());
        };

        let read_txn = self.db.begin_read()?;
        let comments_table = read_txn.open_table(COMMENTS)?;
        let comment_index = read_txn.open_table(COMMENT_INDEX)?;

        let start_key = (&post_id_bytes, i64::MIN, &[0u8; 16]);
        let end_key = (&post_id_bytes, i64::MAX, &[255u8; 16]);

        let mut comments = Vec::new();
        for item_result in comment_index.range(start_key..=end_key)? {
            let (key, _) = item_result?;
            let comment_id_bytes = key.value().2;
            if let Some(comment_json) = comments_table.get(comment_id_bytes)? {
                comments.push(serde_json::from_str::<Comment>(comment_json.value())?);
            } else {
                log::warn!("Comment index points at a missing comment on post {}", post_id);
            }
        }
        Ok(comments)
    }

    fn increment_comment_reaction(
        &self,
        comment_id: &str,
        kind: CommentReactionKind,
    ) -> Result<Option<Comment>, DbError> {
        let Some(comment_id_bytes) = key_for(comment_id) else {
            return Ok(None);
        };

        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut comments_table = write_txn.open_table(COMMENTS)?;
            let current = comments_table
                .get(&comment_id_bytes)?
                .map(|guard| serde_json::from_str::<Comment>(guard.value()))
                .transpose()?;

            match current {
                Some(mut comment) => {
                    comment.reactions.increment(kind);
                    let comment_json = serde_json::to_string(&comment)?;
                    comments_table.insert(&comment_id_bytes, comment_json.as_str())?;
                    Some(comment)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentReactions, PostReactions};
    use crate::setup::db_setup;
    use chrono::{Duration, Utc};

    fn open_repo() -> (tempfile::TempDir, RedbPostRepository) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::create(dir.path().join("posts.db")).unwrap();
        db_setup::setup_posts_db(&db).unwrap();
        (dir, RedbPostRepository::new(db))
    }

    fn sample_post() -> Post {
        Post {
            id: Uuid::new_v4().to_string(),
            content: "I still sleep with the lights on.".to_string(),
            category: "secrets".to_string(),
            anonymous_name: "QuietSoul1".to_string(),
            timestamp: Utc::now(),
            reactions: PostReactions::default(),
            comments: 0,
            tags: vec!["fear".to_string()],
            user_id: Some("owner-1".to_string()),
        }
    }

    fn comment_on(post: &Post, offset_secs: i64) -> Comment {
        Comment {
            id: Uuid::new_v4().to_string(),
            post_id: post.id.clone(),
            parent_id: None,
            content: format!("comment {}", offset_secs),
            anonymous_name: "KindHeart2".to_string(),
            timestamp: post.timestamp + Duration::seconds(offset_secs),
            reactions: CommentReactions::default(),
            user_id: None,
        }
    }

    #[test]
    fn owner_survives_storage_but_not_serialization() {
        let (_dir, repo) = open_repo();
        let post = sample_post();
        repo.insert_post(&post).unwrap();

        let loaded = repo.find_post(&post.id).unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("owner-1"));

        let json = serde_json::to_value(&loaded).unwrap();
        assert!(json.get("userId").is_none());
        assert_eq!(json["anonymousName"], "QuietSoul1");
    }

    #[test]
    fn unknown_and_malformed_ids_are_absent() {
        let (_dir, repo) = open_repo();
        assert!(repo.find_post(&Uuid::new_v4().to_string()).unwrap().is_none());
        assert!(repo.find_post("not-a-uuid").unwrap().is_none());
        assert!(repo
            .increment_post_reaction("not-a-uuid", ReactionKind::Care)
            .unwrap()
            .is_none());
    }

    #[test]
    fn reactions_accumulate_per_kind() {
        let (_dir, repo) = open_repo();
        let post = sample_post();
        repo.insert_post(&post).unwrap();

        repo.increment_post_reaction(&post.id, ReactionKind::Support).unwrap();
        repo.increment_post_reaction(&post.id, ReactionKind::Support).unwrap();
        let updated = repo
            .increment_post_reaction(&post.id, ReactionKind::Care)
            .unwrap()
            .unwrap();

        assert_eq!(updated.reactions, PostReactions { support: 2, relate: 0, care: 1 });
        assert_eq!(updated.reactions.total(), 3);
    }

    #[test]
    fn comments_bump_count_and_list_oldest_first() {
        let (_dir, repo) = open_repo();
        let post = sample_post();
        repo.insert_post(&post).unwrap();

        let later = comment_on(&post, 30);
        let earlier = comment_on(&post, 10);
        repo.insert_comment(&later).unwrap();
        repo.insert_comment(&earlier).unwrap();

        let listed = repo.list_comments(&post.id).unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![earlier.id.as_str(), later.id.as_str()]);
        assert_eq!(repo.find_post(&post.id).unwrap().unwrap().comments, 2);
    }

    #[test]
    fn comment_on_missing_post_is_rejected() {
        let (_dir, repo) = open_repo();
        let ghost = sample_post();
        let err = repo.insert_comment(&comment_on(&ghost, 1)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn deleting_a_post_removes_its_comments() {
        let (_dir, repo) = open_repo();
        let post = sample_post();
        let other = sample_post();
        repo.insert_post(&post).unwrap();
        repo.insert_post(&other).unwrap();

        let doomed = comment_on(&post, 1);
        let kept = comment_on(&other, 1);
        repo.insert_comment(&doomed).unwrap();
        repo.insert_comment(&kept).unwrap();

        assert!(repo.delete_post(&post.id).unwrap());
        assert!(!repo.delete_post(&post.id).unwrap());
        assert!(repo.find_comment(&doomed.id).unwrap().is_none());
        assert!(repo.find_comment(&kept.id).unwrap().is_some());
        assert_eq!(repo.list_posts().unwrap().len(), 1);
    }

    #[test]
    fn comment_reactions_are_counted() {
        let (_dir, repo) = open_repo();
        let post = sample_post();
        repo.insert_post(&post).unwrap();
        let comment = comment_on(&post, 5);
        repo.insert_comment(&comment).unwrap();

        let updated = repo
            .increment_comment_reaction(&comment.id, CommentReactionKind::Relate)
            .unwrap()
            .unwrap();
        assert_eq!(updated.reactions, CommentReactions { support: 0, relate: 1 });
    }
}
