//! Scheduled queue operations

use tracing::info;

use crate::db::Database;
use crate::error::{OmnipostError, Result};
use crate::types::{Post, PostStatus};

/// Read and manage the scheduled post queue.
#[derive(Clone)]
pub struct QueueService {
    db: Database,
}

impl QueueService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All scheduled posts, soonest first.
    pub async fn list(&self) -> Result<Vec<Post>> {
        self.db.get_scheduled_posts().await
    }

    /// Look up a single post by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no post has that id.
    pub async fn show(&self, post_id: &str) -> Result<Post> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| OmnipostError::InvalidInput(format!("Post not found: {}", post_id)))
    }

    /// Take a post out of the queue. The post is kept as a draft with its
    /// schedule cleared, so it can be rescheduled or published later.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the post does not exist or is not
    /// currently scheduled.
    pub async fn cancel(&self, post_id: &str) -> Result<()> {
        if self.db.cancel_scheduled_post(post_id).await? {
            info!("Cancelled scheduled post {}", post_id);
            return Ok(());
        }

        match self.db.get_post(post_id).await? {
            Some(post) => Err(OmnipostError::InvalidInput(format!(
                "Post {} is not scheduled (status: {})",
                post_id, post.status
            ))),
            None => Err(OmnipostError::InvalidInput(format!(
                "Post not found: {}",
                post_id
            ))),
        }
    }

    /// Scheduled posts whose time has come, soonest first.
    pub async fn due(&self, now: i64) -> Result<Vec<Post>> {
        self.db.get_due_posts(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlatformKind;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn test_service() -> (TempDir, Database, QueueService) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        let service = QueueService::new(db.clone());
        (dir, db, service)
    }

    async fn scheduled_post(db: &Database, scheduled_at: i64) -> Post {
        let mut post = Post::new("Queued".to_string(), vec![PlatformKind::Twitter]);
        post.scheduled_at = Some(scheduled_at);
        post.status = PostStatus::Scheduled;
        db.create_post(&post).await.unwrap();
        post
    }

    #[tokio::test]
    async fn test_list_orders_by_schedule() {
        let (_dir, db, service) = test_service().await;
        let now = Utc::now().timestamp();
        let later = scheduled_post(&db, now + 7200).await;
        let sooner = scheduled_post(&db, now + 3600).await;

        let posts = service.list().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, sooner.id);
        assert_eq!(posts[1].id, later.id);
    }

    #[tokio::test]
    async fn test_show_missing_post() {
        let (_dir, _db, service) = test_service().await;

        let err = service.show("missing").await.unwrap_err();
        assert!(matches!(err, OmnipostError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_cancel_returns_post_to_draft() {
        let (_dir, db, service) = test_service().await;
        let post = scheduled_post(&db, Utc::now().timestamp() + 3600).await;

        service.cancel(&post.id).await.unwrap();

        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Draft);
        assert!(stored.scheduled_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_rejects_unscheduled_post() {
        let (_dir, db, service) = test_service().await;
        let post = Post::new("Draft".to_string(), vec![PlatformKind::Twitter]);
        db.create_post(&post).await.unwrap();

        let err = service.cancel(&post.id).await.unwrap_err();
        assert!(err.to_string().contains("not scheduled"));
        assert!(err.to_string().contains("draft"));
    }

    #[tokio::test]
    async fn test_cancel_missing_post() {
        let (_dir, _db, service) = test_service().await;

        let err = service.cancel("missing").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_due_filters_by_time() {
        let (_dir, db, service) = test_service().await;
        let now = Utc::now().timestamp();
        let due = scheduled_post(&db, now - 60).await;
        scheduled_post(&db, now + 3600).await;

        let posts = service.due(now).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, due.id);
    }
}
