//! Post creation and immediate publishing

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::{OmnipostError, PlatformError, Result};
use crate::orchestrator::MultiPlatformPublisher;
use crate::platforms::create_adapters;
use crate::scheduling;
use crate::tokens::TokenService;
use crate::types::{MediaAsset, Mention, PlatformKind, Post, PostStatus, PublishReport};

/// Everything needed to create a post. Media, comments, and mentions are
/// optional; an empty platform list falls back to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct NewPostRequest {
    pub content: String,
    pub platforms: Vec<PlatformKind>,
    pub media: Vec<MediaAsset>,
    pub comments: Vec<String>,
    pub mentions: Vec<Mention>,
    /// Unix timestamp to publish at. `None` stores a draft.
    pub scheduled_at: Option<i64>,
}

/// Creates posts and drives the publish pipeline for them.
#[derive(Clone)]
pub struct PostService {
    db: Database,
    config: Arc<Config>,
}

impl PostService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Validate and store a new post.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty content or a schedule that is not
    /// in the future, and a configuration error when no target platforms
    /// are given and none are configured as defaults.
    pub async fn create(&self, request: NewPostRequest) -> Result<Post> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(OmnipostError::InvalidInput(
                "Post content cannot be empty".to_string(),
            ));
        }

        let mut platforms = if request.platforms.is_empty() {
            self.config.defaults.platforms.clone()
        } else {
            request.platforms
        };
        dedupe_platforms(&mut platforms);
        if platforms.is_empty() {
            return Err(OmnipostError::Platform(PlatformError::Configuration(
                "No target platforms given and no defaults configured".to_string(),
            )));
        }

        if let Some(scheduled_at) = request.scheduled_at {
            if scheduled_at <= Utc::now().timestamp() {
                return Err(OmnipostError::InvalidInput(
                    "Scheduled time must be in the future".to_string(),
                ));
            }
        }

        let mut post = Post::new(content.to_string(), platforms);
        post.media = request.media;
        post.comments = request
            .comments
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        post.mentions = request.mentions;
        if request.scheduled_at.is_some() {
            post.scheduled_at = request.scheduled_at;
            post.status = PostStatus::Scheduled;
        }

        self.db.create_post(&post).await?;
        info!("Created {} post {}", post.status, post.id);
        Ok(post)
    }

    /// Turn a schedule string into a timestamp. Random offsets are applied
    /// to the tail of the current queue so batched posts stay spaced out.
    pub async fn resolve_schedule(&self, input: &str) -> Result<i64> {
        let last_scheduled = self
            .db
            .get_scheduled_posts()
            .await?
            .iter()
            .filter_map(|p| p.scheduled_at)
            .max();

        Ok(scheduling::parse_schedule(input, last_scheduled)?.timestamp())
    }

    /// Publish a stored post right now.
    pub async fn publish_now(&self, post_id: &str) -> Result<PublishReport> {
        self.publisher().publish_post(post_id).await
    }

    /// Assemble a publisher wired with the real platform adapters.
    pub fn publisher(&self) -> MultiPlatformPublisher {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenService::new(
            self.db.clone(),
            http.clone(),
            self.config.platforms.clone(),
            self.config.publish.refresh_margin_secs,
        ));

        MultiPlatformPublisher::new(
            create_adapters(&http),
            tokens,
            self.db.clone(),
            &self.config.publish,
        )
    }
}

fn dedupe_platforms(platforms: &mut Vec<PlatformKind>) {
    let mut seen: Vec<PlatformKind> = Vec::new();
    platforms.retain(|p| {
        if seen.contains(p) {
            false
        } else {
            seen.push(*p);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_service() -> (TempDir, PostService) {
        test_service_with(Config::default_config()).await
    }

    async fn test_service_with(config: Config) -> (TempDir, PostService) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        let service = PostService::new(db, Arc::new(config));
        (dir, service)
    }

    fn request(content: &str, platforms: Vec<PlatformKind>) -> NewPostRequest {
        NewPostRequest {
            content: content.to_string(),
            platforms,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_draft() {
        let (_dir, service) = test_service().await;

        let post = service
            .create(request("A new draft", vec![PlatformKind::Twitter]))
            .await
            .unwrap();

        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.platforms, vec![PlatformKind::Twitter]);
        assert!(post.scheduled_at.is_none());
    }

    #[tokio::test]
    async fn test_create_scheduled() {
        let (_dir, service) = test_service().await;
        let future = Utc::now().timestamp() + 3600;

        let mut req = request("Later", vec![PlatformKind::Linkedin]);
        req.scheduled_at = Some(future);
        let post = service.create(req).await.unwrap();

        assert_eq!(post.status, PostStatus::Scheduled);
        assert_eq!(post.scheduled_at, Some(future));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let (_dir, service) = test_service().await;

        let err = service
            .create(request("   ", vec![PlatformKind::Twitter]))
            .await
            .unwrap_err();
        assert!(matches!(err, OmnipostError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_platforms() {
        let (_dir, service) = test_service().await;

        let err = service.create(request("Hello", vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            OmnipostError::Platform(PlatformError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_create_falls_back_to_default_platforms() {
        let mut config = Config::default_config();
        config.defaults.platforms = vec![PlatformKind::Threads, PlatformKind::Twitter];
        let (_dir, service) = test_service_with(config).await;

        let post = service.create(request("Hello", vec![])).await.unwrap();
        assert_eq!(
            post.platforms,
            vec![PlatformKind::Threads, PlatformKind::Twitter]
        );
    }

    #[tokio::test]
    async fn test_create_dedupes_platforms() {
        let (_dir, service) = test_service().await;

        let post = service
            .create(request(
                "Hello",
                vec![
                    PlatformKind::Twitter,
                    PlatformKind::Linkedin,
                    PlatformKind::Twitter,
                ],
            ))
            .await
            .unwrap();

        assert_eq!(
            post.platforms,
            vec![PlatformKind::Twitter, PlatformKind::Linkedin]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_past_schedule() {
        let (_dir, service) = test_service().await;

        let mut req = request("Too late", vec![PlatformKind::Twitter]);
        req.scheduled_at = Some(Utc::now().timestamp() - 60);
        let err = service.create(req).await.unwrap_err();

        assert!(matches!(err, OmnipostError::InvalidInput(_)));
        assert!(err.to_string().contains("future"));
    }

    #[tokio::test]
    async fn test_create_drops_blank_comments() {
        let (_dir, service) = test_service().await;

        let mut req = request("Hello", vec![PlatformKind::Twitter]);
        req.comments = vec![
            "  first  ".to_string(),
            "".to_string(),
            "second".to_string(),
        ];
        let post = service.create(req).await.unwrap();

        assert_eq!(post.comments, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_resolve_schedule_random_offsets_from_queue_tail() {
        let (_dir, service) = test_service().await;
        let tail = Utc::now().timestamp() + 7200;

        let mut req = request("Queued", vec![PlatformKind::Twitter]);
        req.scheduled_at = Some(tail);
        service.create(req).await.unwrap();

        let resolved = service.resolve_schedule("random:10m-20m").await.unwrap();
        let offset_minutes = (resolved - tail) / 60;
        assert!(
            (10..=20).contains(&offset_minutes),
            "Expected 10-20 minutes after the queue tail, got {}",
            offset_minutes
        );
    }

    #[tokio::test]
    async fn test_publish_now_without_connections_fails_cleanly() {
        let (_dir, service) = test_service().await;
        let post = service
            .create(request("Hello", vec![PlatformKind::Twitter]))
            .await
            .unwrap();

        let report = service.publish_now(&post.id).await.unwrap();
        assert_eq!(report.status, PostStatus::Failed);
        assert!(report
            .error_message
            .unwrap()
            .contains("twitter: No active connection"));
    }
}
