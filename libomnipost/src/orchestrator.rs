//! Multi-platform publish orchestration
//!
//! Walks a post's target platforms in order, publishing to each one in
//! turn and folding the per-platform results into the post's persisted
//! state. One platform failing never stops the others; the post ends up
//! `published` if anything went out and `failed` only when nothing did.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::PublishConfig;
use crate::db::Database;
use crate::error::{OmnipostError, PlatformError, Result};
use crate::platforms::{Platform, PlatformResult};
use crate::tokens::TokenProvider;
use crate::types::{PlatformKind, PlatformOutcome, PostStatus, PublishReport};

/// Publishes a post to every platform it targets.
///
/// Each platform attempt runs the same sequence: look up the stored
/// connection, obtain a valid access token, resolve media, publish, then
/// post any trailing comments. Every adapter call is bounded by the
/// configured call timeout. Platforms that already carry a published
/// timestamp from an earlier attempt are skipped, so retrying a partial
/// failure only touches the platforms that still need it.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use libomnipost::config::Config;
/// use libomnipost::db::Database;
/// use libomnipost::orchestrator::MultiPlatformPublisher;
/// use libomnipost::platforms::create_adapters;
/// use libomnipost::tokens::TokenService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::load()?;
/// let db = Database::new(&config.database.path).await?;
/// let http = reqwest::Client::new();
/// let tokens = Arc::new(TokenService::new(
///     db.clone(),
///     http.clone(),
///     config.platforms.clone(),
///     config.publish.refresh_margin_secs,
/// ));
///
/// let publisher =
///     MultiPlatformPublisher::new(create_adapters(&http), tokens, db, &config.publish);
/// let report = publisher.publish_post("post-id").await?;
/// println!("{}: {}/{} platforms", report.status, report.succeeded, report.failed);
/// # Ok(())
/// # }
/// ```
pub struct MultiPlatformPublisher {
    platforms: Vec<Box<dyn Platform>>,
    tokens: Arc<dyn TokenProvider>,
    db: Database,
    call_timeout: Duration,
    comment_delay: Duration,
}

impl MultiPlatformPublisher {
    pub fn new(
        platforms: Vec<Box<dyn Platform>>,
        tokens: Arc<dyn TokenProvider>,
        db: Database,
        publish: &PublishConfig,
    ) -> Self {
        Self {
            platforms,
            tokens,
            db,
            call_timeout: Duration::from_secs(publish.call_timeout_secs),
            comment_delay: Duration::from_secs(publish.comment_delay_secs),
        }
    }

    /// Publish a stored post to all of its pending platforms.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the post does not exist or was already
    /// published cleanly, and a database error when persisting the result
    /// fails. Per-platform failures do not error; they are reported in
    /// the returned [`PublishReport`].
    pub async fn publish_post(&self, post_id: &str) -> Result<PublishReport> {
        let mut post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| OmnipostError::InvalidInput(format!("Post not found: {}", post_id)))?;

        if post.status == PostStatus::Published && post.error_message.is_none() {
            return Err(OmnipostError::InvalidInput(format!(
                "Post {} is already published",
                post.id
            )));
        }

        info!(
            "Publishing post {} to {} platform(s)",
            post.id,
            post.platforms.len()
        );

        let mut outcomes: Vec<PlatformOutcome> = Vec::new();
        let mut skipped: Vec<PlatformKind> = Vec::new();

        for kind in post.platforms.clone() {
            if post.published_at.contains_key(&kind) {
                info!("Already published to {}, skipping", kind);
                skipped.push(kind);
                continue;
            }

            let outcome = match self.platform_for(kind) {
                Some(platform) => self.publish_to_platform(platform, &post).await?,
                None => PlatformOutcome::failed(kind, "No adapter available".to_string()),
            };

            match &outcome.error {
                Some(e) => warn!("Failed to publish to {}: {}", kind, e),
                None => info!("Successfully published to {}", kind),
            }
            outcomes.push(outcome);
        }

        for outcome in &outcomes {
            if let Some(ts) = outcome.published_at {
                post.published_at.insert(outcome.platform, ts);
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;

        let mut errors: Vec<String> = Vec::new();
        for outcome in &outcomes {
            for error in outcome.error_strings() {
                errors.push(format!("{}: {}", outcome.platform, error));
            }
        }

        // Anything live on a platform counts as published, even when other
        // platforms failed this round.
        let status = if succeeded == 0 && skipped.is_empty() {
            PostStatus::Failed
        } else {
            PostStatus::Published
        };
        let error_message = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };

        self.db
            .update_publish_state(&post.id, status, &post.published_at, error_message.as_deref())
            .await?;

        info!(
            "Post {} finished as {}: {} succeeded, {} failed, {} skipped",
            post.id,
            status,
            succeeded,
            failed,
            skipped.len()
        );

        Ok(PublishReport {
            post_id: post.id,
            status,
            succeeded,
            failed,
            skipped,
            error_message,
            outcomes,
        })
    }

    /// Run the full per-platform sequence, folding adapter failures into
    /// the outcome. Only infrastructure errors (the database) propagate.
    async fn publish_to_platform(
        &self,
        platform: &dyn Platform,
        post: &crate::types::Post,
    ) -> Result<PlatformOutcome> {
        let kind = platform.kind();

        let connection = match self.db.get_active_connection(kind).await? {
            Some(connection) => connection,
            None => {
                return Ok(PlatformOutcome::failed(
                    kind,
                    "No active connection".to_string(),
                ))
            }
        };

        let token_result =
            tokio::time::timeout(self.call_timeout, self.tokens.ensure_valid_token(&connection))
                .await;
        let access_token = match token_result {
            Ok(Ok(token)) => token,
            Ok(Err(OmnipostError::Platform(e))) => {
                return Ok(PlatformOutcome::failed(kind, e.to_string()))
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                let e = PlatformError::Auth(format!(
                    "timed out after {}s",
                    self.call_timeout.as_secs()
                ));
                return Ok(PlatformOutcome::failed(kind, e.to_string()));
            }
        };

        let media = match self
            .bounded(
                platform.resolve_media(&connection, &access_token, &post.media),
                PlatformError::Publish,
            )
            .await
        {
            Ok(refs) => refs,
            Err(e) => return Ok(PlatformOutcome::failed(kind, e.to_string())),
        };

        let remote_id = match self
            .bounded(
                platform.publish(&connection, &access_token, post, &media),
                PlatformError::Publish,
            )
            .await
        {
            Ok(id) => id,
            Err(e) => return Ok(PlatformOutcome::failed(kind, e.to_string())),
        };

        let mut outcome = PlatformOutcome::succeeded(kind, remote_id.clone(), Utc::now().timestamp());

        for text in &post.comments {
            tokio::time::sleep(self.comment_delay).await;

            let result = self
                .bounded(
                    platform.comment(&connection, &access_token, &remote_id, text),
                    PlatformError::Comment,
                )
                .await;

            if let Err(e) = result {
                warn!("Comment on {} failed: {}", kind, e);
                outcome.comment_errors.push(e.to_string());
            }
        }

        Ok(outcome)
    }

    /// Bound one adapter call by the configured timeout
    async fn bounded<T, F>(
        &self,
        fut: F,
        on_timeout: fn(String) -> PlatformError,
    ) -> PlatformResult<T>
    where
        F: Future<Output = PlatformResult<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        }
    }

    fn platform_for(&self, kind: PlatformKind) -> Option<&dyn Platform> {
        self.platforms
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
    }
}
