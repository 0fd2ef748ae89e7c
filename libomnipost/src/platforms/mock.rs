//! Mock platform implementation for testing
//!
//! A configurable mock adapter that can simulate successes, failures, and
//! network latency. Integration tests use it to verify the publish loop
//! without real credentials or network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::media::MediaRef;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{Connection, MediaAsset, PlatformKind, Post};

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Which platform this mock stands in for
    pub kind: PlatformKind,

    /// Whether media resolution should succeed
    pub resolve_succeeds: bool,

    /// Whether publishing should succeed
    pub publish_succeeds: bool,

    /// Error text returned on media resolution failure
    pub resolve_error: Option<String>,

    /// Error text returned on publish failure
    pub publish_error: Option<String>,

    /// Zero-based comment indexes that should fail
    pub failing_comments: Vec<usize>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Number of times resolve_media has been called
    pub resolve_call_count: Arc<Mutex<usize>>,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Number of times comment has been called
    pub comment_call_count: Arc<Mutex<usize>>,

    /// Content that has been published (for verification)
    pub published_content: Arc<Mutex<Vec<String>>>,

    /// Comment texts that were accepted
    pub posted_comments: Arc<Mutex<Vec<String>>>,

    /// Access tokens the adapter was handed, in call order
    pub seen_tokens: Arc<Mutex<Vec<String>>>,
}

impl MockConfig {
    fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            resolve_succeeds: true,
            publish_succeeds: true,
            resolve_error: None,
            publish_error: None,
            failing_comments: Vec::new(),
            delay: Duration::from_millis(0),
            resolve_call_count: Arc::new(Mutex::new(0)),
            publish_call_count: Arc::new(Mutex::new(0)),
            comment_call_count: Arc::new(Mutex::new(0)),
            published_content: Arc::new(Mutex::new(Vec::new())),
            posted_comments: Arc::new(Mutex::new(Vec::new())),
            seen_tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A mock that succeeds at everything
    pub fn success(kind: PlatformKind) -> Self {
        Self::new(MockConfig::new(kind))
    }

    /// A mock whose publish call fails
    pub fn publish_failure(kind: PlatformKind, error: &str) -> Self {
        let mut config = MockConfig::new(kind);
        config.publish_succeeds = false;
        config.publish_error = Some(error.to_string());
        Self::new(config)
    }

    /// A mock whose media resolution fails
    pub fn resolve_failure(kind: PlatformKind, error: &str) -> Self {
        let mut config = MockConfig::new(kind);
        config.resolve_succeeds = false;
        config.resolve_error = Some(error.to_string());
        Self::new(config)
    }

    /// A mock where the given comment indexes fail
    pub fn failing_comments(kind: PlatformKind, indexes: &[usize]) -> Self {
        let mut config = MockConfig::new(kind);
        config.failing_comments = indexes.to_vec();
        Self::new(config)
    }

    /// A mock where every operation takes at least `delay`
    pub fn with_delay(kind: PlatformKind, delay: Duration) -> Self {
        let mut config = MockConfig::new(kind);
        config.delay = delay;
        Self::new(config)
    }

    /// Shared handles for asserting on calls after the mock is boxed
    pub fn config(&self) -> MockConfig {
        self.config.clone()
    }

    pub fn resolve_call_count(&self) -> usize {
        *self.config.resolve_call_count.lock().unwrap()
    }

    pub fn publish_call_count(&self) -> usize {
        *self.config.publish_call_count.lock().unwrap()
    }

    pub fn comment_call_count(&self) -> usize {
        *self.config.comment_call_count.lock().unwrap()
    }

    pub fn published_content(&self) -> Vec<String> {
        self.config.published_content.lock().unwrap().clone()
    }

    pub fn posted_comments(&self) -> Vec<String> {
        self.config.posted_comments.lock().unwrap().clone()
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.config.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn kind(&self) -> PlatformKind {
        self.config.kind
    }

    async fn resolve_media(
        &self,
        _connection: &Connection,
        access_token: &str,
        media: &[MediaAsset],
    ) -> PlatformResult<Vec<MediaRef>> {
        *self.config.resolve_call_count.lock().unwrap() += 1;
        self.config
            .seen_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.resolve_succeeds {
            Ok(media
                .iter()
                .map(|asset| MediaRef::new(asset.kind, format!("mock-ref-{}", asset.filename)))
                .collect())
        } else {
            let error_msg = self
                .config
                .resolve_error
                .clone()
                .unwrap_or_else(|| "Mock media resolution failed".to_string());
            Err(PlatformError::Publish(error_msg))
        }
    }

    async fn publish(
        &self,
        _connection: &Connection,
        access_token: &str,
        post: &Post,
        _media: &[MediaRef],
    ) -> PlatformResult<String> {
        *self.config.publish_call_count.lock().unwrap() += 1;
        self.config
            .seen_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.publish_succeeds {
            self.config
                .published_content
                .lock()
                .unwrap()
                .push(post.content.clone());
            Ok(format!("{}:mock-{}", self.config.kind, uuid::Uuid::new_v4()))
        } else {
            let error_msg = self
                .config
                .publish_error
                .clone()
                .unwrap_or_else(|| "Mock publishing failed".to_string());
            Err(PlatformError::Publish(error_msg))
        }
    }

    async fn comment(
        &self,
        _connection: &Connection,
        _access_token: &str,
        _remote_id: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let index = {
            let mut count = self.config.comment_call_count.lock().unwrap();
            let index = *count;
            *count += 1;
            index
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.failing_comments.contains(&index) {
            Err(PlatformError::Comment(format!(
                "Mock comment {} rejected",
                index
            )))
        } else {
            self.config
                .posted_comments
                .lock()
                .unwrap()
                .push(text.to_string());
            Ok(())
        }
    }
}
