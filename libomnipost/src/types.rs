//! Core types for Omnipost

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::identity::ConnectionIdentity;

/// The social platforms a post can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Linkedin,
    Twitter,
    Instagram,
    Threads,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Linkedin,
        PlatformKind::Twitter,
        PlatformKind::Instagram,
        PlatformKind::Threads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Linkedin => "linkedin",
            PlatformKind::Twitter => "twitter",
            PlatformKind::Instagram => "instagram",
            PlatformKind::Threads => "threads",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = crate::error::OmnipostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(PlatformKind::Linkedin),
            "twitter" | "x" => Ok(PlatformKind::Twitter),
            "instagram" => Ok(PlatformKind::Instagram),
            "threads" => Ok(PlatformKind::Threads),
            other => Err(crate::error::OmnipostError::InvalidInput(format!(
                "Unknown platform: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = crate::error::OmnipostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(crate::error::OmnipostError::InvalidInput(format!(
                "Unknown media type: {}",
                other
            ))),
        }
    }
}

/// A declared media asset on a post. The asset lives at a fetchable URL;
/// platform-specific upload happens at publish time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAsset {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub filename: String,
}

/// A structural person reference attached to a post. Rendering is
/// platform-specific (LinkedIn appends literal `@First Last` text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    pub first_name: String,
    pub last_name: String,
}

impl Mention {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub media: Vec<MediaAsset>,
    pub platforms: Vec<PlatformKind>,
    pub comments: Vec<String>,
    pub mentions: Vec<Mention>,
    pub created_at: i64,
    pub scheduled_at: Option<i64>,
    pub status: PostStatus,
    /// Per-platform publish timestamps from completed attempts. A platform
    /// present here succeeded on some attempt and is skipped on retry.
    pub published_at: BTreeMap<PlatformKind, i64>,
    pub error_message: Option<String>,
}

impl Post {
    pub fn new(content: String, platforms: Vec<PlatformKind>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            media: Vec::new(),
            platforms,
            comments: Vec::new(),
            mentions: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
            scheduled_at: None,
            status: PostStatus::Draft,
            published_at: BTreeMap::new(),
            error_message: None,
        }
    }

    /// Terminal full success: published everywhere with nothing recorded in
    /// the error field. Publishing such a post again is rejected.
    pub fn is_fully_published(&self) -> bool {
        self.status == PostStatus::Published && self.error_message.is_none()
    }
}

/// Stored OAuth credential set for one platform. At most one row per
/// platform; reconnecting upserts over the previous row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub platform: PlatformKind,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp; `None` for platforms that issue non-expiring tokens.
    pub expires_at: Option<i64>,
    pub active: bool,
    pub identity: ConnectionIdentity,
    pub updated_at: i64,
}

impl Connection {
    pub fn new(platform: PlatformKind, access_token: String) -> Self {
        Self {
            platform,
            access_token,
            refresh_token: None,
            expires_at: None,
            active: true,
            identity: ConnectionIdentity::default(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether the access token is expired or inside the refresh margin.
    /// Tokens without a recorded expiry are treated as valid until the
    /// platform itself rejects them.
    pub fn needs_refresh(&self, now: i64, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + margin_secs,
            None => false,
        }
    }
}

/// Result of one platform's publish attempt. Transient; folded into the
/// post's persisted status, timestamp map, and error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformOutcome {
    pub platform: PlatformKind,
    pub success: bool,
    pub remote_id: Option<String>,
    pub published_at: Option<i64>,
    pub error: Option<String>,
    /// Comment failures after a successful publish. Recorded, but they do
    /// not change `success`.
    pub comment_errors: Vec<String>,
}

impl PlatformOutcome {
    pub fn succeeded(platform: PlatformKind, remote_id: String, published_at: i64) -> Self {
        Self {
            platform,
            success: true,
            remote_id: Some(remote_id),
            published_at: Some(published_at),
            error: None,
            comment_errors: Vec::new(),
        }
    }

    pub fn failed(platform: PlatformKind, error: String) -> Self {
        Self {
            platform,
            success: false,
            remote_id: None,
            published_at: None,
            error: Some(error),
            comment_errors: Vec::new(),
        }
    }

    /// All error strings this outcome contributes to the post record, in
    /// the order they occurred.
    pub fn error_strings(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(e) = &self.error {
            errors.push(e.clone());
        }
        errors.extend(self.comment_errors.iter().cloned());
        errors
    }
}

/// Structured result returned to the "publish now" caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub post_id: String,
    pub status: PostStatus,
    pub succeeded: usize,
    pub failed: usize,
    /// Platforms skipped because a prior attempt already published there.
    pub skipped: Vec<PlatformKind>,
    pub error_message: Option<String>,
    pub outcomes: Vec<PlatformOutcome>,
}
