//! Platform abstraction and implementations
//!
//! This module provides a unified trait for publishing to the supported
//! social platforms. Each implementation handles that platform's wire
//! protocol: payload shape, media upload flow, and comment mechanism. The
//! orchestrator only ever talks to the trait; nothing outside this module
//! branches on the platform.
//!
//! # Examples
//!
//! ```no_run
//! use libomnipost::platforms::create_adapters;
//!
//! let http = reqwest::Client::new();
//! for adapter in create_adapters(&http) {
//!     println!("adapter ready for {}", adapter.kind());
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;

use crate::error::PlatformError;
use crate::media::MediaRef;
use crate::types::{Connection, MediaAsset, PlatformKind, Post};

pub mod instagram;
pub mod linkedin;
pub mod threads;
pub mod twitter;

// Mock platform is available for all builds (not just tests) to support
// integration tests
pub mod mock;

/// Adapter-level result. Failures stay scoped to one platform; the
/// orchestrator folds them into the post record and moves on.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Uniform publishing capability for one social platform
///
/// The access token is passed in separately from the connection: the
/// orchestrator validates and refreshes tokens before the adapter runs, so
/// the connection's stored token may already be stale.
#[async_trait]
pub trait Platform: Send + Sync {
    /// The platform this adapter publishes to
    fn kind(&self) -> PlatformKind;

    /// Turn the post's declared assets into the references `publish` needs
    ///
    /// Byte-upload platforms download and upload the assets here; container
    /// platforms validate and pass the URLs through. Runs once per platform
    /// per publish attempt.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Publish` when an asset cannot be fetched or
    /// the platform rejects the upload.
    async fn resolve_media(
        &self,
        connection: &Connection,
        access_token: &str,
        media: &[MediaAsset],
    ) -> PlatformResult<Vec<MediaRef>>;

    /// Create the platform post
    ///
    /// Returns the remote post identifier in the form trailing comments
    /// need (for LinkedIn that is the full ugcPost URN).
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Configuration` when a required identity
    /// field is missing and `PlatformError::Publish` when the platform
    /// rejects the post.
    async fn publish(
        &self,
        connection: &Connection,
        access_token: &str,
        post: &Post,
        media: &[MediaRef],
    ) -> PlatformResult<String>;

    /// Post one trailing comment on a previously published post
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Comment`; the orchestrator records it
    /// without downgrading the publish outcome.
    async fn comment(
        &self,
        connection: &Connection,
        access_token: &str,
        remote_id: &str,
        text: &str,
    ) -> PlatformResult<()>;
}

/// Build one adapter per supported platform. Which of them can actually
/// publish is decided at publish time by the stored connections.
pub fn create_adapters(http: &Client) -> Vec<Box<dyn Platform>> {
    vec![
        Box::new(linkedin::LinkedinPlatform::new(http.clone())),
        Box::new(twitter::TwitterPlatform::new(http.clone())),
        Box::new(instagram::InstagramPlatform::new(http.clone())),
        Box::new(threads::ThreadsPlatform::new(http.clone())),
    ]
}
