//! Shared media handling for platform adapters

use reqwest::Client;

use crate::error::PlatformError;
use crate::types::{MediaAsset, MediaKind};

/// A platform-ready media reference produced by an adapter's resolve step.
/// The reference is whatever that platform's publish call expects: an upload
/// id, an asset URN, or the declared URL for container-based platforms.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub reference: String,
}

impl MediaRef {
    pub fn new(kind: MediaKind, reference: String) -> Self {
        Self { kind, reference }
    }
}

/// Download the bytes behind a declared asset. Used by adapters that upload
/// media themselves (LinkedIn, Twitter); container platforms skip this and
/// hand the URL straight to the platform.
pub async fn fetch_asset(http: &Client, asset: &MediaAsset) -> Result<Vec<u8>, PlatformError> {
    let resp = http.get(&asset.url).send().await.map_err(|e| {
        PlatformError::Publish(format!("media fetch failed for {}: {}", asset.filename, e))
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PlatformError::Publish(format!(
            "media fetch failed for {} ({})",
            asset.filename, status
        )));
    }

    let bytes = resp.bytes().await.map_err(|e| {
        PlatformError::Publish(format!("media fetch failed for {}: {}", asset.filename, e))
    })?;

    Ok(bytes.to_vec())
}

/// Best-effort MIME type from the declared kind and filename extension.
/// Videos always go out as mp4; platforms reject quicktime.
pub fn mime_for(asset: &MediaAsset) -> &'static str {
    match asset.kind {
        MediaKind::Image => {
            let extension = asset
                .filename
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .to_lowercase();
            match extension.as_str() {
                "png" => "image/png",
                "gif" => "image/gif",
                "webp" => "image/webp",
                _ => "image/jpeg",
            }
        }
        MediaKind::Video => "video/mp4",
    }
}
