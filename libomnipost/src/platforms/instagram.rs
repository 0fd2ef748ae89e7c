//! Instagram platform implementation
//!
//! Publishing goes through the Facebook graph: create a media container
//! on the business account, then publish it with `media_publish`. The
//! stored access token is the page token captured when the account was
//! connected. Instagram has no text-only posts, so publishing without
//! media fails up front. Media is referenced by public URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::PlatformError;
use crate::media::MediaRef;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{Connection, MediaAsset, MediaKind, PlatformKind, Post};

const GRAPH_BASE: &str = "https://graph.facebook.com/v19.0";

pub struct InstagramPlatform {
    http: Client,
}

impl InstagramPlatform {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// POST a graph call and return the id field of the response
    async fn graph_post(
        &self,
        url: &str,
        access_token: &str,
        params: &[(String, String)],
    ) -> std::result::Result<String, String> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(format!("{}: {}", status, text));
        }

        let created: GraphId = serde_json::from_str(&text)
            .map_err(|e| format!("unexpected response: {} - body: {}", e, text))?;
        Ok(created.id)
    }
}

#[async_trait]
impl Platform for InstagramPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Instagram
    }

    async fn resolve_media(
        &self,
        _connection: &Connection,
        _access_token: &str,
        media: &[MediaAsset],
    ) -> PlatformResult<Vec<MediaRef>> {
        media
            .iter()
            .map(|asset| {
                if asset.url.trim().is_empty() {
                    return Err(PlatformError::Publish(format!(
                        "media URL missing for {}",
                        asset.filename
                    )));
                }
                Ok(MediaRef::new(asset.kind, asset.url.clone()))
            })
            .collect()
    }

    async fn publish(
        &self,
        connection: &Connection,
        access_token: &str,
        post: &Post,
        media: &[MediaRef],
    ) -> PlatformResult<String> {
        let account = business_account_id(connection)?;

        if media.len() > 1 {
            warn!(
                count = media.len(),
                "instagram containers carry a single attachment, using the first"
            );
        }

        let params = build_container_params(&post.content, media.first())?;
        let container_url = format!("{}/{}/media", GRAPH_BASE, account);
        let container_id = self
            .graph_post(&container_url, access_token, &params)
            .await
            .map_err(PlatformError::Publish)?;

        let publish_url = format!("{}/{}/media_publish", GRAPH_BASE, account);
        let publish_params = vec![("creation_id".to_string(), container_id)];
        self.graph_post(&publish_url, access_token, &publish_params)
            .await
            .map_err(PlatformError::Publish)
    }

    async fn comment(
        &self,
        _connection: &Connection,
        access_token: &str,
        remote_id: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let url = format!("{}/{}/comments", GRAPH_BASE, remote_id);
        let params = vec![("message".to_string(), text.to_string())];

        self.graph_post(&url, access_token, &params)
            .await
            .map(|_| ())
            .map_err(PlatformError::Comment)
    }
}

/// Instagram calls are keyed by the business account id captured at
/// connect time; the page id itself is only used during token exchange
fn business_account_id(connection: &Connection) -> PlatformResult<&str> {
    connection
        .identity
        .account_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            PlatformError::Configuration(
                "Instagram connection has no business account id".to_string(),
            )
        })
}

fn build_container_params(
    caption: &str,
    media: Option<&MediaRef>,
) -> PlatformResult<Vec<(String, String)>> {
    let media = media.ok_or_else(|| {
        PlatformError::Publish("Instagram requires at least one media attachment".to_string())
    })?;

    let mut params = Vec::new();
    match media.kind {
        MediaKind::Image => {
            params.push(("image_url".to_string(), media.reference.clone()));
        }
        MediaKind::Video => {
            params.push(("media_type".to_string(), "VIDEO".to_string()));
            params.push(("video_url".to_string(), media.reference.clone()));
        }
    }

    if !caption.is_empty() {
        params.push(("caption".to_string(), caption.to_string()));
    }

    Ok(params)
}

#[derive(Debug, Deserialize)]
struct GraphId {
    id: String,
}
