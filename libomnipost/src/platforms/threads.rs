//! Threads platform implementation
//!
//! Threads uses a two-step flow: create a media container, then publish
//! it. Comments are reply containers pointed at the published thread via
//! `reply_to_id` and then published the same way. Media is referenced by
//! public URL, so there is no upload step here.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::PlatformError;
use crate::media::MediaRef;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{Connection, MediaAsset, MediaKind, PlatformKind, Post};

const THREADS_BASE: &str = "https://graph.threads.net/v1.0";

pub struct ThreadsPlatform {
    http: Client,
}

impl ThreadsPlatform {
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

    /// Create a container and publish it, returning the final thread id
    async fn create_and_publish(
        &self,
        account: &str,
        access_token: &str,
        params: Vec<(String, String)>,
    ) -> std::result::Result<String, String> {
        let container_url = format!("{}/{}/threads", THREADS_BASE, account);
        let container_id = self.graph_post(&container_url, access_token, &params).await?;

        let publish_url = format!("{}/{}/threads_publish", THREADS_BASE, account);
        let publish_params = vec![("creation_id".to_string(), container_id)];
        self.graph_post(&publish_url, access_token, &publish_params)
            .await
    }
}

#[async_trait]
impl Platform for ThreadsPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Threads
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
        let account = account_id(connection)?;

        if media.len() > 1 {
            warn!(
                count = media.len(),
                "threads containers carry a single attachment, using the first"
            );
        }

        let params = build_container_params(Some(&post.content), media.first(), None);
        self.create_and_publish(account, access_token, params)
            .await
            .map_err(PlatformError::Publish)
    }

    async fn comment(
        &self,
        connection: &Connection,
        access_token: &str,
        remote_id: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let account = account_id(connection).map_err(|e| PlatformError::Comment(e.to_string()))?;

        let params = build_container_params(Some(text), None, Some(remote_id));
        self.create_and_publish(account, access_token, params)
            .await
            .map(|_| ())
            .map_err(PlatformError::Comment)
    }
}

/// Threads calls are keyed by the user id captured at connect time
fn account_id(connection: &Connection) -> PlatformResult<&str> {
    connection
        .identity
        .account_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            PlatformError::Configuration("Threads connection has no account id".to_string())
        })
}

fn build_container_params(
    text: Option<&str>,
    media: Option<&MediaRef>,
    reply_to: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = Vec::new();

    match media {
        None => params.push(("media_type".to_string(), "TEXT".to_string())),
        Some(m) if m.kind == MediaKind::Video => {
            params.push(("media_type".to_string(), "VIDEO".to_string()));
            params.push(("video_url".to_string(), m.reference.clone()));
        }
        Some(m) => {
            params.push(("media_type".to_string(), "IMAGE".to_string()));
            params.push(("image_url".to_string(), m.reference.clone()));
        }
    }

    if let Some(text) = text.filter(|t| !t.is_empty()) {
        params.push(("text".to_string(), text.to_string()));
    }

    if let Some(parent) = reply_to {
        params.push(("reply_to_id".to_string(), parent.to_string()));
    }

    params
}

#[derive(Debug, Deserialize)]
struct GraphId {
    id: String,
}
