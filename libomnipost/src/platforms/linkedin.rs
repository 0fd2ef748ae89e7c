//! LinkedIn platform implementation
//!
//! Shares are created through the v2 ugcPosts endpoint. Images are
//! registered with the assets API, the raw bytes are PUT to the returned
//! upload URL, and the asset URN is attached to the share. Mentions are
//! rendered as literal `@First Last` text appended to the share body.
//! Comments go through the socialActions API keyed by the share URN.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::PlatformError;
use crate::media::{fetch_asset, mime_for, MediaRef};
use crate::platforms::{Platform, PlatformResult};
use crate::types::{Connection, MediaAsset, MediaKind, PlatformKind, Post};

const UGC_POSTS_URL: &str = "https://api.linkedin.com/v2/ugcPosts";
const REGISTER_UPLOAD_URL: &str = "https://api.linkedin.com/v2/assets?action=registerUpload";
const SOCIAL_ACTIONS_URL: &str = "https://api.linkedin.com/v2/socialActions";

const RESTLI_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_VERSION: &str = "2.0.0";

pub struct LinkedinPlatform {
    http: Client,
}

impl LinkedinPlatform {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Register an upload slot and return the asset URN plus upload URL
    async fn register_upload(
        &self,
        access_token: &str,
        author: &str,
        kind: MediaKind,
    ) -> PlatformResult<(String, String)> {
        let body = build_register_upload_body(author, kind);

        let resp = self
            .http
            .post(REGISTER_UPLOAD_URL)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("media registration failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Publish(format!("media registration failed: {}", e)))?;

        if !status.is_success() {
            return Err(PlatformError::Publish(format!(
                "media registration failed ({}): {}",
                status, text
            )));
        }

        let registered: RegisterUploadResponse = serde_json::from_str(&text).map_err(|e| {
            PlatformError::Publish(format!(
                "unexpected registration response: {} - body: {}",
                e, text
            ))
        })?;

        let upload_url = extract_upload_url(&registered.value.upload_mechanism)
            .ok_or_else(|| {
                PlatformError::Publish(format!("registration response has no upload URL: {}", text))
            })?
            .to_string();

        Ok((registered.value.asset, upload_url))
    }

    /// PUT the raw bytes to the upload URL handed out by registration
    async fn upload_bytes(
        &self,
        access_token: &str,
        upload_url: &str,
        data: Vec<u8>,
        mime: &str,
    ) -> PlatformResult<()> {
        let resp = self
            .http
            .put(upload_url)
            .bearer_auth(access_token)
            .header("Content-Type", mime)
            .body(data)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("media upload failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!(
                "media upload failed ({}): {}",
                status, text
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Platform for LinkedinPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Linkedin
    }

    async fn resolve_media(
        &self,
        connection: &Connection,
        access_token: &str,
        media: &[MediaAsset],
    ) -> PlatformResult<Vec<MediaRef>> {
        let author = author_urn(connection)?;
        let mut refs = Vec::with_capacity(media.len());

        for asset in media {
            let bytes = fetch_asset(&self.http, asset).await?;
            let (asset_urn, upload_url) = self
                .register_upload(access_token, &author, asset.kind)
                .await?;
            self.upload_bytes(access_token, &upload_url, bytes, mime_for(asset))
                .await?;

            debug!(asset = %asset_urn, "registered media asset");
            refs.push(MediaRef::new(asset.kind, asset_urn));
        }

        Ok(refs)
    }

    async fn publish(
        &self,
        connection: &Connection,
        access_token: &str,
        post: &Post,
        media: &[MediaRef],
    ) -> PlatformResult<String> {
        let author = author_urn(connection)?;
        let text = render_share_text(post);
        let body = build_share_body(&author, &text, media);

        let resp = self
            .http
            .post(UGC_POSTS_URL)
            .bearer_auth(access_token)
            .header(RESTLI_HEADER, RESTLI_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("request failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Publish(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PlatformError::Publish(format!("{}: {}", status, text)));
        }

        let created: ShareResponse = serde_json::from_str(&text).map_err(|e| {
            PlatformError::Publish(format!("unexpected response: {} - body: {}", e, text))
        })?;

        Ok(normalize_share_urn(&created.id))
    }

    async fn comment(
        &self,
        connection: &Connection,
        access_token: &str,
        remote_id: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let author = author_urn(connection).map_err(configuration_as_comment)?;
        let url = format!("{}/{}/comments", SOCIAL_ACTIONS_URL, encode_urn(remote_id));
        let body = serde_json::json!({
            "actor": author,
            "message": { "text": text },
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header(RESTLI_HEADER, RESTLI_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::Comment(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Comment(format!("{}: {}", status, text)));
        }

        Ok(())
    }
}

/// The member URN used as share author and comment actor
fn author_urn(connection: &Connection) -> PlatformResult<String> {
    let account_id = connection
        .identity
        .account_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            PlatformError::Configuration("LinkedIn connection has no member id".to_string())
        })?;
    Ok(format!("urn:li:person:{}", account_id))
}

fn configuration_as_comment(err: PlatformError) -> PlatformError {
    PlatformError::Comment(err.to_string())
}

/// Share text with mentions appended as literal `@First Last` tokens
fn render_share_text(post: &Post) -> String {
    if post.mentions.is_empty() {
        return post.content.clone();
    }

    let tags: Vec<String> = post
        .mentions
        .iter()
        .map(|m| format!("@{}", m.display_name()))
        .collect();
    format!("{}\n\n{}", post.content, tags.join(" "))
}

fn build_register_upload_body(author: &str, kind: MediaKind) -> serde_json::Value {
    let recipe = match kind {
        MediaKind::Image => "urn:li:digitalmediaRecipe:feedshare-image",
        MediaKind::Video => "urn:li:digitalmediaRecipe:feedshare-video",
    };

    serde_json::json!({
        "registerUploadRequest": {
            "recipes": [recipe],
            "owner": author,
            "serviceRelationships": [{
                "relationshipType": "OWNER",
                "identifier": "urn:li:userGeneratedContent",
            }],
        },
    })
}

fn build_share_body(author: &str, text: &str, media: &[MediaRef]) -> serde_json::Value {
    let category = match media.first().map(|m| m.kind) {
        None => "NONE",
        Some(MediaKind::Image) => "IMAGE",
        Some(MediaKind::Video) => "VIDEO",
    };

    let mut share_content = serde_json::json!({
        "shareCommentary": { "text": text },
        "shareMediaCategory": category,
    });

    if !media.is_empty() {
        let attached: Vec<serde_json::Value> = media
            .iter()
            .map(|m| serde_json::json!({ "status": "READY", "media": m.reference }))
            .collect();
        share_content["media"] = serde_json::Value::Array(attached);
    }

    serde_json::json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": { "com.linkedin.ugc.ShareContent": share_content },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
    })
}

/// Upload URL lives under a dotted vendor key inside uploadMechanism
fn extract_upload_url(mechanism: &serde_json::Value) -> Option<&str> {
    mechanism
        .get("com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")?
        .get("uploadUrl")?
        .as_str()
}

/// Bare ids come back from some responses; comments need the full URN
fn normalize_share_urn(id: &str) -> String {
    if id.starts_with("urn:") {
        id.to_string()
    } else {
        format!("urn:li:ugcPost:{}", id)
    }
}

/// URNs appear in path segments, so the colons must be percent-encoded
fn encode_urn(urn: &str) -> String {
    urn.replace(':', "%3A")
}

#[derive(Debug, Deserialize)]
struct RegisterUploadResponse {
    value: RegisterUploadValue,
}

#[derive(Debug, Deserialize)]
struct RegisterUploadValue {
    asset: String,
    #[serde(rename = "uploadMechanism")]
    upload_mechanism: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ShareResponse {
    id: String,
}
