//! Twitter/X platform implementation
//!
//! Posts go through the v2 tweets endpoint; trailing comments are replies
//! chained to the returned tweet id. Media uses the v1.1 upload host:
//! simple upload for images, chunked INIT/APPEND/FINALIZE with
//! processing-status polling for video.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::PlatformError;
use crate::media::{fetch_asset, mime_for, MediaRef};
use crate::platforms::{Platform, PlatformResult};
use crate::types::{Connection, MediaAsset, MediaKind, PlatformKind, Post};

const TWEETS_URL: &str = "https://api.x.com/2/tweets";
const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

// v1.1 chunked upload segment size
const CHUNK_SIZE: usize = 1024 * 1024;

pub struct TwitterPlatform {
    http: Client,
}

impl TwitterPlatform {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Create a tweet and return its id, or the platform's error text
    async fn create_tweet(
        &self,
        access_token: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<String, String> {
        let resp = self
            .http
            .post(TWEETS_URL)
            .bearer_auth(access_token)
            .json(body)
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

        let wrapper: TweetResponseWrapper = serde_json::from_str(&text)
            .map_err(|e| format!("unexpected response: {} - body: {}", e, text))?;
        Ok(wrapper.data.id)
    }

    /// Simple one-shot upload for images
    async fn upload_simple(
        &self,
        access_token: &str,
        data: Vec<u8>,
        mime: &str,
    ) -> PlatformResult<String> {
        let part = reqwest::multipart::Part::bytes(data)
            .mime_str(mime)
            .map_err(|e| PlatformError::Publish(format!("invalid mime type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("media_category", media_category(mime))
            .part("media", part);

        let resp = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("media upload failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Publish(format!("media upload failed: {}", e)))?;

        if !status.is_success() {
            return Err(PlatformError::Publish(format!(
                "media upload failed ({}): {}",
                status, text
            )));
        }

        let upload: MediaUploadResponse = serde_json::from_str(&text).map_err(|e| {
            PlatformError::Publish(format!("unexpected upload response: {} - body: {}", e, text))
        })?;
        Ok(upload.media_id_string)
    }

    /// Chunked INIT/APPEND/FINALIZE upload, required for video
    async fn upload_chunked(
        &self,
        access_token: &str,
        data: Vec<u8>,
        mime: &str,
    ) -> PlatformResult<String> {
        debug!(total_bytes = data.len(), mime, "starting chunked media upload");

        let init = [
            ("command", "INIT".to_string()),
            ("total_bytes", data.len().to_string()),
            ("media_type", mime.to_string()),
            ("media_category", media_category(mime).to_string()),
        ];

        let resp = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .bearer_auth(access_token)
            .form(&init)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("media INIT failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Publish(format!("media INIT failed: {}", e)))?;
        if !status.is_success() {
            return Err(PlatformError::Publish(format!(
                "media INIT failed ({}): {}",
                status, text
            )));
        }

        let init_response: MediaUploadResponse = serde_json::from_str(&text).map_err(|e| {
            PlatformError::Publish(format!("unexpected INIT response: {} - body: {}", e, text))
        })?;
        let media_id = init_response.media_id_string;

        for (segment_index, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            let part = reqwest::multipart::Part::bytes(chunk.to_vec())
                .mime_str(mime)
                .map_err(|e| PlatformError::Publish(format!("invalid mime type: {}", e)))?;

            let form = reqwest::multipart::Form::new()
                .text("command", "APPEND")
                .text("media_id", media_id.clone())
                .text("segment_index", segment_index.to_string())
                .part("media", part);

            let resp = self
                .http
                .post(MEDIA_UPLOAD_URL)
                .bearer_auth(access_token)
                .multipart(form)
                .send()
                .await
                .map_err(|e| {
                    PlatformError::Publish(format!(
                        "media APPEND failed at segment {}: {}",
                        segment_index, e
                    ))
                })?;

            if !resp.status().is_success() {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(PlatformError::Publish(format!(
                    "media APPEND failed at segment {} ({}): {}",
                    segment_index, status, text
                )));
            }
        }

        let finalize = [
            ("command", "FINALIZE".to_string()),
            ("media_id", media_id.clone()),
        ];

        let resp = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .bearer_auth(access_token)
            .form(&finalize)
            .send()
            .await
            .map_err(|e| PlatformError::Publish(format!("media FINALIZE failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Publish(format!("media FINALIZE failed: {}", e)))?;
        if !status.is_success() {
            return Err(PlatformError::Publish(format!(
                "media FINALIZE failed ({}): {}",
                status, text
            )));
        }

        let finalize_response: MediaUploadResponse = serde_json::from_str(&text).map_err(|e| {
            PlatformError::Publish(format!(
                "unexpected FINALIZE response: {} - body: {}",
                e, text
            ))
        })?;

        if let Some(info) = finalize_response.processing_info {
            if info.state != "succeeded" {
                self.wait_for_processing(access_token, &media_id).await?;
            }
        }

        debug!(media_id = %media_id, "chunked media upload complete");
        Ok(media_id)
    }

    /// Poll the STATUS command until the platform finishes processing
    async fn wait_for_processing(&self, access_token: &str, media_id: &str) -> PlatformResult<()> {
        loop {
            let resp = self
                .http
                .get(MEDIA_UPLOAD_URL)
                .bearer_auth(access_token)
                .query(&[("command", "STATUS"), ("media_id", media_id)])
                .send()
                .await
                .map_err(|e| PlatformError::Publish(format!("media STATUS failed: {}", e)))?;

            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|e| PlatformError::Publish(format!("media STATUS failed: {}", e)))?;
            if !status.is_success() {
                return Err(PlatformError::Publish(format!(
                    "media STATUS failed ({}): {}",
                    status, text
                )));
            }

            let status_response: MediaUploadResponse = serde_json::from_str(&text).map_err(|e| {
                PlatformError::Publish(format!(
                    "unexpected STATUS response: {} - body: {}",
                    e, text
                ))
            })?;

            match status_response.processing_info {
                Some(info) => match info.state.as_str() {
                    "succeeded" => return Ok(()),
                    "failed" => {
                        return Err(PlatformError::Publish(
                            "media processing failed".to_string(),
                        ))
                    }
                    _ => {
                        let wait_secs = info.check_after_secs.unwrap_or(5);
                        tokio::time::sleep(std::time::Duration::from_secs(wait_secs)).await;
                    }
                },
                // No processing_info means the platform is done
                None => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl Platform for TwitterPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Twitter
    }

    async fn resolve_media(
        &self,
        _connection: &Connection,
        access_token: &str,
        media: &[MediaAsset],
    ) -> PlatformResult<Vec<MediaRef>> {
        let mut refs = Vec::with_capacity(media.len());

        for asset in media {
            let bytes = fetch_asset(&self.http, asset).await?;
            let mime = mime_for(asset);

            let media_id = match asset.kind {
                MediaKind::Image => self.upload_simple(access_token, bytes, mime).await?,
                MediaKind::Video => self.upload_chunked(access_token, bytes, mime).await?,
            };
            refs.push(MediaRef::new(asset.kind, media_id));
        }

        Ok(refs)
    }

    async fn publish(
        &self,
        _connection: &Connection,
        access_token: &str,
        post: &Post,
        media: &[MediaRef],
    ) -> PlatformResult<String> {
        let media_ids: Vec<String> = media.iter().map(|m| m.reference.clone()).collect();
        let body = build_tweet_body(&post.content, None, &media_ids);

        self.create_tweet(access_token, &body)
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
        let body = build_tweet_body(text, Some(remote_id), &[]);

        self.create_tweet(access_token, &body)
            .await
            .map(|_| ())
            .map_err(PlatformError::Comment)
    }
}

/// Tweet payload shared by publish and comment; a comment is a reply
/// chained to the parent tweet id
fn build_tweet_body(
    text: &str,
    in_reply_to: Option<&str>,
    media_ids: &[String],
) -> serde_json::Value {
    let mut body = serde_json::json!({ "text": text });

    if let Some(parent_id) = in_reply_to {
        body["reply"] = serde_json::json!({ "in_reply_to_tweet_id": parent_id });
    }

    if !media_ids.is_empty() {
        body["media"] = serde_json::json!({ "media_ids": media_ids });
    }

    body
}

fn media_category(mime: &str) -> &'static str {
    if mime.starts_with("video/") {
        "tweet_video"
    } else if mime == "image/gif" {
        "tweet_gif"
    } else {
        "tweet_image"
    }
}

#[derive(Debug, Deserialize)]
struct TweetResponseWrapper {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
    processing_info: Option<MediaProcessingInfo>,
}

#[derive(Debug, Deserialize)]
struct MediaProcessingInfo {
    state: String,
    check_after_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let platform = TwitterPlatform::new(Client::new());
        assert_eq!(platform.kind(), PlatformKind::Twitter);
    }

    #[test]
    fn test_build_tweet_body_text_only() {
        let body = build_tweet_body("Hello world", None, &[]);
        assert_eq!(body["text"], "Hello world");
        assert!(body.get("reply").is_none());
        assert!(body.get("media").is_none());
    }

    #[test]
    fn test_build_tweet_body_reply() {
        let body = build_tweet_body("A comment", Some("12345"), &[]);
        assert_eq!(body["reply"]["in_reply_to_tweet_id"], "12345");
    }

    #[test]
    fn test_build_tweet_body_with_media() {
        let body = build_tweet_body("With pics", None, &["m1".to_string(), "m2".to_string()]);
        assert_eq!(body["media"]["media_ids"][0], "m1");
        assert_eq!(body["media"]["media_ids"][1], "m2");
    }

    #[test]
    fn test_media_category() {
        assert_eq!(media_category("image/png"), "tweet_image");
        assert_eq!(media_category("image/jpeg"), "tweet_image");
        assert_eq!(media_category("image/gif"), "tweet_gif");
        assert_eq!(media_category("video/mp4"), "tweet_video");
    }

    #[test]
    fn test_media_upload_response_parses_processing_info() {
        let json = r#"{
            "media_id": 710511363345354753,
            "media_id_string": "710511363345354753",
            "processing_info": {"state": "pending", "check_after_secs": 5}
        }"#;

        let parsed: MediaUploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.media_id_string, "710511363345354753");
        let info = parsed.processing_info.unwrap();
        assert_eq!(info.state, "pending");
        assert_eq!(info.check_after_secs, Some(5));
    }
}
