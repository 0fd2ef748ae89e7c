//! Access token refresh for stored platform connections

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{OAuthAppConfig, PlatformsConfig};
use crate::db::Database;
use crate::error::{PlatformError, Result};
use crate::types::{Connection, PlatformKind};

const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const TWITTER_TOKEN_URL: &str = "https://api.x.com/2/oauth2/token";
const THREADS_REFRESH_URL: &str = "https://graph.threads.net/refresh_access_token";
const INSTAGRAM_EXCHANGE_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";

/// Supplies a valid access token for a connection, refreshing it first
/// when the stored one is expired or inside the safety margin.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn ensure_valid_token(&self, connection: &Connection) -> Result<String>;
}

pub struct TokenService {
    db: Database,
    http: Client,
    platforms: PlatformsConfig,
    refresh_margin_secs: i64,
}

impl TokenService {
    pub fn new(
        db: Database,
        http: Client,
        platforms: PlatformsConfig,
        refresh_margin_secs: i64,
    ) -> Self {
        Self {
            db,
            http,
            platforms,
            refresh_margin_secs,
        }
    }

    async fn refresh(
        &self,
        connection: &Connection,
    ) -> std::result::Result<TokenResponse, PlatformError> {
        match connection.platform {
            PlatformKind::Linkedin => {
                let app = self.oauth_app(PlatformKind::Linkedin)?;
                let refresh_token = required_refresh_token(connection)?;
                let params = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", app.client_id.as_str()),
                    ("client_secret", app.client_secret.as_str()),
                ];
                self.token_request(self.http.post(LINKEDIN_TOKEN_URL).form(&params))
                    .await
            }
            PlatformKind::Twitter => {
                let app = self.oauth_app(PlatformKind::Twitter)?;
                let refresh_token = required_refresh_token(connection)?;
                let params = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ];
                self.token_request(
                    self.http
                        .post(TWITTER_TOKEN_URL)
                        .basic_auth(&app.client_id, Some(&app.client_secret))
                        .form(&params),
                )
                .await
            }
            // Threads rolls the long-lived token over itself, no client
            // credentials involved
            PlatformKind::Threads => {
                self.token_request(self.http.get(THREADS_REFRESH_URL).query(&[
                    ("grant_type", "th_refresh_token"),
                    ("access_token", connection.access_token.as_str()),
                ]))
                .await
            }
            PlatformKind::Instagram => {
                let app = self.oauth_app(PlatformKind::Instagram)?;
                self.token_request(self.http.get(INSTAGRAM_EXCHANGE_URL).query(&[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", app.client_id.as_str()),
                    ("client_secret", app.client_secret.as_str()),
                    ("fb_exchange_token", connection.access_token.as_str()),
                ]))
                .await
            }
        }
    }

    async fn token_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<TokenResponse, PlatformError> {
        let resp = request
            .send()
            .await
            .map_err(|e| PlatformError::Auth(format!("token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Auth(format!(
                "refresh rejected ({}): {}",
                status, text
            )));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| PlatformError::Auth(format!("invalid token response: {}", e)))
    }

    fn oauth_app(
        &self,
        platform: PlatformKind,
    ) -> std::result::Result<&OAuthAppConfig, PlatformError> {
        self.platforms.for_kind(platform).ok_or_else(|| {
            PlatformError::Auth(format!(
                "Token expired and no OAuth client credentials configured for {}",
                platform
            ))
        })
    }
}

#[async_trait]
impl TokenProvider for TokenService {
    async fn ensure_valid_token(&self, connection: &Connection) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        if !connection.needs_refresh(now, self.refresh_margin_secs) {
            return Ok(connection.access_token.clone());
        }

        debug!(platform = %connection.platform, "access token expired or expiring, refreshing");

        let refreshed = self.refresh(connection).await?;
        let expires_at = refreshed.expires_in.map(|secs| now + secs);

        self.db
            .update_tokens(
                connection.platform,
                &refreshed.access_token,
                refreshed.refresh_token.as_deref(),
                expires_at,
            )
            .await?;

        info!(platform = %connection.platform, "access token refreshed");
        Ok(refreshed.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn required_refresh_token(
    connection: &Connection,
) -> std::result::Result<&str, PlatformError> {
    connection
        .refresh_token
        .as_deref()
        .ok_or_else(|| PlatformError::Auth("Token expired and no refresh token stored".to_string()))
}
