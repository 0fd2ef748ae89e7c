//! Configuration management for Omnipost

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::types::PlatformKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Tuning knobs for the publish loop. Defaults are safe for every
/// platform; override per deployment in the `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Bounded timeout applied to each outbound network call.
    pub call_timeout_secs: u64,
    /// Fixed pause between trailing comments on one platform.
    pub comment_delay_secs: u64,
    /// Tokens expiring within this margin are refreshed before use.
    pub refresh_margin_secs: i64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            comment_delay_secs: 2,
            refresh_margin_secs: 120,
        }
    }
}

/// OAuth application credentials per platform, needed for token refresh
/// exchanges. A missing section disables refresh for that platform (stored
/// tokens are still used as-is).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformsConfig {
    pub linkedin: Option<OAuthAppConfig>,
    pub twitter: Option<OAuthAppConfig>,
    pub instagram: Option<OAuthAppConfig>,
    pub threads: Option<OAuthAppConfig>,
}

impl PlatformsConfig {
    pub fn for_kind(&self, kind: PlatformKind) -> Option<&OAuthAppConfig> {
        match kind {
            PlatformKind::Linkedin => self.linkedin.as_ref(),
            PlatformKind::Twitter => self.twitter.as_ref(),
            PlatformKind::Instagram => self.instagram.as_ref(),
            PlatformKind::Threads => self.threads.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Fallbacks applied when the CLI does not override them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub platforms: Vec<PlatformKind>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/omnipost/posts.db".to_string(),
            },
            publish: PublishConfig::default(),
            platforms: PlatformsConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("OMNIPOST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("omnipost").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("omnipost"))
}
