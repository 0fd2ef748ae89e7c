//! Stored platform connection management
//!
//! Connections arrive from outside: tokens minted by a companion OAuth
//! flow are handed over either one at a time (`set`) or as a JSON export
//! (`import`). This service owns validation and persistence of those
//! credentials; it never runs an OAuth dance itself.

use serde::Deserialize;
use tracing::info;

use crate::db::Database;
use crate::error::{OmnipostError, Result};
use crate::identity::ConnectionIdentity;
use crate::types::{Connection, PlatformKind};

/// A single credential hand-off for one platform.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub platform: PlatformKind,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub identity: ConnectionIdentity,
}

#[derive(Clone)]
pub struct ConnectionService {
    db: Database,
}

/// One entry of a JSON connection export. The identity may arrive either
/// as the legacy packed string or as separate fields.
#[derive(Debug, Deserialize)]
struct ImportEntry {
    platform: PlatformKind,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    parent_account_id: Option<String>,
}

impl ImportEntry {
    fn identity(&self) -> Result<ConnectionIdentity> {
        if let Some(packed) = self.identity.as_deref() {
            return ConnectionIdentity::from_packed(packed);
        }

        Ok(ConnectionIdentity::new(
            self.username.clone().unwrap_or_default(),
            self.account_id.clone(),
            self.parent_account_id.clone(),
        ))
    }
}

impl ConnectionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store or replace the connection for a platform.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the access token is empty.
    pub async fn set(&self, request: ConnectRequest) -> Result<Connection> {
        if request.access_token.trim().is_empty() {
            return Err(OmnipostError::InvalidInput(
                "Access token cannot be empty".to_string(),
            ));
        }

        let mut connection = Connection::new(request.platform, request.access_token);
        connection.refresh_token = request.refresh_token;
        connection.expires_at = request.expires_at;
        connection.identity = request.identity;

        self.db.upsert_connection(&connection).await?;
        info!("Stored connection for {}", connection.platform);
        Ok(connection)
    }

    /// All stored connections, including deactivated ones.
    pub async fn list(&self) -> Result<Vec<Connection>> {
        self.db.list_connections().await
    }

    /// Deactivate a platform's connection. The row is kept so a later
    /// reconnect can restore it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the platform has no active connection.
    pub async fn remove(&self, platform: PlatformKind) -> Result<()> {
        if self.db.deactivate_connection(platform).await? {
            info!("Deactivated connection for {}", platform);
            Ok(())
        } else {
            Err(OmnipostError::InvalidInput(format!(
                "No active connection for {}",
                platform
            )))
        }
    }

    /// Ingest a JSON export of connections, one entry per platform.
    /// Returns the platforms that were imported, in file order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the document does not parse or an
    /// entry fails validation. Entries before the failing one are
    /// already stored.
    pub async fn import(&self, json: &str) -> Result<Vec<PlatformKind>> {
        let entries: Vec<ImportEntry> = serde_json::from_str(json).map_err(|e| {
            OmnipostError::InvalidInput(format!("Invalid connection export: {}", e))
        })?;

        let mut imported = Vec::with_capacity(entries.len());
        for entry in entries {
            let identity = entry.identity()?;
            self.set(ConnectRequest {
                platform: entry.platform,
                access_token: entry.access_token,
                refresh_token: entry.refresh_token,
                expires_at: entry.expires_at,
                identity,
            })
            .await?;
            imported.push(entry.platform);
        }

        info!("Imported {} connection(s)", imported.len());
        Ok(imported)
    }
}
