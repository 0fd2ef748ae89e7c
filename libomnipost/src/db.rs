//! Database operations for Omnipost

use sqlx::sqlite::{SqlitePool, SqliteRow};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::identity::ConnectionIdentity;
use crate::types::{Connection, PlatformKind, Post, PostStatus};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::DbError::IoError)?;
        }

        // Use forward slashes for the SQLite URL (works on both Windows and Unix)
        // and mode=rwc so the database file is created if it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(crate::error::DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Create a new post
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        let media = serde_json::to_string(&post.media)
            .map_err(crate::error::DbError::SerializationError)?;
        let platforms = serde_json::to_string(&post.platforms)
            .map_err(crate::error::DbError::SerializationError)?;
        let comments = serde_json::to_string(&post.comments)
            .map_err(crate::error::DbError::SerializationError)?;
        let mentions = serde_json::to_string(&post.mentions)
            .map_err(crate::error::DbError::SerializationError)?;
        let published_at = serde_json::to_string(&post.published_at)
            .map_err(crate::error::DbError::SerializationError)?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, content, media, platforms, comments, mentions,
                               created_at, scheduled_at, status, published_at, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.content)
        .bind(media)
        .bind(platforms)
        .bind(comments)
        .bind(mentions)
        .bind(post.created_at)
        .bind(post.scheduled_at)
        .bind(post.status.as_str())
        .bind(published_at)
        .bind(&post.error_message)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(
            r#"
            SELECT id, content, media, platforms, comments, mentions,
                   created_at, scheduled_at, status, published_at, error_message
            FROM posts WHERE id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        row.map(|r| post_from_row(&r)).transpose()
    }

    /// Scheduled posts whose schedule time has passed, oldest first
    pub async fn get_due_posts(&self, now: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, media, platforms, comments, mentions,
                   created_at, scheduled_at, status, published_at, error_message
            FROM posts
            WHERE status = 'scheduled' AND scheduled_at IS NOT NULL AND scheduled_at <= ?
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// All scheduled posts, soonest first
    pub async fn get_scheduled_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, media, platforms, comments, mentions,
                   created_at, scheduled_at, status, published_at, error_message
            FROM posts
            WHERE status = 'scheduled'
            ORDER BY scheduled_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Posts in a given status, newest first
    pub async fn get_posts_by_status(&self, status: PostStatus, limit: usize) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, media, platforms, comments, mentions,
                   created_at, scheduled_at, status, published_at, error_message
            FROM posts
            WHERE status = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(status.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Revert a scheduled post to draft and clear its schedule time.
    /// Returns false when the post doesn't exist or isn't scheduled.
    pub async fn cancel_scheduled_post(&self, post_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts SET status = 'draft', scheduled_at = NULL
            WHERE id = ? AND status = 'scheduled'
            "#,
        )
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist the outcome of a publish attempt in one statement
    pub async fn update_publish_state(
        &self,
        post_id: &str,
        status: PostStatus,
        published_at: &BTreeMap<PlatformKind, i64>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let published_at = serde_json::to_string(published_at)
            .map_err(crate::error::DbError::SerializationError)?;

        sqlx::query(
            r#"
            UPDATE posts SET status = ?, published_at = ?, error_message = ? WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(published_at)
        .bind(error_message)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Insert or replace the connection for a platform. A missing refresh
    /// token on the incoming record keeps the stored one.
    pub async fn upsert_connection(&self, connection: &Connection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO connections (platform, access_token, refresh_token, expires_at,
                                     active, username, account_id, parent_account_id, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(platform) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, connections.refresh_token),
                expires_at = excluded.expires_at,
                active = excluded.active,
                username = excluded.username,
                account_id = excluded.account_id,
                parent_account_id = excluded.parent_account_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(connection.platform.as_str())
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.expires_at)
        .bind(if connection.active { 1 } else { 0 })
        .bind(&connection.identity.username)
        .bind(&connection.identity.account_id)
        .bind(&connection.identity.parent_account_id)
        .bind(connection.updated_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Get the active connection for a platform, if any
    pub async fn get_active_connection(
        &self,
        platform: PlatformKind,
    ) -> Result<Option<Connection>> {
        let row = sqlx::query(
            r#"
            SELECT platform, access_token, refresh_token, expires_at,
                   active, username, account_id, parent_account_id, updated_at
            FROM connections
            WHERE platform = ? AND active = 1
            "#,
        )
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        row.map(|r| connection_from_row(&r)).transpose()
    }

    /// Write a refreshed token set in one statement. A refresh response
    /// without a new refresh token keeps the stored one.
    pub async fn update_tokens(
        &self,
        platform: PlatformKind,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE connections
            SET access_token = ?,
                refresh_token = COALESCE(?, refresh_token),
                expires_at = ?,
                updated_at = ?
            WHERE platform = ?
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(chrono::Utc::now().timestamp())
        .bind(platform.as_str())
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Mark a connection inactive without deleting its row.
    /// Returns false when no connection exists for the platform.
    pub async fn deactivate_connection(&self, platform: PlatformKind) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE connections SET active = 0, updated_at = ? WHERE platform = ?
            "#,
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(platform.as_str())
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// All connections, active or not
    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        let rows = sqlx::query(
            r#"
            SELECT platform, access_token, refresh_token, expires_at,
                   active, username, account_id, parent_account_id, updated_at
            FROM connections
            ORDER BY platform ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        rows.iter().map(connection_from_row).collect()
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    use sqlx::Row;

    let media: String = row.try_get("media").map_err(crate::error::DbError::SqlxError)?;
    let platforms: String = row
        .try_get("platforms")
        .map_err(crate::error::DbError::SqlxError)?;
    let comments: String = row
        .try_get("comments")
        .map_err(crate::error::DbError::SqlxError)?;
    let mentions: String = row
        .try_get("mentions")
        .map_err(crate::error::DbError::SqlxError)?;
    let published_at: String = row
        .try_get("published_at")
        .map_err(crate::error::DbError::SqlxError)?;
    let status: String = row
        .try_get("status")
        .map_err(crate::error::DbError::SqlxError)?;

    Ok(Post {
        id: row.try_get("id").map_err(crate::error::DbError::SqlxError)?,
        content: row
            .try_get("content")
            .map_err(crate::error::DbError::SqlxError)?,
        media: serde_json::from_str(&media).map_err(crate::error::DbError::SerializationError)?,
        platforms: serde_json::from_str(&platforms)
            .map_err(crate::error::DbError::SerializationError)?,
        comments: serde_json::from_str(&comments)
            .map_err(crate::error::DbError::SerializationError)?,
        mentions: serde_json::from_str(&mentions)
            .map_err(crate::error::DbError::SerializationError)?,
        created_at: row
            .try_get("created_at")
            .map_err(crate::error::DbError::SqlxError)?,
        scheduled_at: row
            .try_get("scheduled_at")
            .map_err(crate::error::DbError::SqlxError)?,
        status: match status.as_str() {
            "scheduled" => PostStatus::Scheduled,
            "published" => PostStatus::Published,
            "failed" => PostStatus::Failed,
            _ => PostStatus::Draft,
        },
        published_at: serde_json::from_str(&published_at)
            .map_err(crate::error::DbError::SerializationError)?,
        error_message: row
            .try_get("error_message")
            .map_err(crate::error::DbError::SqlxError)?,
    })
}

fn connection_from_row(row: &SqliteRow) -> Result<Connection> {
    use sqlx::Row;

    let platform: String = row
        .try_get("platform")
        .map_err(crate::error::DbError::SqlxError)?;

    Ok(Connection {
        platform: platform.parse::<PlatformKind>()?,
        access_token: row
            .try_get("access_token")
            .map_err(crate::error::DbError::SqlxError)?,
        refresh_token: row
            .try_get("refresh_token")
            .map_err(crate::error::DbError::SqlxError)?,
        expires_at: row
            .try_get("expires_at")
            .map_err(crate::error::DbError::SqlxError)?,
        active: row
            .try_get::<i32, _>("active")
            .map_err(crate::error::DbError::SqlxError)?
            != 0,
        identity: ConnectionIdentity {
            username: row
                .try_get("username")
                .map_err(crate::error::DbError::SqlxError)?,
            account_id: row
                .try_get("account_id")
                .map_err(crate::error::DbError::SqlxError)?,
            parent_account_id: row
                .try_get("parent_account_id")
                .map_err(crate::error::DbError::SqlxError)?,
        },
        updated_at: row
            .try_get("updated_at")
            .map_err(crate::error::DbError::SqlxError)?,
    })
}
