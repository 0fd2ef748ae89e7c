//! Service layer for Omnipost
//!
//! A thin facade over the library so every binary talks to the same API
//! instead of wiring databases, adapters, and token handling themselves.
//!
//! `OmnipostService` owns the shared resources and hands out the three
//! sub-services:
//!
//! - `PostService`: create posts and publish them across platforms
//! - `QueueService`: inspect and manage the scheduled queue
//! - `ConnectionService`: store and ingest platform credentials
//!
//! # Example
//!
//! ```no_run
//! use libomnipost::service::{NewPostRequest, OmnipostService};
//! use libomnipost::types::PlatformKind;
//!
//! # async fn example() -> libomnipost::Result<()> {
//! let service = OmnipostService::new().await?;
//!
//! let post = service
//!     .posts()
//!     .create(NewPostRequest {
//!         content: "Hello from omnipost!".to_string(),
//!         platforms: vec![PlatformKind::Twitter, PlatformKind::Linkedin],
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let report = service.posts().publish_now(&post.id).await?;
//! println!("{}: {} succeeded", report.post_id, report.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod connections;
pub mod posts;
pub mod queue;

pub use connections::{ConnectRequest, ConnectionService};
pub use posts::{NewPostRequest, PostService};
pub use queue::QueueService;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;

/// Main service facade holding the shared database handle and the
/// sub-services built on it.
pub struct OmnipostService {
    db: Database,
    posts: PostService,
    queue: QueueService,
    connections: ConnectionService,
}

impl OmnipostService {
    /// Create a service from the default configuration location.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot be loaded or the
    /// database cannot be opened and migrated.
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service from an existing configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened and migrated.
    pub async fn from_config(config: Config) -> Result<Self> {
        let db = Database::new(&config.database.path).await?;
        Ok(Self::with_database(config, db))
    }

    /// Wire a service onto an already-open database. Used by tests and
    /// anywhere the database lifecycle is managed externally.
    pub fn with_database(config: Config, db: Database) -> Self {
        let config = Arc::new(config);
        let posts = PostService::new(db.clone(), Arc::clone(&config));
        let queue = QueueService::new(db.clone());
        let connections = ConnectionService::new(db.clone());

        Self {
            db,
            posts,
            queue,
            connections,
        }
    }

    /// Direct database access for callers that need raw queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    pub fn connections(&self) -> &ConnectionService {
        &self.connections
    }
}
