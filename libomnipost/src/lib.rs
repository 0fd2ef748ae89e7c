//! Omnipost - write once, publish everywhere
//!
//! This library provides the core functionality for composing a post a
//! single time and publishing it to LinkedIn, Twitter/X, Instagram, and
//! Threads through stored platform connections.

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod platforms;
pub mod scheduling;
pub mod service;
pub mod tokens;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{OmnipostError, Result};
pub use identity::ConnectionIdentity;
pub use orchestrator::MultiPlatformPublisher;
pub use types::{Connection, PlatformKind, Post, PostStatus, PublishReport};
