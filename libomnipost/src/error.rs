//! Error types for Omnipost

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OmnipostError>;

#[derive(Error, Debug)]
pub enum OmnipostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl OmnipostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OmnipostError::InvalidInput(_) => 3,
            OmnipostError::Platform(PlatformError::Auth(_)) => 2,
            OmnipostError::Platform(_) => 1,
            OmnipostError::Config(_) => 1,
            OmnipostError::Database(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Per-platform failure classes accumulated by the publish loop.
///
/// These never abort sibling platforms; the orchestrator records them as
/// platform-qualified strings on the post and moves on.
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    /// Missing connection or a required identity field. Raised before any
    /// network call is made.
    #[error("Not configured: {0}")]
    Configuration(String),

    /// Token missing, expired without a refresh path, or refresh rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The platform rejected the post or its media. The platform's own
    /// error text is preserved verbatim.
    #[error("Publishing failed: {0}")]
    Publish(String),

    /// A trailing comment failed after a successful publish. Never
    /// downgrades the publish outcome.
    #[error("Comment failed: {0}")]
    Comment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = OmnipostError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_error() {
        let platform_error = PlatformError::Auth("Refresh rejected".to_string());
        let error = OmnipostError::Platform(platform_error);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_publish_error() {
        let platform_error = PlatformError::Publish("Upstream 500".to_string());
        let error = OmnipostError::Platform(platform_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_comment_error() {
        let platform_error = PlatformError::Comment("Duplicate comment".to_string());
        let error = OmnipostError::Platform(platform_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_configuration_error() {
        let platform_error = PlatformError::Configuration("No active connection".to_string());
        let error = OmnipostError::Platform(platform_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let config_error = ConfigError::MissingField("database.path".to_string());
        let error = OmnipostError::Config(config_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_database_error() {
        let db_error = DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        let error = OmnipostError::Database(db_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_invalid_input() {
        let error = OmnipostError::InvalidInput("Content cannot be empty".to_string());
        let message = format!("{}", error);
        assert_eq!(message, "Invalid input: Content cannot be empty");
    }

    #[test]
    fn test_error_message_formatting_auth() {
        let platform_error = PlatformError::Auth("Token expired, no refresh token".to_string());
        let error = OmnipostError::Platform(platform_error);
        let message = format!("{}", error);
        assert_eq!(
            message,
            "Platform error: Authentication failed: Token expired, no refresh token"
        );
    }

    #[test]
    fn test_error_message_formatting_config() {
        let config_error = ConfigError::MissingField("platforms.twitter.client_id".to_string());
        let error = OmnipostError::Config(config_error);
        let message = format!("{}", error);
        assert_eq!(
            message,
            "Configuration error: Missing required field: platforms.twitter.client_id"
        );
    }

    #[test]
    fn test_platform_error_variants_format() {
        let configuration = PlatformError::Configuration("No active connection".to_string());
        assert_eq!(
            format!("{}", configuration),
            "Not configured: No active connection"
        );

        let auth = PlatformError::Auth("refresh rejected (401)".to_string());
        assert_eq!(
            format!("{}", auth),
            "Authentication failed: refresh rejected (401)"
        );

        let publish = PlatformError::Publish("media type unsupported".to_string());
        assert_eq!(
            format!("{}", publish),
            "Publishing failed: media type unsupported"
        );

        let comment = PlatformError::Comment("rate limited".to_string());
        assert_eq!(format!("{}", comment), "Comment failed: rate limited");
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::MissingField("test".to_string());
        let error: OmnipostError = config_error.into();

        match error {
            OmnipostError::Config(_) => {}
            _ => panic!("Expected OmnipostError::Config"),
        }
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        let error: OmnipostError = db_error.into();

        match error {
            OmnipostError::Database(_) => {}
            _ => panic!("Expected OmnipostError::Database"),
        }
    }

    #[test]
    fn test_error_conversion_from_platform_error() {
        let platform_error = PlatformError::Publish("test".to_string());
        let error: OmnipostError = platform_error.into();

        match error {
            OmnipostError::Platform(_) => {}
            _ => panic!("Expected OmnipostError::Platform"),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Comment("first comment failed".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }

    #[test]
    fn test_exit_code_consistency() {
        // Auth errors are the only platform class with a distinct exit code
        let auth1 = OmnipostError::Platform(PlatformError::Auth("a".to_string()));
        let auth2 = OmnipostError::Platform(PlatformError::Auth("b".to_string()));
        assert_eq!(auth1.exit_code(), auth2.exit_code());
        assert_eq!(auth1.exit_code(), 2);

        let publish = OmnipostError::Platform(PlatformError::Publish("test".to_string()));
        let comment = OmnipostError::Platform(PlatformError::Comment("test".to_string()));
        let configuration =
            OmnipostError::Platform(PlatformError::Configuration("test".to_string()));
        assert_eq!(publish.exit_code(), 1);
        assert_eq!(comment.exit_code(), 1);
        assert_eq!(configuration.exit_code(), 1);

        let invalid = OmnipostError::InvalidInput("test".to_string());
        assert_eq!(invalid.exit_code(), 3);
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<String> {
            Ok("success".to_string())
        }

        fn returns_err() -> Result<String> {
            Err(OmnipostError::InvalidInput("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
