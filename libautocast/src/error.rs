//! Error types for Autocast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AutocastError>;

#[derive(Error, Debug)]
pub enum AutocastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl AutocastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AutocastError::InvalidInput(_) => 3,
            AutocastError::Platform(PlatformError::Authentication(_)) => 2,
            AutocastError::Platform(_) => 1,
            AutocastError::Generation(_) => 1,
            AutocastError::Config(_) => 1,
            AutocastError::Database(_) => 1,
            AutocastError::Scheduler(_) => 1,
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

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("AI provider request failed: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("AI provider returned an empty response")]
    EmptyResponse,

    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = AutocastError::InvalidInput("Empty platform set".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = AutocastError::Platform(PlatformError::Authentication(
            "Missing token".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let posting = AutocastError::Platform(PlatformError::Posting("timeout".to_string()));
        assert_eq!(posting.exit_code(), 1);

        let generation = AutocastError::Generation(GenerationError::EmptyResponse);
        assert_eq!(generation.exit_code(), 1);

        let config = AutocastError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(config.exit_code(), 1);

        let scheduler = AutocastError::Scheduler("already running".to_string());
        assert_eq!(scheduler.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = AutocastError::InvalidInput("Topic title cannot be empty".to_string());
        assert_eq!(error.to_string(), "Invalid input: Topic title cannot be empty");

        let error = AutocastError::Platform(PlatformError::RateLimit("Too many requests".to_string()));
        assert_eq!(
            error.to_string(),
            "Platform error: Rate limit exceeded: Too many requests"
        );

        let error = AutocastError::Generation(GenerationError::Provider("HTTP 502".to_string()));
        assert_eq!(
            error.to_string(),
            "Generation error: AI provider request failed: HTTP 502"
        );
    }

    #[test]
    fn test_invalid_value_formatting() {
        let error = ConfigError::InvalidValue {
            field: "scheduler.posts_per_day".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for scheduler.posts_per_day: must be at least 1"
        );
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::InvalidData("unknown status 'queued'".to_string());
        let error: AutocastError = db_error.into();
        assert!(matches!(error, AutocastError::Database(_)));
    }

    #[test]
    fn test_error_conversion_from_generation_error() {
        let error: AutocastError = GenerationError::Network("connection refused".to_string()).into();
        match error {
            AutocastError::Generation(GenerationError::Network(msg)) => {
                assert_eq!(msg, "connection refused");
            }
            other => panic!("Expected generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(original.to_string(), cloned.to_string());
    }
}
