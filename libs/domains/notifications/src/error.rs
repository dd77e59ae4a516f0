//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
///
/// Only [`NotificationError::Resolution`] and [`NotificationError::Render`]
/// ever escape a dispatch entry point. Provider failures are caught per
/// recipient and folded into the dispatch outcome.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// A recipient or content store query failed.
    #[error("Recipient resolution failed: {0}")]
    Resolution(String),

    /// An entity could not be turned into an email.
    #[error("Template rendering error: {0}")]
    Render(String),

    /// Email provider error.
    #[error("Email provider error: {0}")]
    Provider(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller asked for something the engine does not do.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<sea_orm::DbErr> for NotificationError {
    fn from(err: sea_orm::DbErr) -> Self {
        NotificationError::Resolution(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        NotificationError::Render(format!("invalid template: {}", err))
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Provider(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}
