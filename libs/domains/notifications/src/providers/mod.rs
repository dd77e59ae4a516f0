//! Email provider implementations.
//!
//! This module contains the `EmailProvider` trait, the single-message send
//! primitive the dispatch engine fans out over, and its implementations.

mod mock;
mod sendgrid;
mod smtp;

pub use mock::MockProvider;
pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::NotificationResult;
use async_trait::async_trait;

/// Represents a sent email with provider-specific message ID.
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
}

/// One fully personalized message for one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient email address.
    pub to: String,
    /// Email subject.
    pub subject: String,
    /// HTML body content.
    pub html_body: String,
    /// Plain text body content. May be empty for broadcasts.
    pub text_body: String,
    /// Sender email address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Reply-To email address.
    pub reply_to: Option<String>,
}

/// Trait for email sending providers.
///
/// Implementations must be safe to call concurrently; the dispatch engine
/// issues sends from a bounded pool without extra locking.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one email to one recipient.
    async fn send(&self, email: &OutgoingEmail) -> NotificationResult<SentEmail>;

    /// Get the provider name for logging.
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy/configured.
    async fn health_check(&self) -> NotificationResult<bool>;
}
