//! Notifications Domain
//!
//! Turns a content change (announcement, blog post, alert, survey, event)
//! or an admin broadcast into personalized emails for the right audience.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ NotificationService  │  ← notify_*_published / send_broadcast
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │  RecipientResolver   │  ← organizations + subscribers, per-category rules
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │  TemplateRenderer    │  ← one rendering per dispatch, link tokens embedded
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │   DispatchEngine     │  ← Personalizer per recipient, bounded fan-out
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │   Email Provider     │  ← SendGrid, SMTP, mock
//! └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{NotificationService, NotifierConfig, providers::SmtpProvider};
//!
//! let service = NotificationService::new(directory, content, Arc::new(SmtpProvider::from_env()?), &config)?;
//! let outcome = service.notify_blog_published(blog_id).await?;
//! println!("sent {} of {}", outcome.sent, outcome.total);
//! ```

pub mod address;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod models;
pub mod personalizer;
pub mod postgres;
pub mod providers;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod templates;

// Re-export commonly used types
pub use config::NotifierConfig;
pub use dispatch::DispatchEngine;
pub use error::{NotificationError, NotificationResult};
pub use models::{
    AggregateOutcome, BroadcastFilters, BroadcastRecord, BroadcastStatus, ContentEntity,
    DispatchOutcome, NotificationCategory, NotificationContent, Organization, OrganizationSize,
    OrganizationStatus, RecipientFilters, RecipientPartition, RecipientSet, SendFailure, Subscriber,
};
pub use personalizer::Personalizer;
pub use postgres::{PgContentRepository, PgRecipientDirectory};
pub use providers::{EmailProvider, MockProvider, OutgoingEmail, SendGridProvider, SmtpProvider};
pub use repository::{
    BroadcastLog, ContentRepository, InMemoryBroadcastLog, InMemoryContentRepository,
    InMemoryDirectory, RecipientDirectory, StoreFixture,
};
pub use resolver::{RecipientResolver, Visibility};
pub use service::NotificationService;
pub use templates::{LinkToken, TemplateRenderer};
