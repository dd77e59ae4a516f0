//! Builds a [`NotificationService`] from CLI flags and config.

use std::path::Path;
use std::sync::Arc;

use domain_notifications::providers::{SendGridProvider, SmtpProvider};
use domain_notifications::{
    ContentRepository, EmailProvider, MockProvider, NotificationService, PgContentRepository,
    PgRecipientDirectory, RecipientDirectory, StoreFixture,
};
use eyre::{eyre, Result, WrapErr};
use tracing::info;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    Smtp,
    Sendgrid,
}

pub type Stores = (Arc<dyn RecipientDirectory>, Arc<dyn ContentRepository>);

/// In-memory stores from a JSON fixture, or Postgres via `DATABASE_URL`.
pub async fn stores(fixture: Option<&Path>, config: &Config) -> Result<Stores> {
    if let Some(path) = fixture {
        let json = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Failed to read fixture {}", path.display()))?;
        let (directory, content) = StoreFixture::from_json(&json)?.into_stores();
        info!(fixture = %path.display(), "Using fixture stores");
        return Ok((Arc::new(directory), Arc::new(content)));
    }

    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| eyre!("Either --fixture or DATABASE_URL is required"))?;

    info!("Connecting to database...");
    let db = sea_orm::Database::connect(url)
        .await
        .map_err(|e| eyre!("Database connection failed: {}", e))?;

    Ok((
        Arc::new(PgRecipientDirectory::new(db.clone())),
        Arc::new(PgContentRepository::new(db)),
    ))
}

/// The transport to send through. `dry_run` wins over `kind`.
pub fn provider(kind: ProviderKind, dry_run: bool, config: &Config) -> Result<Arc<dyn EmailProvider>> {
    if dry_run {
        info!("Dry run: emails are recorded, not sent");
        return Ok(Arc::new(MockProvider::failing_for(config.dry_run_failing.clone())));
    }

    Ok(match kind {
        ProviderKind::Smtp => Arc::new(SmtpProvider::from_env()?),
        ProviderKind::Sendgrid => Arc::new(SendGridProvider::from_env()?),
    })
}

pub fn service(stores: Stores, provider: Arc<dyn EmailProvider>, config: &Config) -> Result<NotificationService> {
    let (directory, content) = stores;
    Ok(NotificationService::new(directory, content, provider, &config.notifier)?)
}
