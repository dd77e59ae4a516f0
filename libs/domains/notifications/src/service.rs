//! Entry points invoked when content is published or an admin broadcasts.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::address;
use crate::config::NotifierConfig;
use crate::dispatch::{cancelled, DispatchEngine};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    AggregateOutcome, BroadcastFilters, BroadcastRecord, ContentEntity, DispatchOutcome,
    NotificationCategory, NotificationContent, RecipientFilters, RecipientSet,
};
use crate::providers::EmailProvider;
use crate::repository::{BroadcastLog, ContentRepository, RecipientDirectory};
use crate::resolver::{RecipientResolver, Visibility};
use crate::templates::TemplateRenderer;

/// Resolves, renders and dispatches notifications for published content.
pub struct NotificationService {
    content: Arc<dyn ContentRepository>,
    resolver: RecipientResolver,
    renderer: TemplateRenderer,
    engine: DispatchEngine,
    broadcast_log: Option<Arc<dyn BroadcastLog>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        content: Arc<dyn ContentRepository>,
        provider: Arc<dyn EmailProvider>,
        config: &NotifierConfig,
    ) -> NotificationResult<Self> {
        Ok(Self {
            content,
            resolver: RecipientResolver::new(directory),
            renderer: TemplateRenderer::new(config.render_settings())?,
            engine: DispatchEngine::new(provider, config),
            broadcast_log: None,
            shutdown: None,
        })
    }

    /// Record every broadcast in `log`.
    pub fn with_broadcast_log(mut self, log: Arc<dyn BroadcastLog>) -> Self {
        self.broadcast_log = Some(log);
        self
    }

    /// Stop resolving and sending once `shutdown` turns `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn notify_announcement_published(&self, id: Uuid) -> NotificationResult<AggregateOutcome> {
        self.notify_published(NotificationCategory::Announcement, id, &RecipientFilters::none())
            .await
    }

    pub async fn notify_blog_published(&self, id: Uuid) -> NotificationResult<AggregateOutcome> {
        self.notify_published(NotificationCategory::Blog, id, &RecipientFilters::none())
            .await
    }

    /// Alerts reach every active organization regardless of opt-in flags.
    pub async fn notify_alert_published(&self, id: Uuid) -> NotificationResult<AggregateOutcome> {
        self.notify_published(NotificationCategory::Alert, id, &RecipientFilters::none())
            .await
    }

    /// Survey invitations can be narrowed by organization tags and regions.
    pub async fn notify_survey_published(
        &self,
        id: Uuid,
        filters: RecipientFilters,
    ) -> NotificationResult<AggregateOutcome> {
        self.notify_published(NotificationCategory::Survey, id, &filters).await
    }

    /// Subscribers only hear about public events.
    pub async fn notify_event_published(&self, id: Uuid) -> NotificationResult<AggregateOutcome> {
        self.notify_published(NotificationCategory::Event, id, &RecipientFilters::none())
            .await
    }

    /// Send admin-authored content to an explicit address list.
    ///
    /// Addresses are normalized and deduplicated and receive organization
    /// personalization. `filters` only documents how the list was chosen and
    /// is stored with the broadcast record.
    pub async fn send_broadcast(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[String],
        filters: BroadcastFilters,
    ) -> NotificationResult<AggregateOutcome> {
        if subject.trim().is_empty() {
            return Err(NotificationError::InvalidInput(
                "Broadcast subject must not be empty".to_string(),
            ));
        }

        let organization_addresses: BTreeSet<String> = recipients
            .iter()
            .filter_map(|a| address::normalize_opt(Some(a)))
            .collect();
        if organization_addresses.is_empty() {
            info!("Broadcast has no recipients");
            return Ok(DispatchOutcome::empty());
        }

        let recipients = RecipientSet {
            organization_addresses,
            subscriber_addresses: BTreeSet::new(),
        };
        let content = NotificationContent {
            subject: subject.trim().to_string(),
            html_body: html_body.to_string(),
            text_body: String::new(),
        };

        let outcome = self
            .engine
            .dispatch_with(&content, &recipients, self.shutdown.clone())
            .await;

        if let Some(log) = &self.broadcast_log {
            let record = BroadcastRecord::new(content.subject, content.html_body, filters, &outcome);
            if let Err(e) = log.record(record).await {
                warn!(error = %e, "Failed to record broadcast");
            }
        }

        Ok(outcome)
    }

    /// The flat address list [`NotificationService::send_broadcast`] would
    /// be handed for these filters.
    pub async fn preview_broadcast_recipients(&self, filters: &BroadcastFilters) -> NotificationResult<Vec<String>> {
        self.resolver.broadcast_audience(filters).await
    }

    async fn notify_published(
        &self,
        category: NotificationCategory,
        id: Uuid,
        filters: &RecipientFilters,
    ) -> NotificationResult<AggregateOutcome> {
        let entity = match self.content.find(category, id).await? {
            Some(entity) if entity.is_published() => entity,
            Some(_) => {
                info!(category = %category, id = %id, "Skipping unpublished content");
                return Ok(DispatchOutcome::empty());
            }
            None => {
                info!(category = %category, id = %id, "Content not found");
                return Ok(DispatchOutcome::empty());
            }
        };

        let visibility = match &entity {
            ContentEntity::Event(event) if !event.is_public => Visibility::Private,
            _ => Visibility::Public,
        };

        let Some(recipients) = self.resolve(category, filters, visibility).await? else {
            info!(category = %category, id = %id, "Cancelled during resolution");
            return Ok(DispatchOutcome::empty());
        };
        if recipients.is_empty() {
            info!(category = %category, id = %id, "No eligible recipients");
            return Ok(DispatchOutcome::empty());
        }

        let content = self.renderer.render(&entity)?;
        debug!(category = %category, id = %id, subject = %content.subject, "Rendered notification");

        Ok(self
            .engine
            .dispatch_with(&content, &recipients, self.shutdown.clone())
            .await)
    }

    /// `None` when the shutdown flag fired first.
    async fn resolve(
        &self,
        category: NotificationCategory,
        filters: &RecipientFilters,
        visibility: Visibility,
    ) -> NotificationResult<Option<RecipientSet>> {
        let resolution = self.resolver.resolve(category, filters, visibility);
        match self.shutdown.clone() {
            Some(shutdown) => tokio::select! {
                biased;
                _ = cancelled(Some(shutdown)) => Ok(None),
                set = resolution => set.map(Some),
            },
            None => resolution.await.map(Some),
        }
    }
}
