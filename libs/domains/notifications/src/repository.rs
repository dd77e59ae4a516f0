//! Read-side store interfaces consumed by the engine, with in-memory
//! implementations for development and tests.
//!
//! The engine never writes to the recipient or content stores. The only
//! write is the optional broadcast history entry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::models::{
    Alert, Announcement, Blog, BroadcastRecord, ContentEntity, Event, NotificationCategory,
    Organization, OrganizationSize, OrganizationStatus, Subscriber, Survey,
};

// ============================================================================
// Queries
// ============================================================================

/// Per-category opt-in flag on an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptIn {
    Announcements,
    Blogs,
    Surveys,
}

impl OptIn {
    pub fn is_set(&self, org: &Organization) -> bool {
        match self {
            OptIn::Announcements => org.notify_announcements,
            OptIn::Blogs => org.notify_blogs,
            OptIn::Surveys => org.notify_surveys,
        }
    }
}

/// Organization selection pushed down to the directory.
///
/// Adapters may filter as much or as little as they can natively; the
/// resolver re-applies [`OrganizationQuery::matches`] to every row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationQuery {
    pub status: OrganizationStatus,
    pub opt_in: Option<OptIn>,
    pub tags: Vec<String>,
    pub regions: Vec<String>,
    pub sizes: Vec<OrganizationSize>,
}

impl OrganizationQuery {
    /// All active organizations, no narrowing.
    pub fn active() -> Self {
        Self {
            status: OrganizationStatus::Active,
            opt_in: None,
            tags: Vec::new(),
            regions: Vec::new(),
            sizes: Vec::new(),
        }
    }

    pub fn matches(&self, org: &Organization) -> bool {
        org.status == self.status
            && self.opt_in.is_none_or(|flag| flag.is_set(org))
            && (self.tags.is_empty() || org.tags.iter().any(|t| self.tags.contains(t)))
            && (self.regions.is_empty()
                || org
                    .region
                    .as_deref()
                    .is_some_and(|r| self.regions.iter().any(|f| f == r)))
            && (self.sizes.is_empty() || org.size.is_some_and(|s| self.sizes.contains(&s)))
    }
}

/// Active subscribers of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberQuery {
    pub category: NotificationCategory,
}

impl SubscriberQuery {
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        subscriber.is_active && subscriber.is_subscribed_to(self.category)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// The two recipient sources.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn list_organizations(&self, query: &OrganizationQuery) -> NotificationResult<Vec<Organization>>;

    async fn list_subscribers(&self, query: &SubscriberQuery) -> NotificationResult<Vec<Subscriber>>;
}

/// Content entities that trigger notifications.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch an entity by category and id. `Broadcast` has no entity and
    /// always yields `None`.
    async fn find(&self, category: NotificationCategory, id: Uuid) -> NotificationResult<Option<ContentEntity>>;
}

/// Sink for broadcast audit entries.
#[async_trait]
pub trait BroadcastLog: Send + Sync {
    async fn record(&self, record: BroadcastRecord) -> NotificationResult<()>;
}

// ============================================================================
// Fixtures
// ============================================================================

/// A JSON snapshot of the stores, used by the CLI and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreFixture {
    pub organizations: Vec<Organization>,
    pub subscribers: Vec<Subscriber>,
    pub announcements: Vec<Announcement>,
    pub blogs: Vec<Blog>,
    pub alerts: Vec<Alert>,
    pub surveys: Vec<Survey>,
    pub events: Vec<Event>,
}

impl StoreFixture {
    pub fn from_json(json: &str) -> NotificationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Split into the directory and content repository it describes.
    pub fn into_stores(self) -> (InMemoryDirectory, InMemoryContentRepository) {
        let directory = InMemoryDirectory::with_records(self.organizations, self.subscribers);

        let entities = self
            .announcements
            .into_iter()
            .map(ContentEntity::Announcement)
            .chain(self.blogs.into_iter().map(ContentEntity::Blog))
            .chain(self.alerts.into_iter().map(ContentEntity::Alert))
            .chain(self.surveys.into_iter().map(ContentEntity::Survey))
            .chain(self.events.into_iter().map(ContentEntity::Event));

        (directory, InMemoryContentRepository::with_entities(entities))
    }
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory recipient directory (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    organizations: Arc<RwLock<Vec<Organization>>>,
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(organizations: Vec<Organization>, subscribers: Vec<Subscriber>) -> Self {
        Self {
            organizations: Arc::new(RwLock::new(organizations)),
            subscribers: Arc::new(RwLock::new(subscribers)),
        }
    }

    pub async fn add_organization(&self, org: Organization) {
        self.organizations.write().await.push(org);
    }

    pub async fn add_subscriber(&self, subscriber: Subscriber) {
        self.subscribers.write().await.push(subscriber);
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn list_organizations(&self, query: &OrganizationQuery) -> NotificationResult<Vec<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations.iter().filter(|o| query.matches(o)).cloned().collect())
    }

    async fn list_subscribers(&self, query: &SubscriberQuery) -> NotificationResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.iter().filter(|s| query.matches(s)).cloned().collect())
    }
}

/// In-memory content repository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryContentRepository {
    entities: Arc<RwLock<HashMap<(NotificationCategory, Uuid), ContentEntity>>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: impl IntoIterator<Item = ContentEntity>) -> Self {
        let map = entities
            .into_iter()
            .map(|e| ((e.category(), e.id()), e))
            .collect();
        Self {
            entities: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn insert(&self, entity: ContentEntity) {
        self.entities
            .write()
            .await
            .insert((entity.category(), entity.id()), entity);
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find(&self, category: NotificationCategory, id: Uuid) -> NotificationResult<Option<ContentEntity>> {
        let entities = self.entities.read().await;
        Ok(entities.get(&(category, id)).cloned())
    }
}

/// In-memory broadcast history (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryBroadcastLog {
    records: Arc<RwLock<Vec<BroadcastRecord>>>,
}

impl InMemoryBroadcastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<BroadcastRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl BroadcastLog for InMemoryBroadcastLog {
    async fn record(&self, record: BroadcastRecord) -> NotificationResult<()> {
        tracing::info!(broadcast_id = %record.id, status = ?record.status, "Recorded broadcast");
        self.records.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_filters_by_query() {
        let mut opted_out = Organization::new("Quiet", "quiet@x.org");
        opted_out.notify_blogs = false;
        let directory = InMemoryDirectory::with_records(
            vec![Organization::new("Loud", "loud@x.org"), opted_out],
            vec![],
        );

        let query = OrganizationQuery {
            opt_in: Some(OptIn::Blogs),
            ..OrganizationQuery::active()
        };
        let orgs = directory.list_organizations(&query).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name, "Loud");
    }

    #[tokio::test]
    async fn test_content_lookup_is_keyed_by_category() {
        let blog = Blog {
            id: Uuid::new_v4(),
            title: "Spring update".into(),
            content: "<p>Hello</p>".into(),
            excerpt: None,
            author: None,
            is_published: true,
        };
        let repo = InMemoryContentRepository::with_entities([ContentEntity::Blog(blog.clone())]);

        assert!(repo.find(NotificationCategory::Blog, blog.id).await.unwrap().is_some());
        assert!(repo.find(NotificationCategory::Announcement, blog.id).await.unwrap().is_none());
    }

    #[test]
    fn test_fixture_parses_camel_case_json() {
        let json = r#"{
            "organizations": [{
                "id": "6f1c1f7e-2b1e-4c55-9a55-8a2d7f1f0b11",
                "name": "Harbor Clinic",
                "email": "info@harbor.org",
                "primaryContactEmail": "lead@harbor.org",
                "tags": ["health"],
                "region": "north",
                "status": "ACTIVE",
                "notifyBlogs": false
            }],
            "subscribers": [{ "email": "fan@mail.com", "subscriptionTypes": ["blog"] }]
        }"#;

        let fixture = StoreFixture::from_json(json).unwrap();
        let org = &fixture.organizations[0];
        assert!(org.is_active());
        assert!(!org.notify_blogs);
        assert!(org.notify_announcements);
        assert!(fixture.subscribers[0].is_active);
        assert!(fixture.subscribers[0].is_subscribed_to(NotificationCategory::Blog));
    }
}
