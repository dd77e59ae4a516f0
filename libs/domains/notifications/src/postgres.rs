//! Read-only Postgres adapters over the portal schema.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::warn;
use uuid::Uuid;

use crate::entity::{alert, announcement, blog, event, organization, subscriber, survey};
use crate::error::NotificationResult;
use crate::models::{ContentEntity, NotificationCategory, Organization, Subscriber};
use crate::repository::{
    ContentRepository, OptIn, OrganizationQuery, RecipientDirectory, SubscriberQuery,
};

/// Organizations and subscribers from Postgres.
///
/// Status, opt-in, region and size are filtered in SQL. Tag and
/// subscription-type matching on the JSONB columns is left to the
/// resolver, which re-applies the full query to every row.
pub struct PgRecipientDirectory {
    db: DatabaseConnection,
}

impl PgRecipientDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn list_organizations(&self, query: &OrganizationQuery) -> NotificationResult<Vec<Organization>> {
        let mut select = organization::Entity::find()
            .filter(organization::Column::Status.eq(query.status.to_string()));

        if let Some(opt_in) = query.opt_in {
            let column = match opt_in {
                OptIn::Announcements => organization::Column::NotifyAnnouncements,
                OptIn::Blogs => organization::Column::NotifyBlogs,
                OptIn::Surveys => organization::Column::NotifySurveys,
            };
            select = select.filter(column.eq(true));
        }

        if !query.regions.is_empty() {
            select = select.filter(organization::Column::Region.is_in(query.regions.clone()));
        }

        if !query.sizes.is_empty() {
            let sizes: Vec<String> = query.sizes.iter().map(|s| s.to_string()).collect();
            select = select.filter(organization::Column::Size.is_in(sizes));
        }

        let rows = select
            .order_by_asc(organization::Column::Name)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                Organization::try_from(row)
                    .inspect_err(|e| warn!(organization_id = %id, error = %e, "Skipping malformed organization row"))
                    .ok()
            })
            .collect())
    }

    async fn list_subscribers(&self, _query: &SubscriberQuery) -> NotificationResult<Vec<Subscriber>> {
        let rows = subscriber::Entity::find()
            .filter(subscriber::Column::IsActive.eq(true))
            .order_by_asc(subscriber::Column::Email)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Subscriber::from).collect())
    }
}

/// Content entities from Postgres, one table per category.
pub struct PgContentRepository {
    db: DatabaseConnection,
}

impl PgContentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find(&self, category: NotificationCategory, id: Uuid) -> NotificationResult<Option<ContentEntity>> {
        let entity = match category {
            NotificationCategory::Announcement => announcement::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(|m| ContentEntity::Announcement(m.into())),
            NotificationCategory::Blog => blog::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(|m| ContentEntity::Blog(m.into())),
            NotificationCategory::Alert => match alert::Entity::find_by_id(id).one(&self.db).await? {
                Some(m) => Some(ContentEntity::Alert(m.try_into()?)),
                None => None,
            },
            NotificationCategory::Survey => survey::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(|m| ContentEntity::Survey(m.into())),
            NotificationCategory::Event => event::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(|m| ContentEntity::Event(m.into())),
            NotificationCategory::Broadcast => None,
        };

        Ok(entity)
    }
}
