//! Sea-ORM entities for the portal tables the engine reads.
//!
//! Enumerations are stored as text and list fields as JSONB; conversion to
//! domain models happens in the `TryFrom` impls below.

use tracing::warn;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::models;

/// Malformed JSONB reads as an empty list.
fn json_list<T: serde::de::DeserializeOwned>(value: sea_orm::prelude::Json, id: Uuid, column: &str) -> Vec<T> {
    serde_json::from_value(value)
        .inspect_err(|e| warn!(row_id = %id, column, error = %e, "Ignoring malformed JSON list"))
        .unwrap_or_default()
}

pub mod organization {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "organizations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        pub email: Option<String>,
        pub primary_contact_email: Option<String>,
        pub tags: Json,
        pub region: Option<String>,
        pub size: Option<String>,
        pub status: String,
        pub notify_announcements: bool,
        pub notify_blogs: bool,
        pub notify_surveys: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod subscriber {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "subscribers")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub email: String,
        pub is_active: bool,
        /// JSON array of category names, e.g. `["blog", "event"]`.
        pub subscription_types: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod announcement {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "announcements")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub content: String,
        pub author: Option<String>,
        pub attachment_url: Option<String>,
        pub is_published: bool,
        pub published_at: Option<DateTimeWithTimeZone>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod blog {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "blogs")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub content: String,
        pub excerpt: Option<String>,
        pub author: Option<String>,
        pub is_published: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod alert {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "alerts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub message: String,
        pub priority: String,
        pub is_published: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod survey {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "surveys")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        pub due_date: Option<Date>,
        pub is_published: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod event {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "events")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        pub starts_at: DateTimeWithTimeZone,
        pub ends_at: Option<DateTimeWithTimeZone>,
        pub location: Option<String>,
        pub meeting_url: Option<String>,
        pub is_public: bool,
        pub is_published: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TryFrom<organization::Model> for models::Organization {
    type Error = NotificationError;

    fn try_from(model: organization::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            primary_contact_email: model.primary_contact_email,
            tags: json_list(model.tags, model.id, "tags"),
            region: model.region,
            size: model.size.as_deref().map(str::parse::<models::OrganizationSize>).transpose()?,
            status: model.status.parse::<models::OrganizationStatus>()?,
            notify_announcements: model.notify_announcements,
            notify_blogs: model.notify_blogs,
            notify_surveys: model.notify_surveys,
        })
    }
}

impl From<subscriber::Model> for models::Subscriber {
    fn from(model: subscriber::Model) -> Self {
        // Unknown category names are dropped rather than failing the row.
        let names: Vec<String> = json_list(model.subscription_types, model.id, "subscription_types");
        Self {
            email: model.email,
            is_active: model.is_active,
            subscription_types: names.iter().filter_map(|n| n.parse().ok()).collect(),
        }
    }
}

impl From<announcement::Model> for models::Announcement {
    fn from(model: announcement::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            author: model.author,
            attachment_url: model.attachment_url,
            is_published: model.is_published,
            published_at: model.published_at.map(Into::into),
        }
    }
}

impl From<blog::Model> for models::Blog {
    fn from(model: blog::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            excerpt: model.excerpt,
            author: model.author,
            is_published: model.is_published,
        }
    }
}

impl TryFrom<alert::Model> for models::Alert {
    type Error = NotificationError;

    /// An unknown priority cannot be presented, so it is a render failure.
    fn try_from(model: alert::Model) -> Result<Self, Self::Error> {
        let priority = model.priority.parse::<models::AlertPriority>().map_err(|_| {
            NotificationError::Render(format!("alert {} has unknown priority '{}'", model.id, model.priority))
        })?;
        Ok(Self {
            id: model.id,
            title: model.title,
            message: model.message,
            priority,
            is_published: model.is_published,
        })
    }
}

impl From<survey::Model> for models::Survey {
    fn from(model: survey::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            due_date: model.due_date,
            is_published: model.is_published,
        }
    }
}

impl From<event::Model> for models::Event {
    fn from(model: event::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            starts_at: model.starts_at.into(),
            ends_at: model.ends_at.map(Into::into),
            location: model.location,
            meeting_url: model.meeting_url,
            is_public: model.is_public,
            is_published: model.is_published,
        }
    }
}
