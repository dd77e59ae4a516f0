//! Recipient resolution.
//!
//! Each category maps to an [`EligibilityRule`]: which organizations qualify
//! and whether the subscriber list is consulted. The matrix lives in
//! [`EligibilityRule::for_category`] as data; the resolver itself only runs
//! the two queries and normalizes the results.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::address;
use crate::error::{NotificationError, NotificationResult};
use crate::models::{BroadcastFilters, NotificationCategory, RecipientFilters, RecipientSet};
use crate::repository::{OptIn, OrganizationQuery, RecipientDirectory, SubscriberQuery};

/// Whether a category's audience includes newsletter subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberAccess {
    Always,
    /// Only when the triggering entity is public (events).
    PublicOnly,
}

/// Visibility of the triggering entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Eligibility rule for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRule {
    /// Opt-in flag required on the organization; `None` means mandatory.
    pub organization_opt_in: Option<OptIn>,
    pub subscribers: SubscriberAccess,
}

impl EligibilityRule {
    /// The eligibility matrix. `None` for categories whose audience is
    /// supplied by the caller.
    pub const fn for_category(category: NotificationCategory) -> Option<Self> {
        let rule = match category {
            NotificationCategory::Announcement => EligibilityRule {
                organization_opt_in: Some(OptIn::Announcements),
                subscribers: SubscriberAccess::Always,
            },
            NotificationCategory::Blog => EligibilityRule {
                organization_opt_in: Some(OptIn::Blogs),
                subscribers: SubscriberAccess::Always,
            },
            NotificationCategory::Alert => EligibilityRule {
                organization_opt_in: None,
                subscribers: SubscriberAccess::Always,
            },
            NotificationCategory::Survey => EligibilityRule {
                organization_opt_in: Some(OptIn::Surveys),
                subscribers: SubscriberAccess::Always,
            },
            NotificationCategory::Event => EligibilityRule {
                organization_opt_in: None,
                subscribers: SubscriberAccess::PublicOnly,
            },
            NotificationCategory::Broadcast => return None,
        };
        Some(rule)
    }

    pub fn includes_subscribers(&self, visibility: Visibility) -> bool {
        match self.subscribers {
            SubscriberAccess::Always => true,
            SubscriberAccess::PublicOnly => visibility == Visibility::Public,
        }
    }

    fn organization_query(&self, filters: &RecipientFilters) -> OrganizationQuery {
        OrganizationQuery {
            opt_in: self.organization_opt_in,
            tags: filters.tags.clone(),
            regions: filters.regions.clone(),
            ..OrganizationQuery::active()
        }
    }
}

/// Resolves the audience of a notification from the recipient directory.
pub struct RecipientResolver {
    directory: Arc<dyn RecipientDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn RecipientDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve both partitions for a category.
    ///
    /// A store failure aborts the whole resolution. `Broadcast` is rejected:
    /// broadcast audiences come from [`RecipientResolver::broadcast_audience`]
    /// or straight from the caller.
    pub async fn resolve(
        &self,
        category: NotificationCategory,
        filters: &RecipientFilters,
        visibility: Visibility,
    ) -> NotificationResult<RecipientSet> {
        let rule = EligibilityRule::for_category(category).ok_or_else(|| {
            NotificationError::InvalidInput(format!(
                "{} recipients are supplied by the caller, not resolved",
                category
            ))
        })?;

        let query = rule.organization_query(filters);
        let organizations = self.directory.list_organizations(&query).await?;
        let organization_addresses: BTreeSet<String> = organizations
            .iter()
            .filter(|o| query.matches(o))
            .filter_map(|o| address::normalize_opt(o.effective_address()))
            .collect();

        let subscriber_addresses = if rule.includes_subscribers(visibility) {
            let query = SubscriberQuery { category };
            self.directory
                .list_subscribers(&query)
                .await?
                .iter()
                .filter(|s| query.matches(s))
                .filter_map(|s| address::normalize_opt(Some(&s.email)))
                .collect()
        } else {
            debug!(category = %category, "Subscriber source skipped");
            BTreeSet::new()
        };

        info!(
            category = %category,
            organizations = organization_addresses.len(),
            subscribers = subscriber_addresses.len(),
            "Resolved recipients"
        );

        Ok(RecipientSet {
            organization_addresses,
            subscriber_addresses,
        })
    }

    /// Active organizations matching broadcast criteria, as a sorted,
    /// deduplicated address list.
    pub async fn broadcast_audience(&self, filters: &BroadcastFilters) -> NotificationResult<Vec<String>> {
        let query = OrganizationQuery {
            tags: filters.recipients.tags.clone(),
            regions: filters.recipients.regions.clone(),
            sizes: filters.sizes.clone(),
            ..OrganizationQuery::active()
        };

        let addresses: BTreeSet<String> = self
            .directory
            .list_organizations(&query)
            .await?
            .iter()
            .filter(|o| query.matches(o))
            .filter_map(|o| address::normalize_opt(o.effective_address()))
            .collect();

        debug!(count = addresses.len(), "Resolved broadcast audience");
        Ok(addresses.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Organization, OrganizationSize, OrganizationStatus, Subscriber};
    use crate::repository::InMemoryDirectory;

    fn resolver(orgs: Vec<Organization>, subs: Vec<Subscriber>) -> RecipientResolver {
        RecipientResolver::new(Arc::new(InMemoryDirectory::with_records(orgs, subs)))
    }

    #[test]
    fn test_alerts_and_events_have_no_opt_out() {
        let alert = EligibilityRule::for_category(NotificationCategory::Alert).unwrap();
        let event = EligibilityRule::for_category(NotificationCategory::Event).unwrap();
        assert_eq!(alert.organization_opt_in, None);
        assert_eq!(event.organization_opt_in, None);
        assert!(EligibilityRule::for_category(NotificationCategory::Broadcast).is_none());
    }

    #[tokio::test]
    async fn test_case_variants_collapse_within_partition() {
        let r = resolver(
            vec![
                Organization::new("One", "Shared@Coalition.org"),
                Organization::new("Two", " shared@coalition.org "),
            ],
            vec![],
        );

        let set = r
            .resolve(NotificationCategory::Announcement, &RecipientFilters::none(), Visibility::Public)
            .await
            .unwrap();
        assert_eq!(set.organization_addresses.len(), 1);
        assert!(set.organization_addresses.contains("shared@coalition.org"));
    }

    #[tokio::test]
    async fn test_inactive_records_are_ignored() {
        let r = resolver(
            vec![Organization::new("Gone", "gone@x.org").with_status(OrganizationStatus::Inactive)],
            vec![Subscriber::new("old@x.org", vec![NotificationCategory::Alert]).inactive()],
        );

        let set = r
            .resolve(NotificationCategory::Alert, &RecipientFilters::none(), Visibility::Public)
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_private_event_skips_subscribers() {
        let r = resolver(
            vec![Organization::new("Org", "org@x.org")],
            vec![Subscriber::new("fan@x.org", vec![NotificationCategory::Event])],
        );

        let private = r
            .resolve(NotificationCategory::Event, &RecipientFilters::none(), Visibility::Private)
            .await
            .unwrap();
        assert!(private.subscriber_addresses.is_empty());
        assert_eq!(private.organization_addresses.len(), 1);

        let public = r
            .resolve(NotificationCategory::Event, &RecipientFilters::none(), Visibility::Public)
            .await
            .unwrap();
        assert!(public.subscriber_addresses.contains("fan@x.org"));
    }

    #[tokio::test]
    async fn test_region_filter_excludes_unset_region() {
        let r = resolver(
            vec![
                Organization::new("North", "n@x.org").with_region("north"),
                Organization::new("Nowhere", "z@x.org"),
            ],
            vec![],
        );

        let set = r
            .resolve(
                NotificationCategory::Survey,
                &RecipientFilters::none().with_regions(["north"]),
                Visibility::Public,
            )
            .await
            .unwrap();
        assert_eq!(set.organization_addresses.into_iter().collect::<Vec<_>>(), vec!["n@x.org"]);
    }

    #[tokio::test]
    async fn test_resolve_rejects_broadcast() {
        let r = resolver(vec![], vec![]);
        let result = r
            .resolve(NotificationCategory::Broadcast, &RecipientFilters::none(), Visibility::Public)
            .await;
        assert!(matches!(result, Err(NotificationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_broadcast_audience_narrows_by_size() {
        let r = resolver(
            vec![
                Organization::new("Big", "big@x.org").with_size(OrganizationSize::Large),
                Organization::new("Small", "small@x.org").with_size(OrganizationSize::Small),
            ],
            vec![],
        );

        let filters = BroadcastFilters {
            sizes: vec![OrganizationSize::Large],
            ..Default::default()
        };
        assert_eq!(r.broadcast_audience(&filters).await.unwrap(), vec!["big@x.org"]);
    }
}
