//! Data models for the notifications domain.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::NotificationError;

// ============================================================================
// Categories
// ============================================================================

/// What kind of content change triggered a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Announcement,
    Blog,
    Alert,
    Survey,
    Event,
    /// Free-form admin message; recipients are chosen by the caller.
    Broadcast,
}

impl NotificationCategory {
    /// Portal path segment for the category's public pages.
    pub fn path_segment(&self) -> &'static str {
        match self {
            NotificationCategory::Announcement => "announcements",
            NotificationCategory::Blog => "blogs",
            NotificationCategory::Alert => "alerts",
            NotificationCategory::Survey => "surveys",
            NotificationCategory::Event => "events",
            NotificationCategory::Broadcast => "broadcasts",
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::Announcement => write!(f, "announcement"),
            NotificationCategory::Blog => write!(f, "blog"),
            NotificationCategory::Alert => write!(f, "alert"),
            NotificationCategory::Survey => write!(f, "survey"),
            NotificationCategory::Event => write!(f, "event"),
            NotificationCategory::Broadcast => write!(f, "broadcast"),
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "announcement" | "announcements" => Ok(NotificationCategory::Announcement),
            "blog" | "blogs" => Ok(NotificationCategory::Blog),
            "alert" | "alerts" => Ok(NotificationCategory::Alert),
            "survey" | "surveys" => Ok(NotificationCategory::Survey),
            "event" | "events" => Ok(NotificationCategory::Event),
            "broadcast" | "broadcasts" => Ok(NotificationCategory::Broadcast),
            other => Err(NotificationError::InvalidInput(format!(
                "unknown notification category '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Recipient sources
// ============================================================================

/// Membership status of an organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    #[default]
    Pending,
    Active,
    Inactive,
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizationStatus::Pending => write!(f, "PENDING"),
            OrganizationStatus::Active => write!(f, "ACTIVE"),
            OrganizationStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// Exact match on the stored form, so parsing agrees with the SQL status filter.
impl FromStr for OrganizationStatus {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrganizationStatus::Pending),
            "ACTIVE" => Ok(OrganizationStatus::Active),
            "INACTIVE" => Ok(OrganizationStatus::Inactive),
            other => Err(NotificationError::InvalidInput(format!(
                "unknown organization status '{}'",
                other
            ))),
        }
    }
}

/// Headcount bucket, used only to narrow broadcast audiences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationSize {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for OrganizationSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizationSize::Small => write!(f, "small"),
            OrganizationSize::Medium => write!(f, "medium"),
            OrganizationSize::Large => write!(f, "large"),
        }
    }
}

impl FromStr for OrganizationSize {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(OrganizationSize::Small),
            "medium" => Ok(OrganizationSize::Medium),
            "large" => Ok(OrganizationSize::Large),
            other => Err(NotificationError::InvalidInput(format!(
                "unknown organization size '{}'",
                other
            ))),
        }
    }
}

/// A member organization from the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub primary_contact_email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size: Option<OrganizationSize>,
    #[serde(default)]
    pub status: OrganizationStatus,
    #[serde(default = "default_true")]
    pub notify_announcements: bool,
    #[serde(default = "default_true")]
    pub notify_blogs: bool,
    #[serde(default = "default_true")]
    pub notify_surveys: bool,
}

fn default_true() -> bool {
    true
}

impl Organization {
    /// Create an active organization that has opted in to everything.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: Some(email.into()),
            primary_contact_email: None,
            tags: Vec::new(),
            region: None,
            size: None,
            status: OrganizationStatus::Active,
            notify_announcements: true,
            notify_blogs: true,
            notify_surveys: true,
        }
    }

    pub fn with_primary_contact(mut self, email: impl Into<String>) -> Self {
        self.primary_contact_email = Some(email.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_size(mut self, size: OrganizationSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_status(mut self, status: OrganizationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }

    /// The address notifications go to: the primary contact when set,
    /// otherwise the organization's own email. Blank values count as unset.
    pub fn effective_address(&self) -> Option<&str> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        present(&self.primary_contact_email).or_else(|| present(&self.email))
    }
}

/// A standalone newsletter subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub subscription_types: Vec<NotificationCategory>,
}

impl Subscriber {
    pub fn new(email: impl Into<String>, subscription_types: Vec<NotificationCategory>) -> Self {
        Self {
            email: email.into(),
            is_active: true,
            subscription_types,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn is_subscribed_to(&self, category: NotificationCategory) -> bool {
        self.subscription_types.contains(&category)
    }
}

/// Optional narrowing of the organization audience.
///
/// Empty lists mean "no narrowing on that dimension".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientFilters {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl RecipientFilters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Tag filter is any-match: an organization passes when it carries at
    /// least one of the requested tags.
    pub fn matches_tags(&self, tags: &[String]) -> bool {
        self.tags.is_empty() || tags.iter().any(|t| self.tags.contains(t))
    }

    pub fn matches_region(&self, region: Option<&str>) -> bool {
        self.regions.is_empty() || region.is_some_and(|r| self.regions.iter().any(|f| f == r))
    }
}

/// Audience criteria for an admin broadcast.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastFilters {
    #[serde(flatten)]
    pub recipients: RecipientFilters,
    #[serde(default)]
    pub sizes: Vec<OrganizationSize>,
}

impl BroadcastFilters {
    pub fn matches_size(&self, size: Option<OrganizationSize>) -> bool {
        self.sizes.is_empty() || size.is_some_and(|s| self.sizes.contains(&s))
    }
}

// ============================================================================
// Resolved recipients
// ============================================================================

/// Which source an address was resolved from.
///
/// The two partitions get different call-to-action links.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecipientPartition {
    Organization,
    Subscriber,
}

impl std::fmt::Display for RecipientPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientPartition::Organization => write!(f, "organization"),
            RecipientPartition::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// Normalized, deduplicated addresses split by source.
///
/// An address is unique within a partition but may appear in both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSet {
    pub organization_addresses: BTreeSet<String>,
    pub subscriber_addresses: BTreeSet<String>,
}

impl RecipientSet {
    pub fn is_empty(&self) -> bool {
        self.organization_addresses.is_empty() && self.subscriber_addresses.is_empty()
    }

    /// Number of sends a dispatch of this set will attempt.
    pub fn len(&self) -> usize {
        self.organization_addresses.len() + self.subscriber_addresses.len()
    }
}

// ============================================================================
// Rendered content and outcomes
// ============================================================================

/// Subject and bodies shared by every recipient of one dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// A recipient whose send failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendFailure {
    pub address: String,
    pub error: String,
}

/// Per-partition (or aggregate) result of a dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub total: usize,
    pub errors: Vec<SendFailure>,
}

/// The caller-visible sum of both partitions.
pub type AggregateOutcome = DispatchOutcome;

impl DispatchOutcome {
    /// The short-circuit result: nothing resolved, nothing attempted.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Field-wise sum of counters, concatenation of errors.
    pub fn merge(mut self, other: DispatchOutcome) -> Self {
        self.sent += other.sent;
        self.total += other.total;
        self.errors.extend(other.errors);
        self
    }
}

// ============================================================================
// Content entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// Alert priority. Affects presentation only, never who receives it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    pub fn subject_prefix(&self) -> Option<&'static str> {
        match self {
            AlertPriority::Urgent => Some("[URGENT]"),
            AlertPriority::High => Some("[IMPORTANT]"),
            AlertPriority::Low | AlertPriority::Medium => None,
        }
    }

    pub fn header_color(&self) -> &'static str {
        match self {
            AlertPriority::Urgent => "#dc2626",
            AlertPriority::High => "#ea580c",
            AlertPriority::Low | AlertPriority::Medium => "#2563eb",
        }
    }
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertPriority::Low => write!(f, "LOW"),
            AlertPriority::Medium => write!(f, "MEDIUM"),
            AlertPriority::High => write!(f, "HIGH"),
            AlertPriority::Urgent => write!(f, "URGENT"),
        }
    }
}

impl FromStr for AlertPriority {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(AlertPriority::Low),
            "MEDIUM" => Ok(AlertPriority::Medium),
            "HIGH" => Ok(AlertPriority::High),
            "URGENT" => Ok(AlertPriority::Urgent),
            other => Err(NotificationError::InvalidInput(format!(
                "unknown alert priority '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: AlertPriority,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    /// Public events are also announced to newsletter subscribers.
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_published: bool,
}

/// Any entity a dispatch can be rendered from.
#[derive(Debug, Clone)]
pub enum ContentEntity {
    Announcement(Announcement),
    Blog(Blog),
    Alert(Alert),
    Survey(Survey),
    Event(Event),
}

impl ContentEntity {
    pub fn category(&self) -> NotificationCategory {
        match self {
            ContentEntity::Announcement(_) => NotificationCategory::Announcement,
            ContentEntity::Blog(_) => NotificationCategory::Blog,
            ContentEntity::Alert(_) => NotificationCategory::Alert,
            ContentEntity::Survey(_) => NotificationCategory::Survey,
            ContentEntity::Event(_) => NotificationCategory::Event,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ContentEntity::Announcement(e) => e.id,
            ContentEntity::Blog(e) => e.id,
            ContentEntity::Alert(e) => e.id,
            ContentEntity::Survey(e) => e.id,
            ContentEntity::Event(e) => e.id,
        }
    }

    pub fn is_published(&self) -> bool {
        match self {
            ContentEntity::Announcement(e) => e.is_published,
            ContentEntity::Blog(e) => e.is_published,
            ContentEntity::Alert(e) => e.is_published,
            ContentEntity::Survey(e) => e.is_published,
            ContentEntity::Event(e) => e.is_published,
        }
    }
}

// ============================================================================
// Broadcast history
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastStatus {
    Sent,
    PartiallySent,
    Failed,
}

impl BroadcastStatus {
    /// Derived from the counters: skipped addresses of a cancelled
    /// dispatch count as not sent even though they carry no error.
    pub fn from_outcome(outcome: &DispatchOutcome) -> Self {
        if outcome.sent == outcome.total {
            BroadcastStatus::Sent
        } else if outcome.sent == 0 {
            BroadcastStatus::Failed
        } else {
            BroadcastStatus::PartiallySent
        }
    }
}

/// Audit entry for an admin broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRecord {
    pub id: Uuid,
    pub subject: String,
    pub html_body: String,
    pub filters: BroadcastFilters,
    pub recipient_count: usize,
    pub sent: usize,
    pub failed: usize,
    pub status: BroadcastStatus,
    pub created_at: DateTime<Utc>,
}

impl BroadcastRecord {
    pub fn new(
        subject: String,
        html_body: String,
        filters: BroadcastFilters,
        outcome: &DispatchOutcome,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            subject,
            html_body,
            filters,
            recipient_count: outcome.total,
            sent: outcome.sent,
            failed: outcome.failed(),
            status: BroadcastStatus::from_outcome(outcome),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_address_prefers_primary_contact() {
        let org = Organization::new("Food Bank", "office@foodbank.org")
            .with_primary_contact("director@foodbank.org");
        assert_eq!(org.effective_address(), Some("director@foodbank.org"));
    }

    #[test]
    fn test_effective_address_falls_back_on_blank_primary() {
        let org = Organization::new("Food Bank", "office@foodbank.org").with_primary_contact("  ");
        assert_eq!(org.effective_address(), Some("office@foodbank.org"));

        let mut none = Organization::new("Nobody", "");
        none.primary_contact_email = None;
        assert_eq!(none.effective_address(), None);
    }

    #[test]
    fn test_merge_sums_counters_and_concatenates_errors() {
        let e1 = SendFailure { address: "a@x.org".into(), error: "boom".into() };
        let e2 = SendFailure { address: "b@x.org".into(), error: "bang".into() };
        let orgs = DispatchOutcome { sent: 10, total: 12, errors: vec![e1.clone(), e2.clone()] };
        let subs = DispatchOutcome { sent: 3, total: 3, errors: vec![] };

        let merged = orgs.merge(subs);
        assert_eq!(merged.sent, 13);
        assert_eq!(merged.total, 15);
        assert_eq!(merged.errors, vec![e1, e2]);
    }

    #[test]
    fn test_alert_priority_presentation() {
        assert_eq!(AlertPriority::Urgent.subject_prefix(), Some("[URGENT]"));
        assert_eq!(AlertPriority::High.subject_prefix(), Some("[IMPORTANT]"));
        assert_eq!(AlertPriority::Medium.subject_prefix(), None);
        assert_eq!(AlertPriority::Low.header_color(), AlertPriority::Medium.header_color());
    }

    #[test]
    fn test_category_round_trips_through_display() {
        for category in [
            NotificationCategory::Announcement,
            NotificationCategory::Blog,
            NotificationCategory::Alert,
            NotificationCategory::Survey,
            NotificationCategory::Event,
            NotificationCategory::Broadcast,
        ] {
            assert_eq!(category.to_string().parse::<NotificationCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_broadcast_status_from_outcome() {
        let ok = DispatchOutcome { sent: 2, total: 2, errors: vec![] };
        assert_eq!(BroadcastStatus::from_outcome(&ok), BroadcastStatus::Sent);

        let failure = SendFailure { address: "a@x.org".into(), error: "boom".into() };
        let partial = DispatchOutcome { sent: 1, total: 2, errors: vec![failure.clone()] };
        assert_eq!(BroadcastStatus::from_outcome(&partial), BroadcastStatus::PartiallySent);

        let none = DispatchOutcome { sent: 0, total: 1, errors: vec![failure] };
        assert_eq!(BroadcastStatus::from_outcome(&none), BroadcastStatus::Failed);

        let skipped = DispatchOutcome { sent: 1, total: 3, errors: vec![] };
        assert_eq!(BroadcastStatus::from_outcome(&skipped), BroadcastStatus::PartiallySent);

        let cancelled = DispatchOutcome { sent: 0, total: 2, errors: vec![] };
        assert_eq!(BroadcastStatus::from_outcome(&cancelled), BroadcastStatus::Failed);
    }

    #[test]
    fn test_organization_status_parses_stored_form_only() {
        assert_eq!("ACTIVE".parse::<OrganizationStatus>().unwrap(), OrganizationStatus::Active);
        assert!("active".parse::<OrganizationStatus>().is_err());
        assert_eq!(OrganizationStatus::Inactive.to_string().parse::<OrganizationStatus>().unwrap(), OrganizationStatus::Inactive);
    }

    #[test]
    fn test_filters_any_match() {
        let filters = RecipientFilters::none().with_tags(["A", "B"]);
        assert!(filters.matches_tags(&["A".to_string()]));
        assert!(!RecipientFilters::none().with_tags(["B", "C"]).matches_tags(&["A".to_string()]));
        assert!(RecipientFilters::none().matches_tags(&[]));
    }
}
