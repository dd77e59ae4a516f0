//! Fan-out of one rendered notification to a resolved recipient set.
//!
//! Every address is attempted at most once. A failed send is recorded and
//! the batch carries on; nothing in here returns an error to the caller.

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::NotifierConfig;
use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    AggregateOutcome, DispatchOutcome, NotificationContent, RecipientPartition, RecipientSet,
    SendFailure,
};
use crate::personalizer::Personalizer;
use crate::providers::{EmailProvider, OutgoingEmail, SentEmail};

/// Error text recorded for sends interrupted by cancellation.
pub const CANCELLED: &str = "dispatch cancelled";

/// Sends personalized copies of a notification through an [`EmailProvider`].
pub struct DispatchEngine {
    provider: Arc<dyn EmailProvider>,
    personalizer: Personalizer,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
    max_concurrency: usize,
}

impl DispatchEngine {
    pub fn new(provider: Arc<dyn EmailProvider>, config: &NotifierConfig) -> Self {
        Self {
            provider,
            personalizer: config.personalizer(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            reply_to: config.reply_to.clone(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Send to both partitions and merge the results.
    pub async fn dispatch(&self, content: &NotificationContent, recipients: &RecipientSet) -> AggregateOutcome {
        self.dispatch_with(content, recipients, None).await
    }

    /// Like [`DispatchEngine::dispatch`], but stops when `shutdown` turns
    /// `true`. Unattempted addresses are skipped and in-flight sends are
    /// recorded as failures; `total` still counts the whole set.
    pub async fn dispatch_until(
        &self,
        content: &NotificationContent,
        recipients: &RecipientSet,
        shutdown: watch::Receiver<bool>,
    ) -> AggregateOutcome {
        self.dispatch_with(content, recipients, Some(shutdown)).await
    }

    pub(crate) async fn dispatch_with(
        &self,
        content: &NotificationContent,
        recipients: &RecipientSet,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> AggregateOutcome {
        let organizations = self
            .dispatch_partition(
                content,
                &recipients.organization_addresses,
                RecipientPartition::Organization,
                shutdown.clone(),
            )
            .await;
        let subscribers = self
            .dispatch_partition(
                content,
                &recipients.subscriber_addresses,
                RecipientPartition::Subscriber,
                shutdown,
            )
            .await;

        let outcome = organizations.merge(subscribers);
        info!(
            provider = self.provider.name(),
            subject = %content.subject,
            sent = outcome.sent,
            total = outcome.total,
            failed = outcome.failed(),
            "Dispatch finished"
        );
        outcome
    }

    async fn dispatch_partition(
        &self,
        content: &NotificationContent,
        addresses: &BTreeSet<String>,
        partition: RecipientPartition,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::with_total(addresses.len());
        if addresses.is_empty() {
            return outcome;
        }

        if shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
            debug!(partition = %partition, "Cancelled before any send");
            return outcome;
        }

        let results: Vec<(String, NotificationResult<SentEmail>)> = stream::iter(addresses.iter())
            .take_until(cancelled(shutdown.clone()))
            .map(|address| self.deliver(content, address, partition, shutdown.clone()))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (address, result) in results {
            match result {
                Ok(_) => outcome.sent += 1,
                Err(e) => outcome.errors.push(SendFailure {
                    address,
                    error: e.to_string(),
                }),
            }
        }

        debug!(
            partition = %partition,
            sent = outcome.sent,
            total = outcome.total,
            failed = outcome.failed(),
            "Partition dispatched"
        );
        outcome
    }

    async fn deliver(
        &self,
        content: &NotificationContent,
        address: &str,
        partition: RecipientPartition,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> (String, NotificationResult<SentEmail>) {
        let personalized = self.personalizer.personalize(content, address, partition);
        let email = OutgoingEmail {
            to: address.to_string(),
            subject: personalized.subject,
            html_body: personalized.html_body,
            text_body: personalized.text_body,
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
            reply_to: self.reply_to.clone(),
        };

        let result = match shutdown {
            Some(rx) => tokio::select! {
                sent = self.provider.send(&email) => sent,
                _ = cancelled(Some(rx)) => Err(NotificationError::Provider(CANCELLED.to_string())),
            },
            None => self.provider.send(&email).await,
        };

        match &result {
            Ok(sent) => debug!(to = %address, partition = %partition, message_id = ?sent.message_id, "Sent notification"),
            Err(e) => warn!(to = %address, partition = %partition, error = %e, "Failed to send notification"),
        }

        (email.to, result)
    }
}

/// Resolves once the shutdown flag is `true`; never resolves without a
/// receiver or after the sender is dropped.
pub(crate) async fn cancelled(shutdown: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = shutdown {
        if rx.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use crate::templates::LinkToken;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// A transport that takes its time with every message.
    #[derive(Default)]
    struct SlowProvider {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailProvider for SlowProvider {
        async fn send(&self, email: &OutgoingEmail) -> NotificationResult<SentEmail> {
            self.attempts.lock().await.push(email.to.clone());
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(SentEmail { message_id: None })
        }

        fn name(&self) -> &'static str {
            "slow"
        }

        async fn health_check(&self) -> NotificationResult<bool> {
            Ok(true)
        }
    }

    fn engine(provider: MockProvider) -> DispatchEngine {
        let config = NotifierConfig::new("noreply@portal.org", "https://portal.org")
            .with_reply_to("staff@portal.org")
            .with_max_concurrency(1);
        DispatchEngine::new(Arc::new(provider), &config)
    }

    fn content() -> NotificationContent {
        NotificationContent {
            subject: "Update".to_string(),
            html_body: format!(r#"<a href="{}">Unsubscribe</a>"#, LinkToken::Unsubscribe.token()),
            text_body: format!("Unsubscribe: {}", LinkToken::Unsubscribe.token()),
        }
    }

    fn set(orgs: &[&str], subs: &[&str]) -> RecipientSet {
        RecipientSet {
            organization_addresses: orgs.iter().map(|s| s.to_string()).collect(),
            subscriber_addresses: subs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_each_partition_gets_its_own_links() {
        let provider = MockProvider::new();
        let outcome = engine(provider.clone())
            .dispatch(&content(), &set(&["org@x.org"], &["sub@x.org"]))
            .await;

        assert_eq!(outcome, DispatchOutcome { sent: 2, total: 2, errors: vec![] });

        let sent = provider.sent_emails().await;
        let org = sent.iter().find(|e| e.to == "org@x.org").unwrap();
        let sub = sent.iter().find(|e| e.to == "sub@x.org").unwrap();
        assert!(org.html_body.contains("https://portal.org/settings/notifications"));
        assert!(sub.html_body.contains("https://portal.org/unsubscribe?email=sub%40x.org"));
        assert_eq!(org.reply_to.as_deref(), Some("staff@portal.org"));
        assert_eq!(org.from_email, "noreply@portal.org");
    }

    #[tokio::test]
    async fn test_same_address_in_both_partitions_is_sent_twice() {
        let provider = MockProvider::new();
        let outcome = engine(provider.clone())
            .dispatch(&content(), &set(&["both@x.org"], &["both@x.org"]))
            .await;

        assert_eq!(outcome.sent, 2);
        assert_eq!(provider.attempts().await, vec!["both@x.org", "both@x.org"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_attempts_nothing() {
        let provider = MockProvider::new();
        let (tx, rx) = watch::channel(true);

        let outcome = engine(provider.clone())
            .dispatch_until(&content(), &set(&["a@x.org", "b@x.org"], &["c@x.org"]), rx)
            .await;
        drop(tx);

        assert_eq!(outcome, DispatchOutcome { sent: 0, total: 3, errors: vec![] });
        assert!(provider.attempts().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_does_not_cancel() {
        let provider = MockProvider::new();
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let outcome = engine(provider)
            .dispatch_until(&content(), &set(&["a@x.org"], &[]), rx)
            .await;
        assert_eq!(outcome.sent, 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_dispatch_fails_in_flight_and_skips_the_rest() {
        let provider = Arc::new(SlowProvider::default());
        let config = NotifierConfig::new("noreply@portal.org", "https://portal.org").with_max_concurrency(2);
        let engine = DispatchEngine::new(provider.clone(), &config);
        let recipients = set(&["a@x.org", "b@x.org", "c@x.org", "d@x.org"], &[]);
        let (tx, rx) = watch::channel(false);

        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).unwrap();
        };
        let content = content();
        let (outcome, ()) = tokio::join!(engine.dispatch_until(&content, &recipients, rx), interrupt);

        assert_eq!(provider.attempts.lock().await.len(), 2);
        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.failed(), 2);
        assert!(outcome.errors.iter().all(|e| e.error.contains(CANCELLED)));
    }
}
